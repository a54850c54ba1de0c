//! Medication database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::MedicationRecord;

/// Storage format for calendar dates.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, purchase_date, expiry_date, total_units, units_per_day, created_at
    FROM medications
"#;

impl Database {
    /// Insert a new medication. A duplicate id is a constraint violation.
    pub fn insert_medication(&self, record: &MedicationRecord) -> DbResult<()> {
        let result = self.conn.execute(
            r#"
            INSERT INTO medications (
                id, name, purchase_date, expiry_date, total_units, units_per_day, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.name,
                record.purchase_date.format(DATE_FORMAT).to_string(),
                record.expiry_date.format(DATE_FORMAT).to_string(),
                record.total_units,
                record.units_per_day,
                record.created_at,
            ],
        );

        match result {
            Ok(_) => {
                log::debug!("Inserted medication {} ({})", record.id, record.name);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::Constraint(
                    msg.unwrap_or_else(|| format!("medication {}", record.id)),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, id: &str) -> DbResult<Option<MedicationRecord>> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_COLUMNS),
                [id],
                row_to_medication,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Check whether a medication with this ID is stored.
    pub fn medication_exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM medications WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all medications in the order they were added.
    pub fn list_medications(&self) -> DbResult<Vec<MedicationRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY rowid", SELECT_COLUMNS))?;

        let rows = stmt.query_map([], row_to_medication)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search medications by name (prefix match).
    pub fn search_medications(&self, query: &str, limit: usize) -> DbResult<Vec<MedicationRecord>> {
        let pattern = format!("{}%", escape_like(query.trim()));
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE name LIKE ? ESCAPE '\\' ORDER BY name LIMIT ?",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], row_to_medication)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count stored medications.
    pub fn count_medications(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM medications", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a medication.
    pub fn delete_medication(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medications WHERE id = ?", [id])?;
        if rows_affected > 0 {
            log::debug!("Deleted medication {}", id);
        }
        Ok(rows_affected > 0)
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn row_to_medication(row: &Row<'_>) -> rusqlite::Result<MedicationRecord> {
    Ok(MedicationRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        purchase_date: parse_date(2, row.get(2)?)?,
        expiry_date: parse_date(3, row.get(3)?)?,
        total_units: row.get(4)?,
        units_per_day: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn parse_date(idx: usize, value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
