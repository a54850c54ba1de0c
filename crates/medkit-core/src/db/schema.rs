//! SQLite schema definition.

/// Complete database schema for medkit.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Medications
-- ============================================================================

CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    purchase_date TEXT NOT NULL,                 -- YYYY-MM-DD
    expiry_date TEXT NOT NULL,                   -- YYYY-MM-DD
    total_units INTEGER NOT NULL CHECK (total_units >= 0),
    units_per_day INTEGER NOT NULL CHECK (units_per_day >= 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name);
CREATE INDEX IF NOT EXISTS idx_medications_expiry ON medications(expiry_date);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_blank_name_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO medications (id, name, purchase_date, expiry_date, total_units, units_per_day)
             VALUES ('m1', '  ', '2024-01-01', '2024-12-31', 10, 1)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_units_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO medications (id, name, purchase_date, expiry_date, total_units, units_per_day)
             VALUES ('m1', 'Aspirin', '2024-01-01', '2024-12-31', -5, 1)",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO medications (id, name, purchase_date, expiry_date, total_units, units_per_day)
             VALUES ('m1', 'Aspirin', '2024-01-01', '2024-12-31', 5, 1)",
            [],
        );
        assert!(result.is_ok());
    }
}
