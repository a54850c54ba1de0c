//! Medication tracker: the store operations the tracking screen drives.
//!
//! Pairs a [`Database`] with a [`Clock`] so that every listing is evaluated
//! against a single, injectable "today".

use chrono::{Local, NaiveDate, TimeZone};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::export::StatusReportExport;
use crate::legacy::{self, LegacyError};
use crate::models::{
    MedicationRecord, NewMedication, TrackedMedication, TrackerSummary, ValidationError,
};
use crate::status::Clock;

/// Tracker errors.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid medication: {0}")]
    Validation(#[from] ValidationError),

    #[error("Legacy data error: {0}")]
    Legacy(#[from] LegacyError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Outcome of migrating legacy key-value data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records written to the store
    pub imported: usize,
    /// Entries whose id was already stored
    pub skipped_existing: usize,
    /// Entries that could not be turned into valid records
    pub rejected: usize,
}

/// Store operations plus status derivation.
pub struct MedicationTracker<'a, C: Clock> {
    db: &'a Database,
    clock: C,
}

impl<'a, C: Clock> MedicationTracker<'a, C> {
    /// Create a tracker over a database and clock.
    pub fn new(db: &'a Database, clock: C) -> Self {
        Self { db, clock }
    }

    /// Validate, persist and return a new medication.
    pub fn add_medication(&self, entry: NewMedication) -> TrackerResult<MedicationRecord> {
        let record = entry.into_record()?;
        self.db.insert_medication(&record)?;
        Ok(record)
    }

    /// Remove a medication. Returns false if it did not exist.
    pub fn remove_medication(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.db.delete_medication(id)?)
    }

    /// Get one medication with its status as of today.
    pub fn medication_status(&self, id: &str) -> TrackerResult<Option<TrackedMedication>> {
        let today = self.clock.today();
        let record = self.db.get_medication(id)?;
        Ok(record.map(|record| track(record, today)))
    }

    /// Medications whose name starts with `query`, with status as of today.
    pub fn search_medications(
        &self,
        query: &str,
        limit: usize,
    ) -> TrackerResult<Vec<TrackedMedication>> {
        let today = self.clock.today();
        let records = self.db.search_medications(query, limit)?;
        Ok(records
            .into_iter()
            .map(|record| track(record, today))
            .collect())
    }

    /// All medications with their status as of today.
    pub fn tracked_medications(&self) -> TrackerResult<Vec<TrackedMedication>> {
        self.tracked_medications_on(self.clock.today())
    }

    /// All medications with their status as of `today`.
    pub fn tracked_medications_on(&self, today: NaiveDate) -> TrackerResult<Vec<TrackedMedication>> {
        let records = self.db.list_medications()?;
        Ok(records
            .into_iter()
            .map(|record| track(record, today))
            .collect())
    }

    /// Per-status counts as of today.
    pub fn summary(&self) -> TrackerResult<TrackerSummary> {
        let tracked = self.tracked_medications()?;
        Ok(TrackerSummary::from_tracked(&tracked))
    }

    /// Snapshot report of all medications as of today.
    pub fn status_report(&self) -> TrackerResult<StatusReportExport> {
        let today = self.clock.today();
        let tracked = self.tracked_medications_on(today)?;
        Ok(StatusReportExport::new(today, &tracked))
    }

    /// Migrate the legacy `meds` JSON array into the store.
    ///
    /// Entries already stored (by id) are skipped, so importing the same
    /// payload twice is harmless. Entries that fail validation are counted
    /// and logged, not fatal. A store failure rolls the whole import back.
    pub fn import_legacy(&self, json: &str) -> TrackerResult<ImportSummary> {
        self.import_legacy_in(json, &Local)
    }

    /// Like [`import_legacy`](Self::import_legacy), dating timestamps in `tz`.
    pub fn import_legacy_in<Tz: TimeZone>(&self, json: &str, tz: &Tz) -> TrackerResult<ImportSummary> {
        let batch = legacy::parse_legacy_meds_in(json, tz)?;
        let mut summary = ImportSummary {
            rejected: batch.rejected.len(),
            ..Default::default()
        };

        let tx = self.db.transaction()?;
        for record in batch.records {
            if self.db.medication_exists(&record.id)? {
                summary.skipped_existing += 1;
                continue;
            }
            self.db.insert_medication(&record)?;
            summary.imported += 1;
        }
        tx.commit().map_err(DbError::from)?;

        log::info!(
            "Legacy import: {} imported, {} already present, {} rejected",
            summary.imported,
            summary.skipped_existing,
            summary.rejected
        );
        Ok(summary)
    }

    /// Serialize all medications in the legacy `meds` layout.
    pub fn export_legacy(&self) -> TrackerResult<String> {
        self.export_legacy_in(&Local)
    }

    /// Like [`export_legacy`](Self::export_legacy), stamping dates in `tz`.
    pub fn export_legacy_in<Tz: TimeZone>(&self, tz: &Tz) -> TrackerResult<String> {
        let records = self.db.list_medications()?;
        Ok(legacy::to_legacy_json_in(&records, tz)?)
    }
}

fn track(record: MedicationRecord, today: NaiveDate) -> TrackedMedication {
    TrackedMedication {
        report: record.status_on(today),
        record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{FixedClock, MedicationStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(name: &str, total_units: u32, units_per_day: u32) -> NewMedication {
        NewMedication {
            name: name.into(),
            purchase_date: date(2024, 1, 1),
            expiry_date: date(2024, 6, 30),
            total_units,
            units_per_day,
        }
    }

    #[test]
    fn test_add_and_track() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 3)));

        let record = tracker.add_medication(entry("Amoxicillin", 30, 3)).unwrap();
        let tracked = tracker.medication_status(&record.id).unwrap().unwrap();

        assert_eq!(tracked.record, record);
        assert_eq!(tracked.report.status, MedicationStatus::Active);
        assert_eq!(tracked.report.remaining_units, 24);
        assert_eq!(tracked.report.days_to_end, Some(8));
    }

    #[test]
    fn test_invalid_entry_not_persisted() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 3)));

        let result = tracker.add_medication(entry("", 30, 3));
        assert!(matches!(
            result,
            Err(TrackerError::Validation(ValidationError::EmptyName))
        ));
        assert_eq!(db.count_medications().unwrap(), 0);
    }

    #[test]
    fn test_listing_uses_one_date() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 6)));

        tracker.add_medication(entry("Short course", 10, 2)).unwrap();
        tracker.add_medication(entry("Long course", 100, 1)).unwrap();
        tracker.add_medication(entry("As needed", 5, 0)).unwrap();

        let tracked = tracker.tracked_medications().unwrap();
        let statuses: Vec<_> = tracked.iter().map(|t| t.report.status).collect();
        assert_eq!(
            statuses,
            vec![
                MedicationStatus::OutOfStock,
                MedicationStatus::Active,
                MedicationStatus::Active
            ]
        );
        assert!(tracked[2].report.is_unbounded());

        let later = tracker.tracked_medications_on(date(2024, 7, 1)).unwrap();
        assert!(later
            .iter()
            .all(|t| t.report.status == MedicationStatus::Expired));
    }

    #[test]
    fn test_summary_and_remove() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 6)));

        let short = tracker.add_medication(entry("Short course", 10, 2)).unwrap();
        tracker.add_medication(entry("Long course", 100, 1)).unwrap();

        let summary = tracker.summary().unwrap();
        assert_eq!(summary.active, 1);
        assert_eq!(summary.out_of_stock, 1);

        assert!(tracker.remove_medication(&short.id).unwrap());
        assert!(!tracker.remove_medication(&short.id).unwrap());
        assert_eq!(tracker.summary().unwrap().total(), 1);
    }

    #[test]
    fn test_status_report_uses_clock_date() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 6)));
        tracker.add_medication(entry("Long course", 100, 1)).unwrap();

        let report = tracker.status_report().unwrap();
        assert_eq!(report.generated_on, date(2024, 1, 6));
        assert_eq!(report.rows[0].remaining_units, 95);
    }

    #[test]
    fn test_search_reports_status() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 3)));
        tracker.add_medication(entry("Amoxicillin", 30, 3)).unwrap();
        tracker.add_medication(entry("Vitamin C", 60, 1)).unwrap();

        let found = tracker.search_medications("amox", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].report.remaining_units, 24);
    }

    #[test]
    fn test_failed_import_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON medications
                 WHEN new.name = 'Boom'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 6)));

        let json = r#"[
            {"id": 1, "name": "Fine", "buyDate": "2024-01-01", "expiryDate": "2024-12-31",
             "totalTablets": 10, "perDayDose": 1},
            {"id": 2, "name": "Boom", "buyDate": "2024-01-01", "expiryDate": "2024-12-31",
             "totalTablets": 10, "perDayDose": 1}
        ]"#;

        assert!(matches!(
            tracker.import_legacy(json),
            Err(TrackerError::Database(_))
        ));
        assert_eq!(db.count_medications().unwrap(), 0);

        db.conn().execute_batch("DROP TRIGGER reject_boom").unwrap();
        let summary = tracker.import_legacy(json).unwrap();
        assert_eq!(summary.imported, 2);
    }

    #[test]
    fn test_import_dates_in_given_zone() {
        use chrono::FixedOffset;

        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2026, 10, 17)));
        let kiritimati = FixedOffset::east_opt(14 * 3600).unwrap();

        let json = r#"[{"id": 1, "name": "Morning pack", "buyDate": "2026-10-16T19:00:00.000Z",
            "expiryDate": "2027-10-16T19:00:00.000Z", "totalTablets": 10, "perDayDose": 2}]"#;
        tracker.import_legacy_in(json, &kiritimati).unwrap();

        let tracked = tracker.tracked_medications().unwrap();
        assert_eq!(tracked[0].record.purchase_date, date(2026, 10, 17));
        assert_eq!(tracked[0].report.remaining_units, 10);

        let exported = tracker.export_legacy_in(&kiritimati).unwrap();
        assert!(exported.contains("\"buyDate\":\"2026-10-16T22:00:00.000Z\""));
    }

    #[test]
    fn test_missing_status() {
        let db = Database::open_in_memory().unwrap();
        let tracker = MedicationTracker::new(&db, FixedClock(date(2024, 1, 6)));
        assert!(tracker.medication_status("missing").unwrap().is_none());
    }
}
