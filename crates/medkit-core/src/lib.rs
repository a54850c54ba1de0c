//! Medkit Core Library
//!
//! Local-first medication tracking for the health companion app.
//!
//! # Architecture
//!
//! ```text
//!   Mobile shell (medicine screen)
//!            │  add / delete / list
//!            ▼
//!   ┌──────────────────────┐      ┌──────────────────┐
//!   │   MedicationTracker  │─────▶│      Clock       │  today()
//!   └──────────┬───────────┘      └──────────────────┘
//!              │ records                    │
//!              ▼                            ▼
//!   ┌──────────────────────┐      ┌──────────────────┐
//!   │   SQLite medications │      │ calculate_status │  pure
//!   └──────────────────────┘      └──────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Remaining stock is derived, never stored.** Status is a pure function of
//! a record and an explicit evaluation date.
//!
//! # Modules
//!
//! - [`status`]: Status calculator and clocks
//! - [`models`]: Domain types (MedicationRecord, NewMedication, etc.)
//! - [`db`]: SQLite database layer
//! - [`tracker`]: Store operations with status derivation
//! - [`legacy`]: Import/export of the old key-value `meds` layout
//! - [`export`]: Status report export

pub mod db;
pub mod export;
pub mod legacy;
pub mod models;
pub mod status;
pub mod tracker;

// Re-export commonly used types
pub use db::Database;
pub use models::{MedicationRecord, NewMedication, TrackedMedication, TrackerSummary};
pub use status::{calculate_status, Clock, FixedClock, MedicationStatus, StatusReport, SystemClock};
pub use tracker::{ImportSummary, MedicationTracker};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedkitError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for MedkitError {
    fn from(e: db::DbError) -> Self {
        MedkitError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for MedkitError {
    fn from(e: serde_json::Error) -> Self {
        MedkitError::SerializationError(e.to_string())
    }
}

impl From<tracker::TrackerError> for MedkitError {
    fn from(e: tracker::TrackerError) -> Self {
        match e {
            tracker::TrackerError::Database(e) => e.into(),
            tracker::TrackerError::Validation(e) => MedkitError::InvalidInput(e.to_string()),
            tracker::TrackerError::Legacy(e) => MedkitError::SerializationError(e.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedkitError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedkitError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse_ffi_date(value: &str) -> Result<NaiveDate, MedkitError> {
    NaiveDate::parse_from_str(value.trim(), db::DATE_FORMAT)
        .map_err(|_| MedkitError::InvalidInput(format!("Expected YYYY-MM-DD date, got {:?}", value)))
}

/// Pin the evaluation date for one call: the override (YYYY-MM-DD) if given,
/// otherwise the device date read once.
fn resolve_today(today: Option<String>) -> Result<FixedClock, MedkitError> {
    match today {
        Some(today) => Ok(FixedClock(parse_ffi_date(&today)?)),
        None => Ok(FixedClock(SystemClock.today())),
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<MedkitCore>, MedkitError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(MedkitCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<MedkitCore>, MedkitError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(MedkitCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedkitCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl MedkitCore {
    // =========================================================================
    // Medication Operations
    // =========================================================================

    /// Log a new medication. Returns it with its status as of today.
    pub fn add_medication(
        &self,
        medication: FfiNewMedication,
        today: Option<String>,
    ) -> Result<FfiTrackedMedication, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        let record = tracker.add_medication(medication.try_into()?)?;
        let report = record.status_on(clock.today());
        Ok(TrackedMedication { record, report }.into())
    }

    /// Get a medication with its status as of today.
    pub fn get_medication(
        &self,
        id: String,
        today: Option<String>,
    ) -> Result<Option<FfiTrackedMedication>, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        let tracked = tracker.medication_status(&id)?;
        Ok(tracked.map(Into::into))
    }

    /// Delete a medication.
    pub fn delete_medication(&self, id: String) -> Result<(), MedkitError> {
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, SystemClock);
        if tracker.remove_medication(&id)? {
            Ok(())
        } else {
            Err(MedkitError::NotFound(id))
        }
    }

    /// List medications with status as of today.
    pub fn list_medications(
        &self,
        today: Option<String>,
    ) -> Result<Vec<FfiTrackedMedication>, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        let tracked = tracker.tracked_medications()?;
        Ok(tracked.into_iter().map(Into::into).collect())
    }

    /// Search medications by name prefix. `%` and `_` match literally.
    pub fn search_medications(
        &self,
        query: String,
        limit: u32,
        today: Option<String>,
    ) -> Result<Vec<FfiTrackedMedication>, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        let tracked = tracker.search_medications(&query, limit as usize)?;
        Ok(tracked.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Legacy Storage Operations
    // =========================================================================

    /// Import the JSON stored under the legacy `meds` key.
    pub fn import_legacy_json(&self, json: String) -> Result<FfiImportSummary, MedkitError> {
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, SystemClock);
        Ok(tracker.import_legacy(&json)?.into())
    }

    /// Export all medications in the legacy `meds` layout.
    pub fn export_legacy_json(&self) -> Result<String, MedkitError> {
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, SystemClock);
        Ok(tracker.export_legacy()?)
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export today's status report as JSON.
    pub fn export_status_report_json(&self, today: Option<String>) -> Result<String, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        Ok(tracker.status_report()?.to_json()?)
    }

    /// Export today's status report as CSV.
    pub fn export_status_report_csv(&self, today: Option<String>) -> Result<String, MedkitError> {
        let clock = resolve_today(today)?;
        let db = self.db.lock()?;
        let tracker = MedicationTracker::new(&db, clock);
        Ok(tracker.status_report()?.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiMedicationStatus {
    Active,
    OutOfStock,
    Expired,
}

impl From<MedicationStatus> for FfiMedicationStatus {
    fn from(status: MedicationStatus) -> Self {
        match status {
            MedicationStatus::Active => FfiMedicationStatus::Active,
            MedicationStatus::OutOfStock => FfiMedicationStatus::OutOfStock,
            MedicationStatus::Expired => FfiMedicationStatus::Expired,
        }
    }
}

/// FFI-safe new medication entry. Dates are YYYY-MM-DD.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedication {
    pub name: String,
    pub purchase_date: String,
    pub expiry_date: String,
    pub total_units: u32,
    pub units_per_day: u32,
}

impl TryFrom<FfiNewMedication> for NewMedication {
    type Error = MedkitError;

    fn try_from(entry: FfiNewMedication) -> Result<Self, Self::Error> {
        Ok(NewMedication {
            name: entry.name,
            purchase_date: parse_ffi_date(&entry.purchase_date)?,
            expiry_date: parse_ffi_date(&entry.expiry_date)?,
            total_units: entry.total_units,
            units_per_day: entry.units_per_day,
        })
    }
}

/// FFI-safe medication with derived status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrackedMedication {
    pub id: String,
    pub name: String,
    pub purchase_date: String,
    pub expiry_date: String,
    pub total_units: u32,
    pub units_per_day: u32,
    pub status: FfiMedicationStatus,
    pub remaining_units: u32,
    /// None when the supply never runs out at the current rate
    pub days_to_end: Option<u32>,
}

impl From<TrackedMedication> for FfiTrackedMedication {
    fn from(item: TrackedMedication) -> Self {
        Self {
            id: item.record.id,
            name: item.record.name,
            purchase_date: item.record.purchase_date.to_string(),
            expiry_date: item.record.expiry_date.to_string(),
            total_units: item.record.total_units,
            units_per_day: item.record.units_per_day,
            status: item.report.status.into(),
            remaining_units: item.report.remaining_units,
            days_to_end: item.report.days_to_end,
        }
    }
}

/// FFI-safe legacy import result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportSummary {
    pub imported: u32,
    pub skipped_existing: u32,
    pub rejected: u32,
}

impl From<ImportSummary> for FfiImportSummary {
    fn from(summary: ImportSummary) -> Self {
        Self {
            imported: saturating_u32(summary.imported),
            skipped_existing: saturating_u32(summary.skipped_existing),
            rejected: saturating_u32(summary.rejected),
        }
    }
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
