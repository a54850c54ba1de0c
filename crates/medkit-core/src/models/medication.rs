//! Medication models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::{calculate_status, StatusReport};

/// Reasons a medication entry cannot be turned into a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Medication name must not be empty")]
    EmptyName,

    #[error("Purchase date {purchase} is after expiry date {expiry}")]
    InvertedDateRange {
        purchase: NaiveDate,
        expiry: NaiveDate,
    },
}

/// A medication the user has logged.
///
/// Counts are fixed at creation. Remaining stock is always derived through
/// [`MedicationRecord::status_on`], never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationRecord {
    /// Opaque unique key (UUID for new records)
    pub id: String,
    /// Display name
    pub name: String,
    /// Date the medication was acquired
    pub purchase_date: NaiveDate,
    /// Last day the medication is safe to use
    pub expiry_date: NaiveDate,
    /// Units available at purchase
    pub total_units: u32,
    /// Units consumed per day
    pub units_per_day: u32,
    /// Creation timestamp
    pub created_at: String,
}

impl MedicationRecord {
    /// Evaluate stock and expiry as of `today`.
    pub fn status_on(&self, today: NaiveDate) -> StatusReport {
        calculate_status(
            self.purchase_date,
            self.expiry_date,
            self.total_units,
            self.units_per_day,
            today,
        )
    }
}

/// User input for a new medication, not yet validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub total_units: u32,
    pub units_per_day: u32,
}

impl NewMedication {
    /// Check the entry can produce a meaningful record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.purchase_date > self.expiry_date {
            return Err(ValidationError::InvertedDateRange {
                purchase: self.purchase_date,
                expiry: self.expiry_date,
            });
        }
        Ok(())
    }

    /// Validate and build a record with a fresh id.
    pub fn into_record(self) -> Result<MedicationRecord, ValidationError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.into_record_with_id(id)
    }

    /// Validate and build a record keeping an existing id.
    pub fn into_record_with_id(self, id: String) -> Result<MedicationRecord, ValidationError> {
        self.validate()?;
        Ok(MedicationRecord {
            id,
            name: self.name.trim().to_string(),
            purchase_date: self.purchase_date,
            expiry_date: self.expiry_date,
            total_units: self.total_units,
            units_per_day: self.units_per_day,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// A record paired with its status for a single evaluation date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedMedication {
    pub record: MedicationRecord,
    pub report: StatusReport,
}

/// Per-status counts across all tracked medications.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerSummary {
    pub active: usize,
    pub out_of_stock: usize,
    pub expired: usize,
}

impl TrackerSummary {
    /// Tally statuses from tracked medications.
    pub fn from_tracked<'a>(items: impl IntoIterator<Item = &'a TrackedMedication>) -> Self {
        use crate::status::MedicationStatus::*;

        let mut summary = Self::default();
        for item in items {
            match item.report.status {
                Active => summary.active += 1,
                OutOfStock => summary.out_of_stock += 1,
                Expired => summary.expired += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.active + self.out_of_stock + self.expired
    }
}
