//! Stock and expiry status derived from a medication's static fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived lifecycle state of a medication on a given day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MedicationStatus {
    /// Not expired and units remain
    Active,
    /// Not expired but every unit has been consumed
    OutOfStock,
    /// Past the expiry date, regardless of stock
    Expired,
}

impl MedicationStatus {
    /// Stable lowercase tag used in storage and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationStatus::Active => "active",
            MedicationStatus::OutOfStock => "out_of_stock",
            MedicationStatus::Expired => "expired",
        }
    }
}

/// Result of evaluating a medication on a given day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub status: MedicationStatus,
    /// Units not yet consumed (zero once expired)
    pub remaining_units: u32,
    /// Whole days until stock runs out. `None` means it never runs out
    /// (zero consumption rate with stock left).
    pub days_to_end: Option<u32>,
}

impl StatusReport {
    fn expired() -> Self {
        Self {
            status: MedicationStatus::Expired,
            remaining_units: 0,
            days_to_end: Some(0),
        }
    }

    /// Whether stock will never deplete at the current rate.
    pub fn is_unbounded(&self) -> bool {
        self.days_to_end.is_none()
    }
}

/// Compute the status of a medication as of `today`.
///
/// Consumption is counted in whole calendar days since `purchase_date`; a
/// `today` before the purchase counts as zero days. Expiry takes precedence
/// over any stock arithmetic: the expiry day itself is still usable, the day
/// after is not.
///
/// Never panics. A zero `units_per_day` consumes nothing and reports an
/// unbounded `days_to_end` while stock remains.
pub fn calculate_status(
    purchase_date: NaiveDate,
    expiry_date: NaiveDate,
    total_units: u32,
    units_per_day: u32,
    today: NaiveDate,
) -> StatusReport {
    if today > expiry_date {
        return StatusReport::expired();
    }

    let days_passed = (today - purchase_date).num_days().max(0) as u64;
    let consumed = days_passed.saturating_mul(u64::from(units_per_day));
    let remaining = u64::from(total_units).saturating_sub(consumed);

    if remaining == 0 {
        return StatusReport {
            status: MedicationStatus::OutOfStock,
            remaining_units: 0,
            days_to_end: Some(0),
        };
    }

    // remaining <= total_units, so both casts are lossless
    let days_to_end = match units_per_day {
        0 => None,
        rate => Some(remaining.div_ceil(u64::from(rate)) as u32),
    };

    StatusReport {
        status: MedicationStatus::Active,
        remaining_units: remaining as u32,
        days_to_end,
    }
}
