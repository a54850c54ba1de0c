//! Legacy key-value layout.
//!
//! Earlier app versions kept the medication list as one JSON array under the
//! storage key `meds`:
//!
//! ```json
//! [{"id": 1717171717171, "name": "Paracetamol",
//!   "buyDate": "2024-05-31T10:15:00.000Z", "expiryDate": "2025-05-31T10:15:00.000Z",
//!   "totalTablets": 30, "perDayDose": 2}]
//! ```
//!
//! Timestamps are instants; they are reduced to the calendar date of the
//! device's time zone, the same calendar [`SystemClock`] evaluates against.
//! Counts may be `null` when the entry form held a non-numeric value; such
//! entries are rejected.
//!
//! [`SystemClock`]: crate::status::SystemClock

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DATE_FORMAT;
use crate::models::{MedicationRecord, NewMedication};

/// Storage key the legacy list lives under.
pub const LEGACY_STORAGE_KEY: &str = "meds";

/// Legacy layout errors.
#[derive(Error, Debug)]
pub enum LegacyError {
    #[error("Malformed legacy JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LegacyResult<T> = Result<T, LegacyError>;

/// Ids were millisecond timestamps in one version and strings in another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
enum LegacyId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for LegacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegacyId::Number(n) => write!(f, "{}", n),
            LegacyId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMed {
    id: LegacyId,
    name: String,
    buy_date: String,
    expiry_date: String,
    total_tablets: Option<i64>,
    per_day_dose: Option<i64>,
}

/// An entry that could not be migrated.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    /// Position in the legacy array
    pub index: usize,
    /// Legacy id, when it could be read
    pub id: Option<String>,
    pub reason: String,
}

/// Parsed legacy payload.
#[derive(Debug, Clone, Default)]
pub struct LegacyBatch {
    pub records: Vec<MedicationRecord>,
    pub rejected: Vec<RejectedEntry>,
}

/// Parse the legacy `meds` array into records, dating timestamps in the
/// device's local time zone.
///
/// Only a payload that is not a JSON array is an error. Individual entries
/// that fail to convert end up in [`LegacyBatch::rejected`].
pub fn parse_legacy_meds(json: &str) -> LegacyResult<LegacyBatch> {
    parse_legacy_meds_in(json, &Local)
}

/// Parse the legacy `meds` array, dating timestamps in `tz`.
pub fn parse_legacy_meds_in<Tz: TimeZone>(json: &str, tz: &Tz) -> LegacyResult<LegacyBatch> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut batch = LegacyBatch::default();

    for (index, value) in entries.into_iter().enumerate() {
        let id = value.get("id").and_then(|id| match id {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            _ => None,
        });

        match convert_entry(value, tz) {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                log::warn!("Skipping legacy medication #{} ({:?}): {}", index, id, reason);
                batch.rejected.push(RejectedEntry { index, id, reason });
            }
        }
    }

    Ok(batch)
}

fn convert_entry<Tz: TimeZone>(value: serde_json::Value, tz: &Tz) -> Result<MedicationRecord, String> {
    let med: LegacyMed = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let entry = NewMedication {
        name: med.name,
        purchase_date: parse_legacy_date(&med.buy_date, tz)?,
        expiry_date: parse_legacy_date(&med.expiry_date, tz)?,
        total_units: parse_count("totalTablets", med.total_tablets)?,
        units_per_day: parse_count("perDayDose", med.per_day_dose)?,
    };

    entry
        .into_record_with_id(med.id.to_string())
        .map_err(|e| e.to_string())
}

fn parse_legacy_date<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<NaiveDate, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(tz).date_naive());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| format!("invalid date: {}", value))
}

fn parse_count(field: &str, value: Option<i64>) -> Result<u32, String> {
    let value = value.ok_or_else(|| format!("{} is missing", field))?;
    u32::try_from(value).map_err(|_| format!("{} out of range: {}", field, value))
}

/// Serialize records in the legacy `meds` layout, stamping dates at local noon.
pub fn to_legacy_json(records: &[MedicationRecord]) -> LegacyResult<String> {
    to_legacy_json_in(records, &Local)
}

/// Serialize records in the legacy `meds` layout, stamping dates at noon in `tz`.
///
/// Noon keeps the instant on the same calendar day when read back in `tz`.
pub fn to_legacy_json_in<Tz: TimeZone>(records: &[MedicationRecord], tz: &Tz) -> LegacyResult<String> {
    let meds: Vec<LegacyMed> = records
        .iter()
        .map(|record| LegacyMed {
            id: LegacyId::Text(record.id.clone()),
            name: record.name.clone(),
            buy_date: legacy_timestamp(record.purchase_date, tz),
            expiry_date: legacy_timestamp(record.expiry_date, tz),
            total_tablets: Some(i64::from(record.total_units)),
            per_day_dose: Some(i64::from(record.units_per_day)),
        })
        .collect();

    Ok(serde_json::to_string(&meds)?)
}

fn legacy_timestamp<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> String {
    match date
        .and_hms_opt(12, 0, 0)
        .and_then(|noon| tz.from_local_datetime(&noon).earliest())
    {
        Some(instant) => instant
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string(),
        None => format!("{}T12:00:00.000Z", date.format(DATE_FORMAT)),
    }
}
