//! Status report export.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::DATE_FORMAT;
use crate::models::{TrackedMedication, TrackerSummary};
use crate::status::MedicationStatus;

/// One medication in a status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReportRow {
    pub id: String,
    pub name: String,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub total_units: u32,
    pub units_per_day: u32,
    pub status: MedicationStatus,
    pub remaining_units: u32,
    /// `None` when stock never runs out at the current rate
    pub days_to_end: Option<u32>,
}

impl From<&TrackedMedication> for StatusReportRow {
    fn from(item: &TrackedMedication) -> Self {
        Self {
            id: item.record.id.clone(),
            name: item.record.name.clone(),
            purchase_date: item.record.purchase_date,
            expiry_date: item.record.expiry_date,
            total_units: item.record.total_units,
            units_per_day: item.record.units_per_day,
            status: item.report.status,
            remaining_units: item.report.remaining_units,
            days_to_end: item.report.days_to_end,
        }
    }
}

/// Snapshot of every tracked medication on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReportExport {
    /// Date the statuses were evaluated for
    pub generated_on: NaiveDate,
    pub rows: Vec<StatusReportRow>,
    pub summary: TrackerSummary,
}

impl StatusReportExport {
    /// Build a report from tracked medications evaluated on `generated_on`.
    pub fn new(generated_on: NaiveDate, tracked: &[TrackedMedication]) -> Self {
        Self {
            generated_on,
            rows: tracked.iter().map(StatusReportRow::from).collect(),
            summary: TrackerSummary::from_tracked(tracked),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("id,name,purchase_date,expiry_date,total_units,units_per_day,status,remaining_units,days_to_end\n");

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.id),
                escape_csv(&row.name),
                row.purchase_date.format(DATE_FORMAT),
                row.expiry_date.format(DATE_FORMAT),
                row.total_units,
                row.units_per_day,
                row.status.as_str(),
                row.remaining_units,
                row.days_to_end.map(|d| d.to_string()).unwrap_or_default(),
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
