//! Compound report rendering.
//!
//! Rows are pre-formatted strings so the same payload can round-trip through the
//! browser: the front-end receives them with a projection and posts them back for
//! download.

mod csv_export;
mod format;
mod pdf_export;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::YearlySnapshot;

pub use csv_export::render_csv;
pub use format::{drip_label, format_currency, format_percent};
pub use pdf_export::render_pdf;

pub const COLUMNS: [&str; 5] = ["YEAR", "CONTRIBUTIONS", "PROFITS", "BALANCE", "RETURN (%)"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub year: String,
    pub contributions: String,
    pub profits: String,
    pub balance: String,
    /// Total return, already suffixed with `%`.
    pub intret: String,
}

impl ReportRow {
    pub fn from_snapshot(snapshot: &YearlySnapshot) -> Self {
        Self {
            year: snapshot.year.to_string(),
            contributions: format_currency(snapshot.cumulative_contributions),
            profits: format_currency(snapshot.cumulative_dividends),
            balance: format_currency(snapshot.ending_balance),
            intret: format_percent(snapshot.total_return_percent),
        }
    }

    pub fn cells(&self) -> [&str; 5] {
        [
            &self.year,
            &self.contributions,
            &self.profits,
            &self.balance,
            &self.intret,
        ]
    }
}

pub fn rows_from_snapshots(snapshots: &[YearlySnapshot]) -> Vec<ReportRow> {
    snapshots.iter().map(ReportRow::from_snapshot).collect()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Pdf => "application/pdf",
        }
    }

    pub fn file_name(self, timestamp_millis: i64) -> String {
        format!("Compound_Report-{timestamp_millis}.{}", self.extension())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report has no rows")]
    Empty,

    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to finish CSV report: {0}")]
    Io(#[from] std::io::Error),
}
