use chrono::NaiveDate;
use fieldfix_types::CorrectionRecord;
use serde::Serialize;
use std::collections::BTreeSet;

/// Headline metrics for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub total: usize,
    pub enumerator_count: usize,
    pub farmer_count: usize,
    /// The most recently appended rows, oldest first.
    pub preview: Vec<CorrectionRecord>,
}

pub fn summarize(rows: &[CorrectionRecord], preview_rows: usize) -> LedgerSummary {
    let enumerators: BTreeSet<&str> = rows.iter().map(|r| r.username.as_str()).collect();
    let farmers: BTreeSet<&str> = rows.iter().map(|r| r.unique_id.as_str()).collect();
    let start = rows.len().saturating_sub(preview_rows);
    LedgerSummary {
        total: rows.len(),
        enumerator_count: enumerators.len(),
        farmer_count: farmers.len(),
        preview: rows[start..].to_vec(),
    }
}

/// `all_corrections_YYYYMMDD.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("all_corrections_{}.csv", date.format("%Y%m%d"))
}
