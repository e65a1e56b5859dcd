use crate::key::{ErrorKey, ErrorKind};
use serde::{Deserialize, Serialize};

/// Header of the corrections ledger, in column order.
pub const LEDGER_COLUMNS: [&str; 17] = [
    "error_type",
    "username",
    "supervisor",
    "woreda",
    "kebele",
    "farmer_name",
    "phone_no",
    "subdate",
    "unique_id",
    "variable",
    "original_value",
    "reference_value",
    "correct_value",
    "explanation",
    "corrected_by",
    "correction_date",
    "correction_timestamp",
];

/// One committed correction. Append-only; never rewritten once in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub error_type: ErrorKind,
    pub username: String,
    pub supervisor: String,
    pub woreda: String,
    pub kebele: String,
    pub farmer_name: String,
    pub phone_no: String,
    pub subdate: String,
    pub unique_id: String,
    pub variable: String,
    pub original_value: String,
    pub reference_value: String,
    pub correct_value: i64,
    pub explanation: String,
    pub corrected_by: String,
    /// `%d-%b-%y`, e.g. `05-Mar-25`.
    pub correction_date: String,
    /// ISO-8601 local time with microseconds.
    pub correction_timestamp: String,
}

impl CorrectionRecord {
    pub fn key(&self) -> ErrorKey {
        ErrorKey::new(
            self.error_type,
            self.unique_id.clone(),
            self.variable.clone(),
        )
    }

    /// Cells in `LEDGER_COLUMNS` order.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.error_type.as_str().to_string(),
            self.username.clone(),
            self.supervisor.clone(),
            self.woreda.clone(),
            self.kebele.clone(),
            self.farmer_name.clone(),
            self.phone_no.clone(),
            self.subdate.clone(),
            self.unique_id.clone(),
            self.variable.clone(),
            self.original_value.clone(),
            self.reference_value.clone(),
            self.correct_value.to_string(),
            self.explanation.clone(),
            self.corrected_by.clone(),
            self.correction_date.clone(),
            self.correction_timestamp.clone(),
        ]
    }
}
