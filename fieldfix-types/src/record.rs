use crate::key::{ErrorKey, ErrorKind};
use serde::{Deserialize, Serialize};

/// Identity and contact fields shared by both source tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub unique_id: String,
    pub variable: String,
    pub username: String,
    #[serde(default)]
    pub supervisor: String,
    #[serde(default)]
    pub woreda: String,
    #[serde(default)]
    pub kebele: String,
    #[serde(default)]
    pub farmer_name: String,
    #[serde(default)]
    pub phone_no: String,
    #[serde(default)]
    pub subdate: String,
}

/// A reported value outside its declared range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintErrorRecord {
    #[serde(flatten)]
    pub context: ErrorContext,
    /// Raw cell text; coerced to an integer only for display.
    pub reported_value: String,
    /// Free-text rule, e.g. "max 500, min 0".
    pub constraint_rule: String,
}

impl ConstraintErrorRecord {
    pub fn key(&self) -> ErrorKey {
        ErrorKey::new(
            ErrorKind::Constraint,
            self.context.unique_id.clone(),
            self.context.variable.clone(),
        )
    }
}

/// A reported value that disagrees with a second ("system") data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicErrorRecord {
    #[serde(flatten)]
    pub context: ErrorContext,
    pub reported_value: String,
    pub reference_value: String,
}

impl LogicErrorRecord {
    pub fn key(&self) -> ErrorKey {
        ErrorKey::new(
            ErrorKind::Logic,
            self.context.unique_id.clone(),
            self.context.variable.clone(),
        )
    }
}

/// Either kind of flagged record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRecord {
    Constraint(ConstraintErrorRecord),
    Logic(LogicErrorRecord),
}

impl SourceRecord {
    pub fn key(&self) -> ErrorKey {
        match self {
            SourceRecord::Constraint(r) => r.key(),
            SourceRecord::Logic(r) => r.key(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceRecord::Constraint(_) => ErrorKind::Constraint,
            SourceRecord::Logic(_) => ErrorKind::Logic,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            SourceRecord::Constraint(r) => &r.context,
            SourceRecord::Logic(r) => &r.context,
        }
    }

    pub fn reported_value(&self) -> &str {
        match self {
            SourceRecord::Constraint(r) => &r.reported_value,
            SourceRecord::Logic(r) => &r.reported_value,
        }
    }

    /// Rule text for constraint errors, the system value for logic errors.
    pub fn reference_value(&self) -> &str {
        match self {
            SourceRecord::Constraint(r) => &r.constraint_rule,
            SourceRecord::Logic(r) => &r.reference_value,
        }
    }
}

impl From<ConstraintErrorRecord> for SourceRecord {
    fn from(r: ConstraintErrorRecord) -> Self {
        SourceRecord::Constraint(r)
    }
}

impl From<LogicErrorRecord> for SourceRecord {
    fn from(r: LogicErrorRecord) -> Self {
        SourceRecord::Logic(r)
    }
}
