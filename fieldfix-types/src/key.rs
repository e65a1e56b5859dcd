use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rule set flagged a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Constraint,
    Logic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Constraint => "constraint",
            ErrorKind::Logic => "logic",
        }
    }

    /// Capitalised form used in user-facing labels.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::Constraint => "Constraint",
            ErrorKind::Logic => "Logic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constraint" | "c" => Some(ErrorKind::Constraint),
            "logic" | "l" => Some(ErrorKind::Logic),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable handle for one flagged value: namespace + (unique_id, variable).
///
/// Used as the key of the pending-edit map and of the resolved-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKey {
    Constraint { unique_id: String, variable: String },
    Logic { unique_id: String, variable: String },
}

impl ErrorKey {
    pub fn new(kind: ErrorKind, unique_id: impl Into<String>, variable: impl Into<String>) -> Self {
        let unique_id = unique_id.into();
        let variable = variable.into();
        match kind {
            ErrorKind::Constraint => ErrorKey::Constraint {
                unique_id,
                variable,
            },
            ErrorKind::Logic => ErrorKey::Logic {
                unique_id,
                variable,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorKey::Constraint { .. } => ErrorKind::Constraint,
            ErrorKey::Logic { .. } => ErrorKind::Logic,
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            ErrorKey::Constraint { unique_id, .. } | ErrorKey::Logic { unique_id, .. } => unique_id,
        }
    }

    pub fn variable(&self) -> &str {
        match self {
            ErrorKey::Constraint { variable, .. } | ErrorKey::Logic { variable, .. } => variable,
        }
    }

    /// Human-readable label, e.g. "Logic error for crop_area".
    pub fn label(&self) -> String {
        format!("{} error for {}", self.kind().title(), self.variable())
    }
}

/// `constraint_<unique_id>_<variable>`; matches the widget keys of the field app.
impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind(), self.unique_id(), self.variable())
    }
}
