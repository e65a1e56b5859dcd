use crate::bounds::{advisory_bounds, display_value};
use crate::extract::Outstanding;
use fieldfix_types::{ErrorKey, SourceRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Edits held for one error key until the next successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCorrection {
    pub key: ErrorKey,
    pub source: SourceRecord,
    pub corrected_value: i64,
    pub explanation: String,
}

impl PendingCorrection {
    /// Seeded with the value the edit control would display.
    fn seeded(key: ErrorKey, source: SourceRecord) -> Self {
        let corrected_value = display_value(source.reported_value(), advisory_bounds(&source));
        Self {
            key,
            source,
            corrected_value,
            explanation: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.explanation.trim().is_empty()
    }
}

/// A single field change emitted by the interactive surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    CorrectedValue(i64),
    Explanation(String),
}

impl FieldEdit {
    /// Parse a `(field, value)` pair. Field names: `value` / `corrected_value`, `explanation`.
    pub fn parse(field: &str, value: &str) -> Result<Self, EditError> {
        match field.trim() {
            "value" | "corrected_value" => value
                .trim()
                .parse::<i64>()
                .map(FieldEdit::CorrectedValue)
                .map_err(|_| EditError::InvalidValue {
                    value: value.to_string(),
                }),
            "explanation" | "explain" => Ok(FieldEdit::Explanation(value.to_string())),
            other => Err(EditError::UnknownField {
                field: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("{key} is not an outstanding error for this session")]
    NotOutstanding { key: ErrorKey },

    #[error("unknown field '{field}' (expected 'value' or 'explanation')")]
    UnknownField { field: String },

    #[error("'{value}' is not a whole number")]
    InvalidValue { value: String },
}

/// Result of a completeness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub ok: bool,
    /// One label per incomplete key, in key order.
    pub missing: Vec<String>,
    pub completed: usize,
    pub total: usize,
}

impl Completeness {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// Check that every outstanding key has a pending correction with a non-blank explanation.
pub fn validate_complete(
    pending: &BTreeMap<ErrorKey, PendingCorrection>,
    outstanding_keys: &[ErrorKey],
) -> Completeness {
    let mut missing = Vec::new();
    let mut completed = 0;
    for key in outstanding_keys {
        match pending.get(key) {
            Some(p) if p.is_complete() => completed += 1,
            _ => missing.push(key.label()),
        }
    }
    let total = outstanding_keys.len();
    Completeness {
        ok: completed == total,
        missing,
        completed,
        total,
    }
}

/// Per-session mutable state: what has been saved, and what is being edited.
///
/// `resolved` only grows. A key leaves `pending` when it joins `resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    resolved: BTreeSet<ErrorKey>,
    pending: BTreeMap<ErrorKey, PendingCorrection>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self) -> &BTreeSet<ErrorKey> {
        &self.resolved
    }

    pub fn pending(&self) -> &BTreeMap<ErrorKey, PendingCorrection> {
        &self.pending
    }

    pub fn pending_for(&self, key: &ErrorKey) -> Option<&PendingCorrection> {
        self.pending.get(key)
    }

    /// Overwrite one field of the pending correction for `key`, creating it if absent.
    ///
    /// `outstanding` must be derived against this state's resolved-set; keys outside it are
    /// rejected so no edit can target an error that is already saved or belongs elsewhere.
    pub fn record_edit(
        &mut self,
        outstanding: &Outstanding,
        key: &ErrorKey,
        edit: FieldEdit,
    ) -> Result<&PendingCorrection, EditError> {
        if self.resolved.contains(key) {
            return Err(EditError::NotOutstanding { key: key.clone() });
        }
        // Checked for pending keys too: a refreshed worklist may have dropped the row.
        let Some(source) = outstanding.find(key) else {
            return Err(EditError::NotOutstanding { key: key.clone() });
        };
        let entry = self
            .pending
            .entry(key.clone())
            .or_insert_with(|| PendingCorrection::seeded(key.clone(), source));
        match edit {
            FieldEdit::CorrectedValue(v) => entry.corrected_value = v,
            FieldEdit::Explanation(text) => entry.explanation = text,
        }
        debug!(key = %key, "edit recorded");
        Ok(entry)
    }

    pub fn validate(&self, outstanding: &Outstanding) -> Completeness {
        validate_complete(&self.pending, &outstanding.keys())
    }

    /// Record a confirmed save: keys join the resolved-set and their pending edits are dropped.
    pub fn mark_committed(&mut self, keys: &[ErrorKey]) {
        for key in keys {
            self.pending.remove(key);
            self.resolved.insert(key.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::outstanding_errors;
    use fieldfix_types::{ConstraintErrorRecord, ErrorContext, ErrorKind, LogicErrorRecord};
    use pretty_assertions::assert_eq;

    fn fixture() -> (Vec<ConstraintErrorRecord>, Vec<LogicErrorRecord>) {
        let ctx = |id: &str, var: &str| ErrorContext {
            unique_id: id.into(),
            variable: var.into(),
            username: "enum_01".into(),
            ..ErrorContext::default()
        };
        (
            vec![ConstraintErrorRecord {
                context: ctx("101", "plot_size"),
                reported_value: "600".into(),
                constraint_rule: "max 500".into(),
            }],
            vec![LogicErrorRecord {
                context: ctx("202", "crop_area"),
                reported_value: "40".into(),
                reference_value: "25".into(),
            }],
        )
    }

    fn outstanding(state: &SessionState) -> Outstanding {
        let (c, l) = fixture();
        outstanding_errors(&c, &l, "enum_01", state.resolved())
    }

    fn constraint_key() -> ErrorKey {
        ErrorKey::new(ErrorKind::Constraint, "101", "plot_size")
    }

    #[test]
    fn first_edit_seeds_displayed_value() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        let p = state
            .record_edit(&out, &constraint_key(), FieldEdit::Explanation("re-measured".into()))
            .expect("edit");
        assert_eq!(p.corrected_value, 500);
        assert_eq!(p.explanation, "re-measured");
    }

    #[test]
    fn later_edits_overwrite() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        let key = constraint_key();
        state
            .record_edit(&out, &key, FieldEdit::CorrectedValue(450))
            .expect("edit");
        state
            .record_edit(&out, &key, FieldEdit::CorrectedValue(480))
            .expect("edit");
        state
            .record_edit(&out, &key, FieldEdit::Explanation(String::new()))
            .expect("edit");
        let p = state.pending_for(&key).expect("pending");
        assert_eq!(p.corrected_value, 480);
        assert!(!p.is_complete());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        let err = state
            .record_edit(
                &out,
                &ErrorKey::new(ErrorKind::Logic, "101", "plot_size"),
                FieldEdit::CorrectedValue(1),
            )
            .expect_err("not outstanding");
        assert!(matches!(err, EditError::NotOutstanding { .. }));
        assert!(state.pending().is_empty());
    }

    #[test]
    fn validation_counts_blank_explanations_as_missing() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        state
            .record_edit(&out, &constraint_key(), FieldEdit::Explanation("   ".into()))
            .expect("edit");
        let c = state.validate(&out);
        assert_eq!(
            c,
            Completeness {
                ok: false,
                missing: vec![
                    "Constraint error for plot_size".to_string(),
                    "Logic error for crop_area".to_string()
                ],
                completed: 0,
                total: 2,
            }
        );
    }

    #[test]
    fn validation_is_ok_when_all_explained() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        for key in out.keys() {
            state
                .record_edit(&out, &key, FieldEdit::Explanation("checked".into()))
                .expect("edit");
        }
        let c = state.validate(&out);
        assert!(c.ok);
        assert!(c.missing.is_empty());
        assert_eq!((c.completed, c.total), (2, 2));
        // Pure: a second call sees the same thing.
        assert_eq!(state.validate(&out), c);
    }

    #[test]
    fn committed_keys_leave_pending_and_cannot_be_edited() {
        let mut state = SessionState::new();
        let out = outstanding(&state);
        let key = constraint_key();
        state
            .record_edit(&out, &key, FieldEdit::Explanation("x".into()))
            .expect("edit");
        state.mark_committed(std::slice::from_ref(&key));

        assert!(state.resolved().contains(&key));
        assert!(state.pending_for(&key).is_none());
        assert!(!outstanding(&state).contains(&key));
        // Even with a stale worklist the key stays closed.
        assert!(
            state
                .record_edit(&out, &key, FieldEdit::CorrectedValue(1))
                .is_err()
        );
    }

    #[test]
    fn pending_key_dropped_from_refreshed_worklist_is_rejected() {
        let mut state = SessionState::new();
        let key = constraint_key();
        state
            .record_edit(&outstanding(&state), &key, FieldEdit::CorrectedValue(450))
            .expect("edit");

        let (_, logic) = fixture();
        let refreshed = outstanding_errors(&[], &logic, "enum_01", state.resolved());
        let err = state
            .record_edit(&refreshed, &key, FieldEdit::Explanation("late".into()))
            .expect_err("row is gone");
        assert!(matches!(err, EditError::NotOutstanding { .. }));
        assert_eq!(state.pending_for(&key).map(|p| p.explanation.as_str()), Some(""));
    }

    #[test]
    fn field_edit_parse() {
        assert_eq!(
            FieldEdit::parse("value", " 450 "),
            Ok(FieldEdit::CorrectedValue(450))
        );
        assert_eq!(
            FieldEdit::parse("explanation", "typo"),
            Ok(FieldEdit::Explanation("typo".into()))
        );
        assert!(matches!(
            FieldEdit::parse("value", "4.5"),
            Err(EditError::InvalidValue { .. })
        ));
        assert!(matches!(
            FieldEdit::parse("colour", "x"),
            Err(EditError::UnknownField { .. })
        ));
    }
}
