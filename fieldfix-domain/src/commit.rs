use crate::extract::Outstanding;
use crate::ports::Clock;
use crate::session::{Completeness, SessionState};
use fieldfix_types::{CorrectionRecord, ErrorKey};
use thiserror::Error;

const DATE_FORMAT: &str = "%d-%b-%y";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Commit refused: at least one outstanding error has no explanation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {} corrections still need an explanation", .0.remaining(), .0.total)]
pub struct Incomplete(pub Completeness);

/// Rows ready for the ledger, plus the keys to mark resolved once the write is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitBatch {
    pub records: Vec<CorrectionRecord>,
    pub keys: Vec<ErrorKey>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Assemble one correction row per outstanding key.
///
/// Does not touch `state`: the caller marks the keys committed only after the ledger confirms the
/// write, so a failed save can simply be retried.
pub fn commit(
    state: &SessionState,
    outstanding: &Outstanding,
    enumerator: &str,
    clock: &dyn Clock,
) -> Result<CommitBatch, Incomplete> {
    let keys = outstanding.keys();
    let completeness = crate::session::validate_complete(state.pending(), &keys);
    if !completeness.ok {
        return Err(Incomplete(completeness));
    }

    let now = clock.now();
    let correction_date = now.format(DATE_FORMAT).to_string();
    let correction_timestamp = now.format(TIMESTAMP_FORMAT).to_string();

    // Validation guarantees a pending entry per key.
    let records = keys
        .iter()
        .filter_map(|key| state.pending_for(key))
        .map(|p| {
            let ctx = p.source.context();
            CorrectionRecord {
                error_type: p.key.kind(),
                username: ctx.username.clone(),
                supervisor: ctx.supervisor.clone(),
                woreda: ctx.woreda.clone(),
                kebele: ctx.kebele.clone(),
                farmer_name: ctx.farmer_name.clone(),
                phone_no: ctx.phone_no.clone(),
                subdate: ctx.subdate.clone(),
                unique_id: ctx.unique_id.clone(),
                variable: ctx.variable.clone(),
                original_value: p.source.reported_value().to_string(),
                reference_value: p.source.reference_value().to_string(),
                correct_value: p.corrected_value,
                explanation: p.explanation.trim().to_string(),
                corrected_by: enumerator.to_string(),
                correction_date: correction_date.clone(),
                correction_timestamp: correction_timestamp.clone(),
            }
        })
        .collect();

    Ok(CommitBatch { records, keys })
}
