//! Rendering helpers (markdown) for human-readable output.

use fieldfix_domain::{
    Completeness, FarmerErrors, LedgerSummary, Outstanding, SessionState, advisory_bounds,
};
use fieldfix_types::{CorrectionRecord, ErrorKey, SourceRecord};

pub fn render_worklist_md(outstanding: &Outstanding, state: &SessionState) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Corrections for {}\n\n", outstanding.enumerator));
    out.push_str(&format!(
        "- Farmers to call: {}\n- Total issues: {}\n\n",
        outstanding.farmer_count(),
        outstanding.total_issues()
    ));

    if outstanding.is_empty() {
        out.push_str("_No errors to correct._\n");
        return out;
    }

    for (i, farmer) in outstanding.farmers.iter().enumerate() {
        render_farmer(&mut out, i + 1, farmer, state);
    }
    out
}

fn render_farmer(out: &mut String, n: usize, farmer: &FarmerErrors, state: &SessionState) {
    let name = if farmer.farmer_name.is_empty() {
        "(no name)"
    } else {
        farmer.farmer_name.as_str()
    };
    out.push_str(&format!("## {}. {} (`{}`)\n\n", n, name, farmer.unique_id));
    if !farmer.phone_no.is_empty() {
        out.push_str(&format!("- Phone: {}\n", farmer.phone_no));
    }
    out.push_str(&format!("- Issues: {}\n\n", farmer.issue_count()));

    let records = farmer
        .constraints
        .iter()
        .cloned()
        .map(SourceRecord::from)
        .chain(farmer.logic.iter().cloned().map(SourceRecord::from));
    for record in records {
        render_error(out, &record, state);
    }
    out.push('\n');
}

fn render_error(out: &mut String, record: &SourceRecord, state: &SessionState) {
    let key = record.key();
    let bounds = advisory_bounds(record);
    out.push_str(&format!(
        "- **{}** `{}`\n",
        key.label(),
        key_ref(&key)
    ));
    out.push_str(&format!("  - Reported: {}\n", record.reported_value()));
    match record {
        SourceRecord::Constraint(r) => {
            out.push_str(&format!("  - Rule: {}\n", r.constraint_rule));
        }
        SourceRecord::Logic(r) => {
            out.push_str(&format!("  - System shows: {}\n", r.reference_value));
            if let Some(diff) = difference(&r.reported_value, &r.reference_value) {
                out.push_str(&format!("  - Difference: {}\n", diff));
            }
        }
    }
    out.push_str(&format!(
        "  - Allowed: {} to {}\n",
        bounds.min(),
        bounds.max()
    ));
    match state.pending_for(&key) {
        Some(p) => {
            out.push_str(&format!("  - Correct value: {}\n", p.corrected_value));
            if p.is_complete() {
                out.push_str(&format!("  - Reason: {}\n", p.explanation.trim()));
            } else {
                out.push_str("  - Reason: _required_\n");
            }
        }
        None => out.push_str("  - _Not edited yet_\n"),
    }
}

/// `<kind> <id> <variable>`, the form the session commands take.
pub fn key_ref(key: &ErrorKey) -> String {
    format!("{} {} {}", key.kind(), key.unique_id(), key.variable())
}

fn difference(reported: &str, reference: &str) -> Option<i64> {
    let r = reported.trim().parse::<i64>().ok()?;
    let f = reference.trim().parse::<i64>().ok()?;
    r.checked_sub(f)
}

pub fn render_progress(c: &Completeness) -> String {
    format!("Progress: {}/{} corrections completed\n", c.completed, c.total)
}

/// One bullet per incomplete correction.
pub fn render_missing(c: &Completeness) -> String {
    let mut out = String::new();
    for label in &c.missing {
        out.push_str(&format!("• {} - Explanation required\n", label));
    }
    out
}

pub fn render_enumerators(names: &[String]) -> String {
    if names.is_empty() {
        return "_No enumerators have flagged records._\n".to_string();
    }
    let mut out = String::new();
    for name in names {
        out.push_str(&format!("- {}\n", name));
    }
    out
}

pub fn render_admin_md(summary: &LedgerSummary) -> String {
    let mut out = String::new();
    out.push_str("# Admin dashboard\n\n");
    out.push_str(&format!(
        "- Total corrections: {}\n- Enumerators: {}\n- Farmers corrected: {}\n\n",
        summary.total, summary.enumerator_count, summary.farmer_count
    ));

    out.push_str("## Recent corrections\n\n");
    if summary.preview.is_empty() {
        out.push_str("_No corrections collected yet._\n");
        return out;
    }

    out.push_str("| Date | Enumerator | Farmer | Variable | Type | Original | Corrected | Reason |\n");
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for r in &summary.preview {
        out.push_str(&preview_row(r));
    }
    out
}

fn preview_row(r: &CorrectionRecord) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
        cell(&r.correction_date),
        cell(&r.corrected_by),
        cell(&r.unique_id),
        cell(&r.variable),
        r.error_type,
        cell(&r.original_value),
        r.correct_value,
        cell(&r.explanation)
    )
}

/// Keep a markdown table cell on one line.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}
