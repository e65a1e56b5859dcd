use fieldfix_types::{
    ConstraintErrorRecord, CorrectionRecord, ErrorContext, ErrorKey, ErrorKind, LEDGER_COLUMNS,
    LogicErrorRecord, SourceRecord,
};
use pretty_assertions::assert_eq;

fn context(unique_id: &str, variable: &str) -> ErrorContext {
    ErrorContext {
        unique_id: unique_id.to_string(),
        variable: variable.to_string(),
        username: "enum_01".to_string(),
        supervisor: "sup_a".to_string(),
        woreda: "Adami Tulu".to_string(),
        kebele: "Bochessa".to_string(),
        farmer_name: "Almaz".to_string(),
        phone_no: "0911000000".to_string(),
        subdate: "2025-03-01".to_string(),
    }
}

#[test]
fn error_kind_serializes_snake_case() {
    let c = serde_json::to_value(ErrorKind::Constraint).expect("serialize");
    let l = serde_json::to_value(ErrorKind::Logic).expect("serialize");
    assert_eq!(c, serde_json::json!("constraint"));
    assert_eq!(l, serde_json::json!("logic"));
}

#[test]
fn error_key_is_internally_tagged() {
    let key = ErrorKey::new(ErrorKind::Constraint, "101", "plot_size");
    let value = serde_json::to_value(&key).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({ "kind": "constraint", "unique_id": "101", "variable": "plot_size" })
    );
    let back: ErrorKey = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, key);
}

#[test]
fn source_record_flattens_context() {
    let record = SourceRecord::Logic(LogicErrorRecord {
        context: context("7", "crop_area"),
        reported_value: "40".to_string(),
        reference_value: "25".to_string(),
    });
    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(value["kind"], "logic");
    assert_eq!(value["unique_id"], "7");
    assert_eq!(value["reference_value"], "25");
    assert_eq!(record.reference_value(), "25");
    assert_eq!(record.key(), ErrorKey::new(ErrorKind::Logic, "7", "crop_area"));
}

#[test]
fn constraint_record_reference_is_rule_text() {
    let record = SourceRecord::from(ConstraintErrorRecord {
        context: context("101", "plot_size"),
        reported_value: "600".to_string(),
        constraint_rule: "max 500".to_string(),
    });
    assert_eq!(record.kind(), ErrorKind::Constraint);
    assert_eq!(record.reported_value(), "600");
    assert_eq!(record.reference_value(), "max 500");
}

#[test]
fn correction_cells_follow_ledger_columns() {
    let record = CorrectionRecord {
        error_type: ErrorKind::Constraint,
        username: "enum_01".to_string(),
        supervisor: "sup_a".to_string(),
        woreda: "w".to_string(),
        kebele: "k".to_string(),
        farmer_name: "Almaz".to_string(),
        phone_no: "0911".to_string(),
        subdate: "2025-03-01".to_string(),
        unique_id: "101".to_string(),
        variable: "plot_size".to_string(),
        original_value: "600".to_string(),
        reference_value: "max 500".to_string(),
        correct_value: 450,
        explanation: "re-measured".to_string(),
        corrected_by: "enum_01".to_string(),
        correction_date: "05-Mar-25".to_string(),
        correction_timestamp: "2025-03-05T10:00:00.000000".to_string(),
    };
    let cells = record.to_cells();
    assert_eq!(cells.len(), LEDGER_COLUMNS.len());
    assert_eq!(cells[0], "constraint");
    assert_eq!(cells[12], "450");
    assert_eq!(cells[16], "2025-03-05T10:00:00.000000");
    assert_eq!(record.key(), ErrorKey::new(ErrorKind::Constraint, "101", "plot_size"));
}
