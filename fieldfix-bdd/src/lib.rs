//! BDD harness (cucumber-rs).
//!
//! This crate exists to keep scenario tests isolated from the production crates. The library
//! part only builds source tables for scenarios.

use fieldfix_ledger::Table;

const CONTEXT_COLUMNS: [&str; 9] = [
    "unique_id",
    "variable",
    "username",
    "supervisor",
    "woreda",
    "kebele",
    "farmer_name",
    "phone_no",
    "subdate",
];

/// Accumulates flagged rows and renders the two source tables.
#[derive(Debug, Clone, Default)]
pub struct SurveyFixture {
    constraints: Vec<Vec<String>>,
    logic: Vec<Vec<String>>,
}

fn context_cells(enumerator: &str, unique_id: &str, variable: &str) -> Vec<String> {
    vec![
        unique_id.to_string(),
        variable.to_string(),
        enumerator.to_string(),
        "sup_a".to_string(),
        "Adami Tulu".to_string(),
        "Bochessa".to_string(),
        format!("Farmer {}", unique_id),
        format!("09{:0>8}", unique_id),
        "2025-03-01".to_string(),
    ]
}

impl SurveyFixture {
    pub fn constraint(
        &mut self,
        enumerator: &str,
        unique_id: &str,
        variable: &str,
        reported: &str,
        rule: &str,
    ) {
        let mut row = context_cells(enumerator, unique_id, variable);
        row.extend([reported.to_string(), rule.to_string()]);
        self.constraints.push(row);
    }

    pub fn logic(
        &mut self,
        enumerator: &str,
        unique_id: &str,
        variable: &str,
        reported: &str,
        reference: &str,
    ) {
        let mut row = context_cells(enumerator, unique_id, variable);
        row.extend([reported.to_string(), reference.to_string()]);
        self.logic.push(row);
    }

    pub fn constraints_csv(&self) -> String {
        render(&self.constraints, "constraint")
    }

    pub fn logic_csv(&self) -> String {
        render(&self.logic, "Troster Value")
    }
}

fn render(rows: &[Vec<String>], last: &str) -> String {
    let mut table = Table::new(CONTEXT_COLUMNS.iter().copied().chain(["value", last]));
    for row in rows {
        table.push_row(row.clone());
    }
    table.to_csv()
}
