//! Typed decoding of source tables and the corrections ledger.
//!
//! Rows are decoded once, here, into the tagged record types of `fieldfix-types`; nothing
//! downstream looks cells up by column name.

use crate::table::Table;
use fieldfix_types::{
    ConstraintErrorRecord, CorrectionRecord, ErrorContext, ErrorKind, LEDGER_COLUMNS,
    LogicErrorRecord,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table}: row {row}: column '{column}' has invalid value '{value}'")]
    InvalidCell {
        table: String,
        row: usize,
        column: String,
        value: String,
    },
}

/// Accepted header spellings, first match wins.
const UNIQUE_ID: &[&str] = &["unique_id"];
const VARIABLE: &[&str] = &["variable"];
const USERNAME: &[&str] = &["username"];
const REPORTED: &[&str] = &["value", "reported_value"];
const RULE: &[&str] = &["constraint", "constraint_rule"];
const REFERENCE: &[&str] = &["Troster Value", "reference_value", "system_value"];

struct Columns<'a> {
    table: &'a Table,
    name: &'a str,
}

impl<'a> Columns<'a> {
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.table.column(a))
    }

    fn require(&self, aliases: &[&str]) -> Result<usize, DecodeError> {
        self.find(aliases).ok_or_else(|| DecodeError::MissingColumn {
            table: self.name.to_string(),
            column: aliases[0].to_string(),
        })
    }

    fn context(&self) -> Result<ContextColumns, DecodeError> {
        Ok(ContextColumns {
            unique_id: self.require(UNIQUE_ID)?,
            variable: self.require(VARIABLE)?,
            username: self.require(USERNAME)?,
            supervisor: self.find(&["supervisor"]),
            woreda: self.find(&["woreda"]),
            kebele: self.find(&["kebele"]),
            farmer_name: self.find(&["farmer_name"]),
            phone_no: self.find(&["phone_no"]),
            subdate: self.find(&["subdate"]),
        })
    }
}

struct ContextColumns {
    unique_id: usize,
    variable: usize,
    username: usize,
    supervisor: Option<usize>,
    woreda: Option<usize>,
    kebele: Option<usize>,
    farmer_name: Option<usize>,
    phone_no: Option<usize>,
    subdate: Option<usize>,
}

impl ContextColumns {
    fn read(&self, row: &[String]) -> ErrorContext {
        let opt = |idx: Option<usize>| idx.map(|i| cell(row, i)).unwrap_or_default();
        ErrorContext {
            unique_id: cell(row, self.unique_id),
            variable: cell(row, self.variable),
            username: cell(row, self.username),
            supervisor: opt(self.supervisor),
            woreda: opt(self.woreda),
            kebele: opt(self.kebele),
            farmer_name: opt(self.farmer_name),
            phone_no: opt(self.phone_no),
            subdate: opt(self.subdate),
        }
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|c| c.trim().to_string()).unwrap_or_default()
}

pub fn decode_constraint_errors(
    table: &Table,
    name: &str,
) -> Result<Vec<ConstraintErrorRecord>, DecodeError> {
    let cols = Columns { table, name };
    let context = cols.context()?;
    let reported = cols.require(REPORTED)?;
    let rule = cols.require(RULE)?;

    Ok(table
        .rows
        .iter()
        .map(|row| ConstraintErrorRecord {
            context: context.read(row),
            reported_value: cell(row, reported),
            constraint_rule: cell(row, rule),
        })
        .collect())
}

pub fn decode_logic_errors(
    table: &Table,
    name: &str,
) -> Result<Vec<LogicErrorRecord>, DecodeError> {
    let cols = Columns { table, name };
    let context = cols.context()?;
    let reported = cols.require(REPORTED)?;
    let reference = cols.require(REFERENCE)?;

    Ok(table
        .rows
        .iter()
        .map(|row| LogicErrorRecord {
            context: context.read(row),
            reported_value: cell(row, reported),
            reference_value: cell(row, reference),
        })
        .collect())
}

/// Decode the corrections ledger. A table without a header (empty blob) holds no corrections.
pub fn decode_corrections(table: &Table, name: &str) -> Result<Vec<CorrectionRecord>, DecodeError> {
    if table.header.is_empty() {
        return Ok(Vec::new());
    }
    let cols = Columns { table, name };
    for column in LEDGER_COLUMNS {
        cols.require(&[column])?;
    }

    let mut out = Vec::with_capacity(table.len());
    for (i, mut row) in table.project(&LEDGER_COLUMNS).into_iter().enumerate() {
        let invalid = |column: &str, value: &str| DecodeError::InvalidCell {
            table: name.to_string(),
            row: i + 1,
            column: column.to_string(),
            value: value.to_string(),
        };
        let error_type =
            ErrorKind::parse(&row[0]).ok_or_else(|| invalid("error_type", &row[0]))?;
        let correct_value =
            parse_integer(&row[12]).ok_or_else(|| invalid("correct_value", &row[12]))?;

        out.push(CorrectionRecord {
            error_type,
            username: take(&mut row, 1),
            supervisor: take(&mut row, 2),
            woreda: take(&mut row, 3),
            kebele: take(&mut row, 4),
            farmer_name: take(&mut row, 5),
            phone_no: take(&mut row, 6),
            subdate: take(&mut row, 7),
            unique_id: take(&mut row, 8),
            variable: take(&mut row, 9),
            original_value: take(&mut row, 10),
            reference_value: take(&mut row, 11),
            correct_value,
            explanation: take(&mut row, 13),
            corrected_by: take(&mut row, 14),
            correction_date: take(&mut row, 15),
            correction_timestamp: take(&mut row, 16),
        });
    }
    Ok(out)
}

fn take(row: &mut [String], idx: usize) -> String {
    std::mem::take(&mut row[idx])
}

pub fn encode_corrections(records: &[CorrectionRecord]) -> Table {
    let mut table = Table::new(LEDGER_COLUMNS);
    for record in records {
        table.push_row(record.to_cells());
    }
    table
}

/// Integers as spreadsheet exports write them: `450`, ` 450 `, or `450.0`.
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.strip_suffix(".0").and_then(|t| t.parse::<i64>().ok()))
}
