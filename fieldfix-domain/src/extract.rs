use fieldfix_types::{ConstraintErrorRecord, ErrorKey, LogicErrorRecord, SourceRecord};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// One farmer's outstanding errors, as shown on the worklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmerErrors {
    pub unique_id: String,
    pub farmer_name: String,
    pub phone_no: String,
    pub constraints: Vec<ConstraintErrorRecord>,
    pub logic: Vec<LogicErrorRecord>,
}

impl FarmerErrors {
    pub fn issue_count(&self) -> usize {
        self.constraints.len() + self.logic.len()
    }
}

/// Everything still open for one enumerator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outstanding {
    pub enumerator: String,
    /// Grouped by farmer, in display order.
    pub farmers: Vec<FarmerErrors>,
}

impl Outstanding {
    pub fn is_empty(&self) -> bool {
        self.farmers.is_empty()
    }

    pub fn farmer_count(&self) -> usize {
        self.farmers.len()
    }

    pub fn total_issues(&self) -> usize {
        self.farmers.iter().map(FarmerErrors::issue_count).sum()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintErrorRecord> {
        self.farmers.iter().flat_map(|f| f.constraints.iter())
    }

    pub fn logic(&self) -> impl Iterator<Item = &LogicErrorRecord> {
        self.farmers.iter().flat_map(|f| f.logic.iter())
    }

    /// Keys in display order: farmer by farmer, constraint errors before logic errors.
    pub fn keys(&self) -> Vec<ErrorKey> {
        self.farmers
            .iter()
            .flat_map(|f| {
                f.constraints
                    .iter()
                    .map(ConstraintErrorRecord::key)
                    .chain(f.logic.iter().map(LogicErrorRecord::key))
            })
            .collect()
    }

    pub fn contains(&self, key: &ErrorKey) -> bool {
        self.find(key).is_some()
    }

    pub fn find(&self, key: &ErrorKey) -> Option<SourceRecord> {
        let farmer = self
            .farmers
            .iter()
            .find(|f| f.unique_id == key.unique_id())?;
        match key {
            ErrorKey::Constraint { variable, .. } => farmer
                .constraints
                .iter()
                .find(|r| &r.context.variable == variable)
                .cloned()
                .map(SourceRecord::from),
            ErrorKey::Logic { variable, .. } => farmer
                .logic
                .iter()
                .find(|r| &r.context.variable == variable)
                .cloned()
                .map(SourceRecord::from),
        }
    }
}

/// Integer ids first, numerically; everything else after, lexicographically.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdOrder<'a> {
    Numeric(i64, &'a str),
    Text(&'a str),
}

fn id_order(id: &str) -> IdOrder<'_> {
    match id.parse::<i64>() {
        Ok(n) => IdOrder::Numeric(n, id),
        Err(_) => IdOrder::Text(id),
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    id_order(a).cmp(&id_order(b))
}

/// Keep the first row per key; later duplicates are logged and dropped.
fn first_per_key<T, K>(rows: impl Iterator<Item = T>, key: K, table: &str) -> Vec<T>
where
    K: Fn(&T) -> ErrorKey,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let k = key(&row);
        if seen.insert(k.clone()) {
            out.push(row);
        } else {
            warn!(table, key = %k, "duplicate error row ignored");
        }
    }
    out
}

/// Derive the outstanding errors for `enumerator`, excluding anything in `resolved`.
pub fn outstanding_errors(
    constraints: &[ConstraintErrorRecord],
    logic: &[LogicErrorRecord],
    enumerator: &str,
    resolved: &BTreeSet<ErrorKey>,
) -> Outstanding {
    let constraints = first_per_key(
        constraints
            .iter()
            .filter(|r| r.context.username == enumerator),
        |r| r.key(),
        "constraints",
    )
    .into_iter()
    .filter(|r| !resolved.contains(&r.key()));
    let logic = first_per_key(
        logic.iter().filter(|r| r.context.username == enumerator),
        |r| r.key(),
        "logic",
    )
    .into_iter()
    .filter(|r| !resolved.contains(&r.key()));

    let mut by_farmer: BTreeMap<&str, (Vec<ConstraintErrorRecord>, Vec<LogicErrorRecord>)> =
        BTreeMap::new();
    for r in constraints {
        by_farmer
            .entry(r.context.unique_id.as_str())
            .or_default()
            .0
            .push(r.clone());
    }
    for r in logic {
        by_farmer
            .entry(r.context.unique_id.as_str())
            .or_default()
            .1
            .push(r.clone());
    }

    let mut farmers: Vec<FarmerErrors> = by_farmer
        .into_iter()
        .map(|(id, (constraints, logic))| {
            let contact = constraints
                .first()
                .map(|r| &r.context)
                .or_else(|| logic.first().map(|r| &r.context));
            let (farmer_name, phone_no) = contact
                .map(|c| (c.farmer_name.clone(), c.phone_no.clone()))
                .unwrap_or_default();
            FarmerErrors {
                unique_id: id.to_string(),
                farmer_name,
                phone_no,
                constraints,
                logic,
            }
        })
        .collect();
    farmers.sort_by(|a, b| compare_ids(&a.unique_id, &b.unique_id));

    Outstanding {
        enumerator: enumerator.to_string(),
        farmers,
    }
}

/// Usernames that own at least one flagged row, sorted and de-duplicated.
pub fn list_enumerators(
    constraints: &[ConstraintErrorRecord],
    logic: &[LogicErrorRecord],
) -> Vec<String> {
    constraints
        .iter()
        .map(|r| r.context.username.trim())
        .chain(logic.iter().map(|r| r.context.username.trim()))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
