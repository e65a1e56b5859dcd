//! Property-based tests for deterministic ordering in fieldfix-domain.
//!
//! These tests verify that:
//! - The worklist is identical regardless of source row order
//! - Farmers are sorted by id with integer ids first
//! - Every filtered row appears exactly once in the key list

use fieldfix_domain::outstanding_errors;
use fieldfix_types::{ConstraintErrorRecord, ErrorContext, LogicErrorRecord};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

fn context(id: String, var: String, user: &str) -> ErrorContext {
    ErrorContext {
        unique_id: id,
        variable: var,
        username: user.to_string(),
        ..ErrorContext::default()
    }
}

fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..500).prop_map(|n| n.to_string()),
        prop::string::string_regex(r"[A-Z]{2}-[0-9]{1,3}").unwrap(),
    ]
}

/// Rows with unique (id, variable) pairs, owned by one of two enumerators.
fn arb_rows() -> impl Strategy<Value = (Vec<ConstraintErrorRecord>, Vec<LogicErrorRecord>)> {
    let row = (arb_id(), "[a-z_]{1,6}", prop::bool::ANY, prop::bool::ANY);
    prop::collection::vec(row, 0..24).prop_map(|rows| {
        let mut seen = HashSet::new();
        let mut constraints = Vec::new();
        let mut logic = Vec::new();
        for (id, var, is_logic, mine) in rows {
            if !seen.insert((id.clone(), var.clone(), is_logic)) {
                continue;
            }
            let user = if mine { "alice" } else { "bob" };
            if is_logic {
                logic.push(LogicErrorRecord {
                    context: context(id, var, user),
                    reported_value: "40".into(),
                    reference_value: "25".into(),
                });
            } else {
                constraints.push(ConstraintErrorRecord {
                    context: context(id, var, user),
                    reported_value: "600".into(),
                    constraint_rule: "max 500".into(),
                });
            }
        }
        (constraints, logic)
    })
}

fn id_rank(id: &str) -> (u8, i64, String) {
    match id.parse::<i64>() {
        Ok(n) => (0, n, id.to_string()),
        Err(_) => (1, 0, id.to_string()),
    }
}

proptest! {
    #[test]
    fn source_order_does_not_matter((constraints, logic) in arb_rows()) {
        let resolved = BTreeSet::new();
        let forward = outstanding_errors(&constraints, &logic, "alice", &resolved);

        let mut c_rev = constraints.clone();
        c_rev.reverse();
        let mut l_rev = logic.clone();
        l_rev.reverse();
        let backward = outstanding_errors(&c_rev, &l_rev, "alice", &resolved);

        let ids = |o: &fieldfix_domain::Outstanding| {
            o.farmers.iter().map(|f| f.unique_id.clone()).collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&forward), ids(&backward));
        prop_assert_eq!(
            forward.keys().into_iter().collect::<BTreeSet<_>>(),
            backward.keys().into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn farmers_are_sorted_integers_first((constraints, logic) in arb_rows()) {
        let out = outstanding_errors(&constraints, &logic, "alice", &BTreeSet::new());
        let ranks: Vec<_> = out.farmers.iter().map(|f| id_rank(&f.unique_id)).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        prop_assert_eq!(ranks, sorted);
    }

    #[test]
    fn every_owned_row_is_listed_once((constraints, logic) in arb_rows()) {
        let out = outstanding_errors(&constraints, &logic, "alice", &BTreeSet::new());
        let owned = constraints.iter().filter(|r| r.context.username == "alice").count()
            + logic.iter().filter(|r| r.context.username == "alice").count();
        let keys = out.keys();
        prop_assert_eq!(keys.len(), owned);
        prop_assert_eq!(keys.iter().collect::<BTreeSet<_>>().len(), owned);
        prop_assert_eq!(out.total_issues(), owned);
    }
}
