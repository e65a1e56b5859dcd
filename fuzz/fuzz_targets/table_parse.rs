#![no_main]

//! Fuzz target for the tabular codec.
//!
//! Arbitrary text must either parse or fail with a `TableError`; a parsed table must survive a
//! write and re-read with the same rows.

use fieldfix_ledger::{decode_constraint_errors, decode_corrections, parse_table};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(table) = parse_table(s) else {
        return;
    };

    let reparsed = parse_table(&table.to_csv()).expect("written table parses");
    assert_eq!(reparsed.rows, table.rows);

    // Decoders must not panic on any parsed table.
    let _ = decode_constraint_errors(&table, "fuzz");
    let _ = decode_corrections(&table, "fuzz");
});
