//! Fuzz target for the tree parser.
//!
//! Any input must produce a tree whose leaves concatenate back to it.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlmend_core::{parse_tree, Dialect};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    sql: String,
    dialect_idx: u8,
}

impl FuzzInput {
    fn dialect(&self) -> Dialect {
        match self.dialect_idx % 5 {
            0 => Dialect::Generic,
            1 => Dialect::Postgres,
            2 => Dialect::Snowflake,
            3 => Dialect::Bigquery,
            _ => Dialect::Duckdb,
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let parsed = parse_tree(&input.sql, input.dialect());
    assert_eq!(parsed.tree.raw(), input.sql);
});
