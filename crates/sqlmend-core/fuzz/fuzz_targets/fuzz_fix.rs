//! Fuzz target for the fix loop.
//!
//! Fixing must never panic, and fixing the output again must not change it
//! once the first run converged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlmend_core::{fix_sql, LintRequest};

fuzz_target!(|data: &[u8]| {
    let Ok(sql) = std::str::from_utf8(data) else {
        return;
    };
    let first = fix_sql(&LintRequest::new(sql));
    if first.converged && first.violations.is_empty() {
        let second = fix_sql(&LintRequest::new(first.fixed_sql.as_str()));
        assert_eq!(second.fixed_sql, first.fixed_sql);
    }
});
