//! Shared test helpers for `switchboard_core` integration tests.

#![allow(unreachable_pub)]

use switchboard_core::{ArgvParser, FunctionMeta, GetArgsError, ValueMapping};

/// Owned token list from string literals.
pub fn argv(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Parse `tokens` against `meta` in strict or lenient mode, returning the
/// result together with the leftover tokens.
#[allow(dead_code)]
pub fn run(
    meta: &FunctionMeta,
    tokens: &[&str],
    strict: bool,
) -> (Result<ValueMapping, GetArgsError>, Vec<String>) {
    let mut tokens = argv(tokens);
    let result = ArgvParser::new().meta(meta).strict(strict).parse(&mut tokens);
    (result, tokens)
}

/// Parse strictly and expect success.
#[allow(dead_code)]
pub fn parse_ok(meta: &FunctionMeta, tokens: &[&str]) -> serde_json::Value {
    match run(meta, tokens, true) {
        (Ok(values), _) => values.to_json(),
        (Err(e), _) => panic!("parse of {tokens:?} failed: {e}"),
    }
}
