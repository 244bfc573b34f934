//! Switch scanner: walks a token list, dispatching recognized switches.
//!
//! The default [`GetoptScanner`] drives a [`lexopt::Parser`] over the
//! tokens, so it understands `--name`, `--name=value`, `--name value`,
//! bundled single-character switches (`-abc`, `-ofile`), interleaved options
//! and operands, and `--` as the end of options. Matched tokens are removed
//! from the list; operands (and, when passing through, unknown or failed
//! switches) stay in it in their original order.

use std::ffi::OsString;

use lexopt::{Arg, Parser};

use crate::compile::{Arity, SwitchBinding, SwitchTable};
use crate::error::GetArgsError;

/// Scanner behaviour for one scan.
///
/// Matching is always case-sensitive and single-character switches always
/// bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Leave unknown and failed switches in the token list and keep
    /// scanning instead of stopping at the first failure.
    pub pass_through: bool,
    /// Allow options after operands.
    pub permute: bool,
}

impl ScanConfig {
    /// Unknown switches are a hard failure.
    pub fn strict() -> Self {
        Self {
            pass_through: false,
            permute: true,
        }
    }

    /// Unknown switches are passed through untouched.
    pub fn lenient() -> Self {
        Self {
            pass_through: true,
            ..Self::strict()
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::strict()
    }
}

/// A scan failure.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A switch not present in the table.
    #[error("unknown option: {0}")]
    UnknownSwitch(String),
    /// A value-taking switch at the end of the token list.
    #[error("option {0} requires an argument")]
    MissingValue(String),
    /// `--flag=value` for a flag switch.
    #[error("option {0} does not take an argument")]
    UnexpectedValue(String),
    /// The bound handler failed.
    #[error(transparent)]
    Handler(GetArgsError),
    /// The token list could not be split into options and operands.
    #[error(transparent)]
    Syntax(#[from] lexopt::Error),
}

impl ScanError {
    /// The switch involved, when known.
    pub fn switch(&self) -> Option<&str> {
        match self {
            ScanError::UnknownSwitch(s) | ScanError::MissingValue(s) | ScanError::UnexpectedValue(s) => {
                Some(s.as_str())
            }
            ScanError::Handler(e) => e.switch(),
            ScanError::Syntax(_) => None,
        }
    }

    /// Whether scanning must stop even when passing failures through.
    pub fn is_fatal_when_lenient(&self) -> bool {
        match self {
            ScanError::Handler(e) => e.kind().is_fatal_when_lenient(),
            ScanError::Syntax(_) => true,
            _ => false,
        }
    }
}

/// Callback invoked for every matched switch with its (optional) value.
pub type OnSwitch<'a> = dyn FnMut(&SwitchBinding, Option<&str>) -> Result<(), GetArgsError> + 'a;

/// A token scanner.
///
/// Implementations must remove every token they attribute to a switch from
/// `tokens` and leave the rest, in order, including when returning an error.
/// A switch whose handler fails is not attributed: it stays in `tokens`
/// together with its value.
pub trait Scanner {
    /// Scan `tokens` against `table`, calling `on_switch` per match.
    ///
    /// With [`ScanConfig::pass_through`] the scan continues past failures
    /// that are not fatal and reports the first one at the end.
    fn scan(
        &self,
        tokens: &mut Vec<String>,
        table: &SwitchTable,
        config: ScanConfig,
        on_switch: &mut OnSwitch<'_>,
    ) -> Result<(), ScanError>;
}

/// Getopt-style scanner built on [`lexopt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GetoptScanner;

/// One item of the command line, detached from the parser's borrow.
enum Item {
    Long(String),
    Short(char),
    Operand(String),
}

/// What became of one switch occurrence.
enum Outcome {
    Applied,
    /// Unknown switch passed through; its raw text goes back to the caller.
    Unclaimed(Vec<String>),
    /// The switch failed; its raw tokens go back to the caller.
    Failed(Vec<String>, ScanError),
}

fn text(raw: OsString) -> String {
    raw.into_string()
        .unwrap_or_else(|raw| raw.to_string_lossy().into_owned())
}

impl Scanner for GetoptScanner {
    fn scan(
        &self,
        tokens: &mut Vec<String>,
        table: &SwitchTable,
        config: ScanConfig,
        on_switch: &mut OnSwitch<'_>,
    ) -> Result<(), ScanError> {
        let mut parser = Parser::from_args(std::mem::take(tokens));
        let mut leftover = Vec::new();
        let mut failure: Option<ScanError> = None;

        loop {
            let item = match parser.next() {
                Ok(Some(Arg::Long(name))) => Item::Long(name.to_string()),
                Ok(Some(Arg::Short(ch))) => Item::Short(ch),
                Ok(Some(Arg::Value(raw))) => Item::Operand(text(raw)),
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };
            let outcome = match item {
                Item::Operand(token) => {
                    leftover.push(token);
                    if config.permute {
                        continue;
                    }
                    break;
                }
                Item::Long(name) => long(&mut parser, &name, table, config, on_switch),
                Item::Short(ch) => short(&mut parser, ch, table, config, on_switch),
            };
            match outcome {
                Outcome::Applied => {}
                Outcome::Unclaimed(raw) => leftover.extend(raw),
                Outcome::Failed(raw, err) => {
                    leftover.extend(raw);
                    if !config.pass_through || err.is_fatal_when_lenient() {
                        failure = Some(err);
                        break;
                    }
                    failure.get_or_insert(err);
                }
            }
        }

        // Whatever the walk did not reach stays with the caller: the rest of
        // a bundle first, then the untouched tokens.
        if let Some(rest) = parser.optional_value() {
            leftover.push(format!("-{}", text(rest)));
        }
        if let Ok(rest) = parser.raw_args() {
            leftover.extend(rest.map(text));
        }
        *tokens = leftover;
        failure.map_or(Ok(()), Err)
    }
}

fn long(
    parser: &mut Parser,
    name: &str,
    table: &SwitchTable,
    config: ScanConfig,
    on_switch: &mut OnSwitch<'_>,
) -> Outcome {
    let switch = format!("--{name}");
    let inline = parser.optional_value().map(text);
    let mut raw = vec![match &inline {
        Some(value) => format!("{switch}={value}"),
        None => switch.clone(),
    }];
    let Some(binding) = table.get(name) else {
        if config.pass_through {
            return Outcome::Unclaimed(raw);
        }
        return Outcome::Failed(raw, ScanError::UnknownSwitch(switch));
    };
    let value = match (binding.arity, inline) {
        (Arity::Flag, Some(_)) => {
            return Outcome::Failed(raw, ScanError::UnexpectedValue(switch));
        }
        (Arity::Flag, None) => None,
        (Arity::Value, Some(value)) => Some(value),
        (Arity::Value, None) => match parser.value() {
            Ok(value) => {
                let value = text(value);
                raw.push(value.clone());
                Some(value)
            }
            Err(_) => return Outcome::Failed(raw, ScanError::MissingValue(switch)),
        },
    };
    apply(binding, value.as_deref(), raw, on_switch)
}

fn short(
    parser: &mut Parser,
    ch: char,
    table: &SwitchTable,
    config: ScanConfig,
    on_switch: &mut OnSwitch<'_>,
) -> Outcome {
    let switch = format!("-{ch}");
    let mut buf = [0u8; 4];
    let Some(binding) = table.get(ch.encode_utf8(&mut buf)) else {
        // The unknown character takes the rest of its bundle with it.
        let rest = parser.optional_value().map(text).unwrap_or_default();
        let raw = vec![format!("{switch}{rest}")];
        if config.pass_through {
            return Outcome::Unclaimed(raw);
        }
        return Outcome::Failed(raw, ScanError::UnknownSwitch(switch));
    };
    match binding.arity {
        Arity::Flag => apply(binding, None, vec![switch], on_switch),
        Arity::Value => {
            let (raw, value) = match parser.optional_value() {
                Some(value) => {
                    let value = text(value);
                    (vec![format!("{switch}{value}")], value)
                }
                None => match parser.value() {
                    Ok(value) => {
                        let value = text(value);
                        (vec![switch, value.clone()], value)
                    }
                    Err(_) => {
                        let raw = vec![switch.clone()];
                        return Outcome::Failed(raw, ScanError::MissingValue(switch));
                    }
                },
            };
            apply(binding, Some(&value), raw, on_switch)
        }
    }
}

fn apply(
    binding: &SwitchBinding,
    value: Option<&str>,
    raw: Vec<String>,
    on_switch: &mut OnSwitch<'_>,
) -> Outcome {
    match on_switch(binding, value) {
        Ok(()) => Outcome::Applied,
        Err(e) => Outcome::Failed(raw, ScanError::Handler(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::SwitchHandler;
    use crate::decode::{Grammar, decode_value};
    use crate::error::ErrorKind;

    fn table(specs: &[(&str, Arity)]) -> SwitchTable {
        let mut t = SwitchTable::new();
        for (name, arity) in specs {
            t.insert(SwitchBinding {
                name: (*name).to_string(),
                arity: *arity,
                handler: SwitchHandler::Assign {
                    arg: (*name).to_string(),
                },
            });
        }
        t
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(
        list: &[&str],
        table: &SwitchTable,
        config: ScanConfig,
    ) -> (Vec<String>, Vec<(String, Option<String>)>, Result<(), ScanError>) {
        let mut toks = tokens(list);
        let mut seen = Vec::new();
        let result = GetoptScanner.scan(&mut toks, table, config, &mut |b, v| {
            seen.push((b.name.clone(), v.map(str::to_string)));
            Ok(())
        });
        (toks, seen, result)
    }

    #[test]
    fn long_forms_and_operands_interleave() {
        let t = table(&[("name", Arity::Value), ("v", Arity::Flag)]);
        let (left, seen, result) = run(
            &["a", "--name=x", "b", "--name", "y", "--v", "c"],
            &t,
            ScanConfig::strict(),
        );
        result.unwrap();
        assert_eq!(left, tokens(&["a", "b", "c"]));
        assert_eq!(
            seen,
            vec![
                ("name".into(), Some("x".into())),
                ("name".into(), Some("y".into())),
                ("v".into(), None),
            ]
        );
    }

    #[test]
    fn bundled_short_switches() {
        let t = table(&[("a", Arity::Flag), ("b", Arity::Flag), ("o", Arity::Value)]);
        let (left, seen, result) = run(&["-abofile", "-o", "x", "rest"], &t, ScanConfig::strict());
        result.unwrap();
        assert_eq!(left, tokens(&["rest"]));
        let names: Vec<_> = seen.iter().map(|(n, v)| (n.as_str(), v.as_deref())).collect();
        assert_eq!(
            names,
            vec![("a", None), ("b", None), ("o", Some("file")), ("o", Some("x"))]
        );
    }

    #[test]
    fn double_dash_ends_options() {
        let t = table(&[("v", Arity::Flag)]);
        let (left, seen, result) = run(&["--v", "--", "--v", "x"], &t, ScanConfig::strict());
        result.unwrap();
        assert_eq!(left, tokens(&["--v", "x"]));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn unknown_switch_fails_when_strict() {
        let t = table(&[("v", Arity::Flag)]);
        let (left, _, result) = run(&["--v", "--nope", "x"], &t, ScanConfig::strict());
        assert!(matches!(result, Err(ScanError::UnknownSwitch(ref s)) if s == "--nope"));
        assert_eq!(left, tokens(&["--nope", "x"]));
    }

    #[test]
    fn unknown_switch_passes_through_when_lenient() {
        let t = table(&[("v", Arity::Flag)]);
        let (left, seen, result) = run(&["--nope", "--v", "-vz", "x"], &t, ScanConfig::lenient());
        result.unwrap();
        assert_eq!(left, tokens(&["--nope", "-z", "x"]));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn switch_names_are_case_sensitive() {
        let t = table(&[("name", Arity::Value)]);
        let (_, _, result) = run(&["--NAME", "x"], &t, ScanConfig::strict());
        assert!(matches!(result, Err(ScanError::UnknownSwitch(_))));
    }

    #[test]
    fn missing_and_unexpected_values() {
        let t = table(&[("name", Arity::Value), ("v", Arity::Flag)]);
        let (_, _, result) = run(&["--name"], &t, ScanConfig::strict());
        assert!(matches!(result, Err(ScanError::MissingValue(ref s)) if s == "--name"));
        let (_, _, result) = run(&["--v=1"], &t, ScanConfig::strict());
        assert!(matches!(result, Err(ScanError::UnexpectedValue(ref s)) if s == "--v"));
    }

    #[test]
    fn without_permute_first_operand_stops_scanning() {
        let t = table(&[("v", Arity::Flag)]);
        let config = ScanConfig {
            permute: false,
            ..ScanConfig::strict()
        };
        let (left, seen, result) = run(&["--v", "x", "--v"], &t, config);
        result.unwrap();
        assert_eq!(left, tokens(&["x", "--v"]));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn lone_dash_is_an_operand() {
        let t = table(&[]);
        let (left, _, result) = run(&["-"], &t, ScanConfig::strict());
        result.unwrap();
        assert_eq!(left, tokens(&["-"]));
    }

    #[test]
    fn failed_handler_returns_switch_and_value() {
        let t = table(&[("a", Arity::Value), ("o", Arity::Value)]);
        for (list, expected) in [
            (&["--a", "bad", "rest"][..], &["--a", "bad", "rest"][..]),
            (&["--a=bad", "rest"][..], &["--a=bad", "rest"][..]),
            (&["-o", "bad", "rest"][..], &["-o", "bad", "rest"][..]),
            (&["-obad", "rest"][..], &["-obad", "rest"][..]),
        ] {
            let mut toks = tokens(list);
            let result = GetoptScanner.scan(&mut toks, &t, ScanConfig::strict(), &mut |_, _| {
                Err(GetArgsError::Hook {
                    switch: "a".into(),
                    message: "refused".into(),
                })
            });
            assert!(matches!(result, Err(ScanError::Handler(_))));
            assert_eq!(toks, tokens(expected));
        }
    }

    #[test]
    fn lenient_scan_continues_after_a_failure() {
        let t = table(&[("name", Arity::Value), ("v", Arity::Flag)]);
        let (left, seen, result) = run(
            &["--v=1", "--name", "x", "op"],
            &t,
            ScanConfig::lenient(),
        );
        assert!(matches!(result, Err(ScanError::UnexpectedValue(ref s)) if s == "--v"));
        assert_eq!(left, tokens(&["--v=1", "op"]));
        assert_eq!(seen, vec![("name".into(), Some("x".into()))]);
    }

    #[test]
    fn fatal_handler_failure_stops_lenient_scan() {
        let t = table(&[("a", Arity::Value), ("v", Arity::Flag)]);
        let mut toks = tokens(&["--a", "[1,2", "--v", "op"]);
        let mut seen = Vec::new();
        let result = GetoptScanner.scan(&mut toks, &t, ScanConfig::lenient(), &mut |b, v| {
            if b.name == "a" {
                decode_value("a", v.unwrap_or_default(), &[Grammar::Json])?;
            }
            seen.push(b.name.clone());
            Ok(())
        });
        assert!(matches!(
            result,
            Err(ScanError::Handler(ref e)) if e.kind() == ErrorKind::ValueDecodeError
        ));
        assert_eq!(toks, tokens(&["--a", "[1,2", "--v", "op"]));
        assert!(seen.is_empty());
    }

    #[test]
    fn strict_failure_inside_bundle_keeps_the_rest() {
        let t = table(&[("v", Arity::Flag), ("q", Arity::Flag)]);
        let (left, seen, result) = run(&["-vzq", "x"], &t, ScanConfig::strict());
        assert!(matches!(result, Err(ScanError::UnknownSwitch(ref s)) if s == "-z"));
        assert_eq!(left, tokens(&["-zq", "x"]));
        assert_eq!(seen.len(), 1);
    }
}
