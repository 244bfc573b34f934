//! Switch dispatch: runs the scanner over the token list and applies the
//! bound handlers to the value mapping.

use std::collections::BTreeMap;

use serde_json::Value;
use switchboard_schema::ValueMapping;
use tracing::{debug, trace};

use crate::compile::{SwitchBinding, SwitchHandler, SwitchTable};
use crate::decode::decode_value;
use crate::error::GetArgsError;
use crate::scanner::{ScanConfig, ScanError, Scanner};

/// One handled switch occurrence, as reported to a switch observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEvent<'a> {
    /// Switch name without dashes.
    pub switch: &'a str,
    /// Canonical argument targeted, if any.
    pub arg: Option<&'a str>,
    /// Raw value for value-taking switches.
    pub value: Option<&'a str>,
}

/// Observer invoked after every handled switch occurrence.
pub type SwitchObserver<'a> = dyn FnMut(&SwitchEvent<'_>, &ValueMapping) + 'a;

/// Build the table handed to the scanner.
///
/// Order is `pre`, then `compiled`, then `post`; a later definition of a name
/// replaces an earlier one, so `pre` switches never override argument
/// switches while `post` switches do.
pub fn assemble_table(
    pre: &[SwitchBinding],
    compiled: &SwitchTable,
    post: &[SwitchBinding],
) -> SwitchTable {
    let mut table = SwitchTable::new();
    table.extend(pre.iter().cloned());
    table.extend(compiled.iter().cloned());
    table.extend(post.iter().cloned());
    table
}

/// Apply one switch occurrence to the value mapping.
pub fn apply_switch(
    binding: &SwitchBinding,
    raw: Option<&str>,
    values: &mut ValueMapping,
) -> Result<(), GetArgsError> {
    match &binding.handler {
        SwitchHandler::Assign { arg } => {
            values.insert(arg.clone(), Value::String(raw.unwrap_or_default().to_string()));
        }
        SwitchHandler::Append { arg } => values.append(arg, raw.unwrap_or_default()),
        SwitchHandler::SetBool { arg, value } => {
            values.insert(arg.clone(), Value::Bool(*value));
        }
        SwitchHandler::DecodeAndAssign { arg, grammars } => {
            let decoded = decode_value(arg, raw.unwrap_or_default(), grammars)?;
            values.insert(arg.clone(), decoded);
        }
        SwitchHandler::InvokeHook {
            callback,
            flag_value,
            ..
        } => {
            let value = match raw {
                Some(s) => Value::String(s.to_string()),
                None => Value::Bool(*flag_value),
            };
            callback
                .call(values, &value)
                .map_err(|message| GetArgsError::Hook {
                    switch: binding.name.clone(),
                    message,
                })?;
        }
    }
    Ok(())
}

/// Scan `tokens` with `table`, filling `values`.
///
/// `sources` records, per canonical argument, the last switch that supplied
/// it. In lenient mode the scan runs past failed switches, leaving their
/// tokens in the list and the rest of the mapping filled; decode failures
/// are fatal in both modes.
pub(crate) fn dispatch(
    tokens: &mut Vec<String>,
    table: &SwitchTable,
    strict: bool,
    scanner: &dyn Scanner,
    values: &mut ValueMapping,
    sources: &mut BTreeMap<String, String>,
    mut observer: Option<&mut SwitchObserver<'_>>,
) -> Result<(), GetArgsError> {
    let config = if strict {
        ScanConfig::strict()
    } else {
        ScanConfig::lenient()
    };
    let before = tokens.len();
    let result = scanner.scan(tokens, table, config, &mut |binding, raw| {
        trace!(switch = %binding.name, value = ?raw, "switch");
        apply_switch(binding, raw, values)?;
        if let Some(arg) = binding.handler.arg() {
            sources.insert(arg.to_string(), binding.name.clone());
        }
        if let Some(observe) = observer.as_deref_mut() {
            let event = SwitchEvent {
                switch: &binding.name,
                arg: binding.handler.arg(),
                value: raw,
            };
            observe(&event, values);
        }
        Ok(())
    });
    debug!(
        consumed = before.saturating_sub(tokens.len()),
        left = tokens.len(),
        "switch scan finished"
    );

    match result {
        Ok(()) => Ok(()),
        Err(ScanError::Handler(e)) if strict || e.kind().is_fatal_when_lenient() => Err(e),
        Err(e) if strict => Err(GetArgsError::parse(e.to_string(), e.switch())),
        Err(e) => {
            debug!(error = %e, "ignoring scan failure in lenient mode");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Arity;
    use crate::scanner::GetoptScanner;
    use serde_json::json;
    use switchboard_schema::SwitchCallback;

    fn binding(name: &str, arity: Arity, handler: SwitchHandler) -> SwitchBinding {
        SwitchBinding {
            name: name.to_string(),
            arity,
            handler,
        }
    }

    #[test]
    fn later_sections_override_earlier_ones() {
        let mut compiled = SwitchTable::new();
        compiled.insert(binding("x", Arity::Value, SwitchHandler::Assign { arg: "x".into() }));
        compiled.insert(binding("y", Arity::Value, SwitchHandler::Assign { arg: "y".into() }));
        let noop = SwitchCallback::new(|_, _| Ok(()));
        let pre = vec![SwitchBinding::custom("x", Arity::Flag, noop.clone())];
        let post = vec![SwitchBinding::custom("y", Arity::Flag, noop)];

        let table = assemble_table(&pre, &compiled, &post);
        assert_eq!(table.get("x").unwrap().handler.action(), "assign");
        assert_eq!(table.get("y").unwrap().handler.action(), "hook");
    }

    #[test]
    fn hook_receives_flag_value_and_errors_name_switch() {
        let cb = SwitchCallback::new(|values, v| {
            if v == &json!(false) {
                return Err("refused".into());
            }
            values.insert("seen", v.clone());
            Ok(())
        });
        let on = binding(
            "on",
            Arity::Flag,
            SwitchHandler::InvokeHook {
                arg: None,
                callback: cb.clone(),
                flag_value: true,
            },
        );
        let off = binding(
            "off",
            Arity::Flag,
            SwitchHandler::InvokeHook {
                arg: None,
                callback: cb,
                flag_value: false,
            },
        );
        let mut values = ValueMapping::new();
        apply_switch(&on, None, &mut values).unwrap();
        assert_eq!(values.get("seen"), Some(&json!(true)));
        let err = apply_switch(&off, None, &mut values).unwrap_err();
        assert_eq!(err.switch(), Some("off"));
    }

    #[test]
    fn lenient_scan_failure_keeps_partial_values() {
        let mut table = SwitchTable::new();
        table.insert(binding("a", Arity::Value, SwitchHandler::Assign { arg: "a".into() }));
        table.insert(binding("b", Arity::Value, SwitchHandler::Assign { arg: "b".into() }));
        let mut tokens: Vec<String> = ["--a", "1", "--b"].iter().map(|s| s.to_string()).collect();
        let mut values = ValueMapping::new();
        let mut sources = BTreeMap::new();
        dispatch(
            &mut tokens,
            &table,
            false,
            &GetoptScanner,
            &mut values,
            &mut sources,
            None,
        )
        .unwrap();
        assert_eq!(values.to_json(), json!({"a": "1"}));
        assert_eq!(tokens, vec!["--b".to_string()]);
        assert_eq!(sources.get("a").map(String::as_str), Some("a"));
    }

    #[test]
    fn lenient_scan_applies_switches_after_a_failure() {
        let mut table = SwitchTable::new();
        table.insert(binding("a", Arity::Value, SwitchHandler::Assign { arg: "a".into() }));
        table.insert(binding("f", Arity::Flag, SwitchHandler::SetBool { arg: "f".into(), value: true }));
        let mut tokens: Vec<String> = ["--f=1", "--a", "2"].iter().map(|s| s.to_string()).collect();
        let mut values = ValueMapping::new();
        dispatch(
            &mut tokens,
            &table,
            false,
            &GetoptScanner,
            &mut values,
            &mut BTreeMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(values.to_json(), json!({"a": "2"}));
        assert_eq!(tokens, vec!["--f=1".to_string()]);
    }

    #[test]
    fn strict_scan_failure_is_parse_error() {
        let table = SwitchTable::new();
        let mut tokens = vec!["--zzz".to_string()];
        let err = dispatch(
            &mut tokens,
            &table,
            true,
            &GetoptScanner,
            &mut ValueMapping::new(),
            &mut BTreeMap::new(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ParseError);
        assert_eq!(err.switch(), Some("--zzz"));
    }
}
