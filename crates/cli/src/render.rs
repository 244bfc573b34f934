//! Output rendering for the `switchboard` binary.
//!
//! JSON envelopes for scripts and pipes, aligned plain text for terminals.

use std::io::{self, IsTerminal};

use serde::Serialize;
use serde_json::Value;
use switchboard_core::{Arity, GetArgsError, SwitchInfo, ValueMapping};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Human-readable text.
    Pretty,
    /// Machine-readable JSON envelopes.
    Json,
}

impl Format {
    /// Use the explicit choice, else pretty for terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Envelopes ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Success<'a> {
    success: bool,
    args: &'a ValueMapping,
    leftover: &'a [String],
}

#[derive(Serialize)]
struct Failure<'a> {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    arg: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    switch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    leftover: Option<&'a [String]>,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: failed to serialize output: {e}"),
    }
}

/// Print the extracted values and the unclaimed tokens.
pub(crate) fn print_values(format: Format, values: &ValueMapping, leftover: &[String]) {
    match format {
        Format::Json => print_json(&Success {
            success: true,
            args: values,
            leftover,
        }),
        Format::Pretty => {
            for (name, value) in values.iter() {
                println!("{name} = {}", display_value(value));
            }
            if !leftover.is_empty() {
                eprintln!("leftover: {}", leftover.join(" "));
            }
        }
    }
}

/// Print an extraction failure.
pub(crate) fn print_extraction_failure(format: Format, err: &GetArgsError, leftover: &[String]) {
    match format {
        Format::Json => print_json(&Failure {
            success: false,
            error: err.kind().to_string(),
            message: err.to_string(),
            arg: err.arg(),
            switch: err.switch(),
            leftover: Some(leftover),
        }),
        Format::Pretty => eprintln!("error[{}]: {err}", err.kind()),
    }
}

/// Print a failure that happened before extraction could start.
pub(crate) fn print_command_failure(format: Format, err: &anyhow::Error) {
    match format {
        Format::Json => print_json(&Failure {
            success: false,
            error: "command_failed".to_string(),
            message: format!("{err:#}"),
            arg: None,
            switch: None,
            leftover: None,
        }),
        Format::Pretty => eprintln!("error: {err:#}"),
    }
}

/// Print a compiled switch table.
pub(crate) fn print_switches(format: Format, switches: &[SwitchInfo]) {
    match format {
        Format::Json => print_json(&serde_json::json!({ "switches": switches })),
        Format::Pretty => {
            let rendered: Vec<String> = switches.iter().map(switch_usage).collect();
            let width = rendered.iter().map(String::len).max().unwrap_or(0);
            for (usage, info) in rendered.iter().zip(switches) {
                let target = info.arg.as_deref().unwrap_or("-");
                println!("{usage:<width$}  {:<10} {target}", info.action);
            }
        }
    }
}

fn switch_usage(info: &SwitchInfo) -> String {
    let dashes = if info.switch.chars().count() == 1 { "-" } else { "--" };
    match info.arity {
        Arity::Flag => format!("{dashes}{}", info.switch),
        Arity::Value => format!("{dashes}{} <value>", info.switch),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(empty)".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_uses_single_dash_for_one_letter_switches() {
        let info = SwitchInfo {
            switch: "v".into(),
            arity: Arity::Flag,
            arg: Some("verbose".into()),
            action: "set-true",
        };
        assert_eq!(switch_usage(&info), "-v");
        let info = SwitchInfo {
            switch: "name".into(),
            arity: Arity::Value,
            arg: None,
            action: "hook",
        };
        assert_eq!(switch_usage(&info), "--name <value>");
    }

    #[test]
    fn explicit_format_wins() {
        assert_eq!(Format::resolve_or_detect(Some("json")), Format::Json);
        assert_eq!(Format::resolve_or_detect(Some("pretty")), Format::Pretty);
    }
}
