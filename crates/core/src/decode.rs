//! Structured-literal decoding of switch values.
//!
//! A raw switch value for a structured argument is tried as JSON first, then
//! as YAML (which also accepts bare words as implicitly typed scalars). The
//! `-json`/`-yaml` suffix switches pin a single grammar.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::GetArgsError;

/// A structured-literal grammar.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// JSON literal syntax.
    Json,
    /// YAML literal syntax (scalars, flow and block collections).
    Yaml,
}

/// Fallback order used when no single grammar was requested.
pub const FALLBACK_ORDER: &[Grammar] = &[Grammar::Json, Grammar::Yaml];

impl Grammar {
    /// Switch suffix for this grammar (`"json"` / `"yaml"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Grammar::Json => "json",
            Grammar::Yaml => "yaml",
        }
    }

    /// Parse `text` with this grammar.
    pub fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            Grammar::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Grammar::Yaml => serde_yaml::from_str::<serde_yaml::Value>(text)
                .map(yaml_to_json)
                .map_err(|e| e.to_string()),
        }
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grammar::Json => write!(f, "JSON"),
            Grammar::Yaml => write!(f, "YAML"),
        }
    }
}

/// Decode `raw` for argument `arg`, trying `grammars` in order.
///
/// The first grammar that parses wins. When every grammar fails, the error
/// carries the diagnostic of the last one tried.
pub fn decode_value(arg: &str, raw: &str, grammars: &[Grammar]) -> Result<Value, GetArgsError> {
    let mut last_err = String::from("no grammar to try");
    for grammar in grammars {
        match grammar.parse(raw) {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::trace!(arg, grammar = %grammar, error = %e, "decode attempt failed");
                last_err = e;
            }
        }
    }
    Err(GetArgsError::ValueDecode {
        arg: arg.to_string(),
        raw: raw.to_string(),
        grammars: grammars
            .iter()
            .map(Grammar::to_string)
            .collect::<Vec<_>>()
            .join(" or "),
        diagnostic: last_err,
    })
}

/// Decode with the default JSON-then-YAML fallback.
pub fn decode_structured(arg: &str, raw: &str) -> Result<Value, GetArgsError> {
    decode_value(arg, raw, FALLBACK_ORDER)
}

// YAML permits non-string mapping keys, tags and non-finite floats, none of
// which have a JSON counterpart. Keys are rendered to their YAML text, tags
// are dropped, non-finite floats become strings.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f).map_or_else(|| Value::String(n.to_string()), Value::Number)
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Y::Mapping(mapping) => {
            let mut out = Map::new();
            for (k, v) in mapping {
                out.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => match yaml_to_json(other) {
            Value::String(s) => s,
            Value::Null => "~".to_string(),
            v => v.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_wins_when_it_parses() {
        assert_eq!(decode_structured("a", "[1,2,3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(decode_structured("a", r#"{"k": "v"}"#).unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn yaml_is_the_fallback() {
        assert_eq!(decode_structured("a", "[a, b]").unwrap(), json!(["a", "b"]));
        assert_eq!(decode_structured("a", "{k: 1}").unwrap(), json!({"k": 1}));
        assert_eq!(decode_structured("a", "hello").unwrap(), json!("hello"));
        assert_eq!(decode_structured("a", "~").unwrap(), Value::Null);
    }

    #[test]
    fn yaml_non_string_keys_are_stringified() {
        assert_eq!(decode_structured("a", "{1: one, true: yes}").unwrap(), json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn malformed_text_names_argument_and_raw() {
        let err = decode_structured("a", "[1,2").unwrap_err();
        match err {
            GetArgsError::ValueDecode {
                arg, raw, grammars, ..
            } => {
                assert_eq!(arg, "a");
                assert_eq!(raw, "[1,2");
                assert_eq!(grammars, "JSON or YAML");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn single_grammar_does_not_fall_back() {
        assert!(decode_value("a", "[a, b]", &[Grammar::Json]).is_err());
        assert_eq!(
            decode_value("a", "[a, b]", &[Grammar::Yaml]).unwrap(),
            json!(["a", "b"])
        );
    }
}
