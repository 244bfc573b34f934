//! Positional extraction and reconciliation with switch-supplied values.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use switchboard_schema::{ArgumentSpec, TypeClass, ValueMapping};
use tracing::debug;

use crate::compile::switch_name;
use crate::decode::decode_structured;
use crate::error::GetArgsError;

/// A value the extractor assigned to an argument by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Canonical argument name.
    pub arg: String,
    /// The argument's declared position.
    pub pos: usize,
    /// The assigned value.
    pub value: Value,
    /// Indices (into the token list given to the extractor) the value came from.
    pub consumed: Vec<usize>,
}

/// Assigns leftover tokens to positional arguments.
///
/// An extractor only proposes assignments; it never mutates the token list.
/// Removal of consumed tokens happens during reconciliation, so tokens of
/// rejected assignments stay with the caller.
pub trait PositionalExtractor {
    /// Propose assignments for `tokens`.
    ///
    /// `allow_extra` tolerates tokens beyond the last positional argument.
    fn extract(
        &self,
        tokens: &[String],
        specs: &[ArgumentSpec],
        allow_extra: bool,
    ) -> Result<Vec<Assignment>, GetArgsError>;
}

/// Default extractor: `tokens[pos]` for each positional argument,
/// `tokens[pos..]` for a greedy one.
///
/// Scalar values stay strings. Structured arguments are decoded (JSON, then
/// YAML); a greedy argument with structured elements decodes each element.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayExtractor;

impl PositionalExtractor for ArrayExtractor {
    fn extract(
        &self,
        tokens: &[String],
        specs: &[ArgumentSpec],
        allow_extra: bool,
    ) -> Result<Vec<Assignment>, GetArgsError> {
        let mut positional: Vec<(usize, &ArgumentSpec)> = specs
            .iter()
            .filter_map(|s| s.pos.map(|pos| (pos, s)))
            .collect();
        positional.sort_by_key(|(pos, _)| *pos);

        let mut assignments = Vec::new();
        for (pos, spec) in positional {
            if spec.greedy {
                if pos >= tokens.len() {
                    continue;
                }
                let items = tokens[pos..]
                    .iter()
                    .map(|t| greedy_element(spec, t))
                    .collect::<Result<Vec<_>, _>>()?;
                assignments.push(Assignment {
                    arg: spec.name.clone(),
                    pos,
                    value: Value::Array(items),
                    consumed: (pos..tokens.len()).collect(),
                });
                continue;
            }
            let Some(token) = tokens.get(pos) else {
                continue;
            };
            assignments.push(Assignment {
                arg: spec.name.clone(),
                pos,
                value: single_value(spec, token)?,
                consumed: vec![pos],
            });
        }

        if !allow_extra {
            let claimed: BTreeSet<usize> = assignments
                .iter()
                .flat_map(|a| a.consumed.iter().copied())
                .collect();
            let extra: Vec<&str> = tokens
                .iter()
                .enumerate()
                .filter(|(idx, _)| !claimed.contains(idx))
                .map(|(_, token)| token.as_str())
                .collect();
            if !extra.is_empty() {
                return Err(GetArgsError::parse(
                    format!("there are extra, unassigned elements in array: {extra:?}"),
                    None,
                ));
            }
        }
        Ok(assignments)
    }
}

fn single_value(spec: &ArgumentSpec, token: &str) -> Result<Value, GetArgsError> {
    match spec.class() {
        TypeClass::Bool | TypeClass::Scalar => Ok(Value::String(token.to_string())),
        TypeClass::ArrayOfScalar => Ok(Value::Array(vec![Value::String(token.to_string())])),
        TypeClass::ArrayOfOther | TypeClass::Other => decode_structured(&spec.name, token),
    }
}

fn greedy_element(spec: &ArgumentSpec, token: &str) -> Result<Value, GetArgsError> {
    match spec.ty.element_class() {
        Some(class) if class.is_structured() => decode_structured(&spec.name, token),
        _ => Ok(Value::String(token.to_string())),
    }
}

/// Run the extractor over `tokens` and merge its assignments into `values`.
///
/// Skipped entirely when no tokens are left. A name already present (set by
/// a switch) is a conflict: an error in strict mode, silently kept as the
/// switch left it in lenient mode. Tokens of accepted assignments are
/// removed from `tokens`.
pub(crate) fn reconcile(
    tokens: &mut Vec<String>,
    specs: &[ArgumentSpec],
    extractor: &dyn PositionalExtractor,
    allow_extra: bool,
    strict: bool,
    values: &mut ValueMapping,
    sources: &BTreeMap<String, String>,
) -> Result<(), GetArgsError> {
    if tokens.is_empty() {
        return Ok(());
    }

    let assignments = match extractor.extract(tokens, specs, allow_extra) {
        Ok(assignments) => assignments,
        Err(e) if strict || e.kind().is_fatal_when_lenient() => return Err(e),
        Err(e) => {
            debug!(error = %e, "ignoring positional extraction failure in lenient mode");
            return Ok(());
        }
    };

    let mut attributed = BTreeSet::new();
    for assignment in assignments {
        if values.contains(&assignment.arg) {
            if strict {
                let switch = sources
                    .get(&assignment.arg)
                    .cloned()
                    .unwrap_or_else(|| switch_name(&assignment.arg));
                return Err(GetArgsError::ArgumentConflict {
                    arg: assignment.arg,
                    switch,
                    pos: assignment.pos,
                });
            }
            debug!(arg = %assignment.arg, pos = assignment.pos, "switch value wins over positional");
            continue;
        }
        debug!(arg = %assignment.arg, pos = assignment.pos, "positional assignment");
        attributed.extend(assignment.consumed.iter().copied());
        values.insert(assignment.arg, assignment.value);
    }

    let mut index = 0usize;
    tokens.retain(|_| {
        let keep = !attributed.contains(&index);
        index += 1;
        keep
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchboard_schema::{ArgMeta, FunctionMeta, NormalizeOptions, TypeDecl, normalize_meta};

    fn specs(meta: FunctionMeta) -> Vec<ArgumentSpec> {
        normalize_meta(&meta, NormalizeOptions::default()).unwrap()
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn assigns_by_position() {
        let specs = specs(
            FunctionMeta::new()
                .with_arg("a", ArgMeta::of_type("int").at(0))
                .with_arg("b", ArgMeta::of_type("int").at(1)),
        );
        let got = ArrayExtractor.extract(&tokens(&["5", "6"]), &specs, false).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].value, json!("5"));
        assert_eq!(got[1].consumed, vec![1]);
    }

    #[test]
    fn greedy_takes_the_rest() {
        let specs = specs(
            FunctionMeta::new()
                .with_arg("cmd", ArgMeta::of_type("str").at(0))
                .with_arg("files", ArgMeta::of_type(TypeDecl::array_of("str")).at(1).greedy()),
        );
        let got = ArrayExtractor
            .extract(&tokens(&["cp", "x", "y", "z"]), &specs, false)
            .unwrap();
        assert_eq!(got[1].value, json!(["x", "y", "z"]));
        assert_eq!(got[1].consumed, vec![1, 2, 3]);
    }

    #[test]
    fn greedy_structured_elements_are_decoded() {
        let specs = specs(FunctionMeta::new().with_arg(
            "rows",
            ArgMeta::of_type(TypeDecl::array_of("hash")).at(0).greedy(),
        ));
        let got = ArrayExtractor
            .extract(&tokens(&["{a: 1}", r#"{"b": 2}"#]), &specs, false)
            .unwrap();
        assert_eq!(got[0].value, json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn extra_tokens_fail_unless_allowed() {
        let specs = specs(FunctionMeta::new().with_arg("a", ArgMeta::of_type("str").at(0)));
        let err = ArrayExtractor
            .extract(&tokens(&["1", "2"]), &specs, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ParseError);
        assert!(ArrayExtractor.extract(&tokens(&["1", "2"]), &specs, true).is_ok());
    }

    #[test]
    fn token_in_a_position_gap_is_extra() {
        let specs = specs(
            FunctionMeta::new()
                .with_arg("a", ArgMeta::of_type("str").at(0))
                .with_arg("c", ArgMeta::of_type("str").at(2)),
        );
        let err = ArrayExtractor
            .extract(&tokens(&["x", "y", "z"]), &specs, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ParseError);
        assert!(err.to_string().contains(r#"["y"]"#), "{err}");

        let got = ArrayExtractor
            .extract(&tokens(&["x", "y", "z"]), &specs, true)
            .unwrap();
        let claimed: Vec<usize> = got.iter().flat_map(|a| a.consumed.clone()).collect();
        assert_eq!(claimed, vec![0, 2]);
    }

    #[test]
    fn reconcile_removes_only_accepted_tokens() {
        let specs = specs(
            FunctionMeta::new()
                .with_arg("a", ArgMeta::of_type("str").at(0))
                .with_arg("b", ArgMeta::of_type("str").at(1)),
        );
        let mut values = ValueMapping::new();
        values.insert("a", json!("from-switch"));
        let mut toks = tokens(&["x", "y"]);
        reconcile(
            &mut toks,
            &specs,
            &ArrayExtractor,
            false,
            false,
            &mut values,
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(values.to_json(), json!({"a": "from-switch", "b": "y"}));
        assert_eq!(toks, tokens(&["x"]));
    }

    #[test]
    fn reconcile_conflict_when_strict() {
        let specs = specs(FunctionMeta::new().with_arg("my_arg", ArgMeta::of_type("str").at(0)));
        let mut values = ValueMapping::new();
        values.insert("my_arg", json!("1"));
        let err = reconcile(
            &mut tokens(&["2"]),
            &specs,
            &ArrayExtractor,
            false,
            true,
            &mut values,
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert_eq!(err.switch(), Some("my-arg"));
        assert_eq!(err.arg(), Some("my_arg"));
    }
}
