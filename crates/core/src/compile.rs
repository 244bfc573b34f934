//! Switch compilation: argument specs → switch table.
//!
//! Every argument yields a primary switch (canonical name with `_` and `.`
//! replaced by `-`), an optional negated form for booleans, optional
//! `-json`/`-yaml` suffix switches, and one switch per alias. Each switch is
//! bound to a [`SwitchHandler`] chosen here, once, from the argument's type
//! class.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use switchboard_schema::{ArgumentSpec, SwitchCallback, TypeClass};
use tracing::debug;

use crate::decode::{FALLBACK_ORDER, Grammar};

/// Whether a switch takes a value.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    /// No value (`--name`).
    Flag,
    /// Exactly one value (`--name value` / `--name=value`).
    Value,
}

/// What happens when a switch is seen.
///
/// A handler only touches the value mapping when its switch actually occurs,
/// so arguments whose switches never appear stay absent.
#[derive(Debug, Clone)]
pub enum SwitchHandler {
    /// Store the raw string under `arg`.
    Assign {
        /// Canonical argument name.
        arg: String,
    },
    /// Append the raw string to the sequence under `arg`.
    Append {
        /// Canonical argument name.
        arg: String,
    },
    /// Store a boolean under `arg`.
    SetBool {
        /// Canonical argument name.
        arg: String,
        /// The value stored.
        value: bool,
    },
    /// Decode the raw string with `grammars` (in order) and store it.
    DecodeAndAssign {
        /// Canonical argument name.
        arg: String,
        /// Grammars to try.
        grammars: Vec<Grammar>,
    },
    /// Call a side-effecting callback with the whole value mapping.
    InvokeHook {
        /// The argument the switch belongs to, if any.
        arg: Option<String>,
        /// The callback.
        callback: SwitchCallback,
        /// Value passed to the callback for flag switches.
        flag_value: bool,
    },
}

impl SwitchHandler {
    /// The canonical argument this handler targets, if any.
    pub fn arg(&self) -> Option<&str> {
        match self {
            SwitchHandler::Assign { arg }
            | SwitchHandler::Append { arg }
            | SwitchHandler::SetBool { arg, .. }
            | SwitchHandler::DecodeAndAssign { arg, .. } => Some(arg.as_str()),
            SwitchHandler::InvokeHook { arg, .. } => arg.as_deref(),
        }
    }

    /// Short action label, used when describing a table.
    pub fn action(&self) -> &'static str {
        match self {
            SwitchHandler::Assign { .. } => "assign",
            SwitchHandler::Append { .. } => "append",
            SwitchHandler::SetBool { value: true, .. } => "set-true",
            SwitchHandler::SetBool { value: false, .. } => "set-false",
            SwitchHandler::DecodeAndAssign { grammars, .. } => match grammars.as_slice() {
                [Grammar::Json] => "decode-json",
                [Grammar::Yaml] => "decode-yaml",
                _ => "decode",
            },
            SwitchHandler::InvokeHook { .. } => "hook",
        }
    }
}

/// A switch name bound to an arity and a handler.
#[derive(Debug, Clone)]
pub struct SwitchBinding {
    /// Switch name without leading dashes.
    pub name: String,
    /// Whether the switch takes a value.
    pub arity: Arity,
    /// What to do when the switch is seen.
    pub handler: SwitchHandler,
}

impl SwitchBinding {
    /// A caller-defined switch that runs `callback` when seen.
    pub fn custom(name: impl Into<String>, arity: Arity, callback: SwitchCallback) -> Self {
        Self {
            name: name.into(),
            arity,
            handler: SwitchHandler::InvokeHook {
                arg: None,
                callback,
                flag_value: true,
            },
        }
    }
}

/// Description of one switch, for inspection and display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SwitchInfo {
    /// Switch name without leading dashes.
    pub switch: String,
    /// Whether the switch takes a value.
    pub arity: Arity,
    /// Canonical argument targeted, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Handler action label.
    pub action: &'static str,
}

/// Switch name → binding. A later insert for the same name replaces the
/// earlier one.
#[derive(Debug, Clone, Default)]
pub struct SwitchTable {
    bindings: BTreeMap<String, SwitchBinding>,
}

impl SwitchTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, returning the one it replaced.
    pub fn insert(&mut self, binding: SwitchBinding) -> Option<SwitchBinding> {
        self.bindings.insert(binding.name.clone(), binding)
    }

    /// Insert every binding of `other`, replacing same-named ones.
    pub fn extend<I: IntoIterator<Item = SwitchBinding>>(&mut self, other: I) {
        for binding in other {
            self.insert(binding);
        }
    }

    /// Look up a switch by name.
    pub fn get(&self, name: &str) -> Option<&SwitchBinding> {
        self.bindings.get(name)
    }

    /// Whether a switch with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of switches.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table has no switches.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Switch names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SwitchBinding> {
        self.bindings.values()
    }

    /// Describe every switch.
    pub fn describe(&self) -> Vec<SwitchInfo> {
        self.iter()
            .map(|b| SwitchInfo {
                switch: b.name.clone(),
                arity: b.arity,
                arg: b.handler.arg().map(str::to_string),
                action: b.handler.action(),
            })
            .collect()
    }
}

impl IntoIterator for SwitchTable {
    type Item = SwitchBinding;
    type IntoIter = std::collections::btree_map::IntoValues<String, SwitchBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_values()
    }
}

/// Output of [`compile_switches`].
#[derive(Debug, Clone, Default)]
pub struct CompiledSwitches {
    /// Switches derived from the argument specs.
    pub table: SwitchTable,
    /// Common switches that had to be renamed (original → new name).
    pub common_renames: BTreeMap<String, String>,
}

/// Convert a canonical argument name into switch spelling.
pub fn switch_name(name: &str) -> String {
    name.replace(['_', '.'], "-")
}

/// The negated form of a boolean switch.
///
/// `with-x` pairs with `without-x` and vice versa; anything else gets `no-`.
pub fn negated_name(switch: &str) -> String {
    if let Some(rest) = switch.strip_prefix("without-") {
        format!("with-{rest}")
    } else if let Some(rest) = switch.strip_prefix("with-") {
        format!("without-{rest}")
    } else {
        format!("no-{switch}")
    }
}

/// Compile argument specs into a switch table.
///
/// `common` holds the names of caller-injected common switches. An argument
/// switch colliding with one is renamed `<name>-arg` (`-arg2`, ... until
/// free); a boolean's negated form colliding with one keeps its name and the
/// common switch is renamed `<name>-opt` instead, reported in
/// [`CompiledSwitches::common_renames`].
pub fn compile_switches(specs: &[ArgumentSpec], common: &BTreeSet<String>) -> CompiledSwitches {
    let mut compiler = Compiler {
        table: SwitchTable::new(),
        reserved: common.clone(),
        planned: planned_names(specs),
        renames: BTreeMap::new(),
    };
    let mut ordered: Vec<&ArgumentSpec> = specs.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    for spec in ordered {
        compiler.compile_arg(spec);
    }
    debug!(
        switches = compiler.table.len(),
        renamed_common = compiler.renames.len(),
        "compiled switch table"
    );
    CompiledSwitches {
        table: compiler.table,
        common_renames: compiler.renames,
    }
}

enum Target<'a> {
    Arg(&'a str),
    Hook {
        arg: &'a str,
        callback: &'a SwitchCallback,
    },
}

struct Compiler {
    table: SwitchTable,
    reserved: BTreeSet<String>,
    /// Names every argument asks for before any renaming.
    planned: BTreeSet<String>,
    renames: BTreeMap<String, String>,
}

/// Primary, suffix and alias switch names of all arguments, so a renamed
/// switch never lands on a name a later argument compiles to.
fn planned_names(specs: &[ArgumentSpec]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for spec in specs {
        let primary = switch_name(&spec.name);
        if spec.class() != TypeClass::Bool {
            for (enabled, grammar) in [
                (spec.per_arg_json, Grammar::Json),
                (spec.per_arg_yaml, Grammar::Yaml),
            ] {
                if enabled {
                    names.insert(format!("{primary}-{}", grammar.suffix()));
                }
            }
        }
        names.insert(primary);
        names.extend(spec.aliases.iter().map(|alias| switch_name(&alias.name)));
    }
    names
}

impl Compiler {
    fn compile_arg(&mut self, spec: &ArgumentSpec) {
        let primary = self.claim(switch_name(&spec.name));
        self.bind(
            primary.clone(),
            spec.class(),
            spec.is_flag,
            Target::Arg(&spec.name),
        );

        if spec.class() != TypeClass::Bool {
            for (enabled, grammar) in [
                (spec.per_arg_json, Grammar::Json),
                (spec.per_arg_yaml, Grammar::Yaml),
            ] {
                if !enabled {
                    continue;
                }
                let name = self.claim(format!("{primary}-{}", grammar.suffix()));
                self.table.insert(SwitchBinding {
                    name,
                    arity: Arity::Value,
                    handler: SwitchHandler::DecodeAndAssign {
                        arg: spec.name.clone(),
                        grammars: vec![grammar],
                    },
                });
            }
        }

        for alias in &spec.aliases {
            let class = alias.effective_type(&spec.ty).class;
            let is_flag = if alias.ty.is_some() {
                alias.is_flag
            } else {
                alias.is_flag || spec.is_flag
            };
            let name = self.claim(switch_name(&alias.name));
            let target = match &alias.handler {
                Some(callback) => Target::Hook {
                    arg: &spec.name,
                    callback,
                },
                None => Target::Arg(&spec.name),
            };
            self.bind(name, class, is_flag, target);
        }
    }

    fn bind(&mut self, switch: String, class: TypeClass, is_flag: bool, target: Target<'_>) {
        if class == TypeClass::Bool {
            let negatable = !is_flag && switch.chars().count() > 1;
            let negated = negatable.then(|| self.claim_negated(&switch));
            self.table.insert(SwitchBinding {
                name: switch,
                arity: Arity::Flag,
                handler: bool_handler(&target, true),
            });
            if let Some(name) = negated {
                self.table.insert(SwitchBinding {
                    name,
                    arity: Arity::Flag,
                    handler: bool_handler(&target, false),
                });
            }
            return;
        }

        let handler = match target {
            Target::Hook { arg, callback } => SwitchHandler::InvokeHook {
                arg: Some(arg.to_string()),
                callback: callback.clone(),
                flag_value: true,
            },
            Target::Arg(arg) => match class {
                TypeClass::ArrayOfScalar => SwitchHandler::Append {
                    arg: arg.to_string(),
                },
                TypeClass::Scalar | TypeClass::Bool => SwitchHandler::Assign {
                    arg: arg.to_string(),
                },
                TypeClass::ArrayOfOther | TypeClass::Other => SwitchHandler::DecodeAndAssign {
                    arg: arg.to_string(),
                    grammars: FALLBACK_ORDER.to_vec(),
                },
            },
        };
        self.table.insert(SwitchBinding {
            name: switch,
            arity: Arity::Value,
            handler,
        });
    }

    /// Resolve an argument switch name against the reserved common names.
    fn claim(&self, name: String) -> String {
        if !self.reserved.contains(&name) {
            return name;
        }
        let renamed = self.free_name(&name, "arg");
        debug!(switch = %name, renamed = %renamed, "argument switch collides with common switch");
        renamed
    }

    /// Resolve a negated name, renaming a colliding common switch instead.
    fn claim_negated(&mut self, positive: &str) -> String {
        let negated = negated_name(positive);
        if self.reserved.remove(&negated) {
            let renamed = self.free_name(&negated, "opt");
            debug!(switch = %negated, renamed = %renamed, "common switch collides with negated argument switch");
            self.reserved.insert(renamed.clone());
            let original = self
                .renames
                .iter()
                .find(|(_, current)| **current == negated)
                .map(|(original, _)| original.clone())
                .unwrap_or_else(|| negated.clone());
            self.renames.insert(original, renamed);
        }
        negated
    }

    fn free_name(&self, base: &str, suffix: &str) -> String {
        let mut n = 1usize;
        loop {
            let candidate = if n == 1 {
                format!("{base}-{suffix}")
            } else {
                format!("{base}-{suffix}{n}")
            };
            if !self.reserved.contains(&candidate)
                && !self.planned.contains(&candidate)
                && !self.table.contains(&candidate)
            {
                return candidate;
            }
            n += 1;
        }
    }
}

fn bool_handler(target: &Target<'_>, value: bool) -> SwitchHandler {
    match target {
        Target::Arg(arg) => SwitchHandler::SetBool {
            arg: arg.to_string(),
            value,
        },
        Target::Hook { arg, callback } => SwitchHandler::InvokeHook {
            arg: Some(arg.to_string()),
            callback: (*callback).clone(),
            flag_value: value,
        },
    }
}
