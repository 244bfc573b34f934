//! Raw function metadata, mirroring the authored JSON/YAML documents.
//!
//! Nothing here is validated beyond what serde enforces; see
//! [`crate::normalize`] for the canonical form consumed by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The single metadata format version accepted by the normalizer.
pub const META_VERSION: f64 = 1.1;

/// Version assumed when a document carries no `v` key.
const IMPLICIT_META_VERSION: f64 = 1.0;

fn default_meta_version() -> f64 {
    IMPLICIT_META_VERSION
}

/// Metadata for one function: its format version and named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMeta {
    /// Metadata format version. Must equal [`META_VERSION`].
    #[serde(default = "default_meta_version")]
    pub v: f64,
    /// Short description of the function (informational only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Declared arguments, keyed by canonical name.
    #[serde(default)]
    pub args: BTreeMap<String, ArgMeta>,
}

impl Default for FunctionMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionMeta {
    /// Create empty metadata at the supported version.
    pub fn new() -> Self {
        Self {
            v: META_VERSION,
            summary: None,
            args: BTreeMap::new(),
        }
    }

    /// Add (or replace) an argument, builder style.
    pub fn with_arg(mut self, name: impl Into<String>, arg: ArgMeta) -> Self {
        self.args.insert(name.into(), arg);
        self
    }
}

/// Metadata for a single argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgMeta {
    /// Type declaration. An absent schema means `any`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TypeDecl>,
    /// Whether the argument must receive a value.
    #[serde(default)]
    pub req: bool,
    /// Position index when the argument may be given positionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<usize>,
    /// Consume every remaining positional token from `pos` onwards.
    #[serde(default)]
    pub greedy: bool,
    /// Boolean switch without a negated form.
    #[serde(default)]
    pub is_flag: bool,
    /// Additional switch names, keyed by alias name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cmdline_aliases: BTreeMap<String, AliasMeta>,
    /// Short description (informational only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ArgMeta {
    /// An argument with the given type declaration and no other settings.
    pub fn of_type(decl: impl Into<TypeDecl>) -> Self {
        Self {
            schema: Some(decl.into()),
            ..Default::default()
        }
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.req = true;
        self
    }

    /// Set the position index.
    pub fn at(mut self, pos: usize) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Mark the argument as greedy.
    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    /// Mark a boolean argument as a pure flag.
    pub fn flag(mut self) -> Self {
        self.is_flag = true;
        self
    }

    /// Add an alias.
    pub fn alias(mut self, name: impl Into<String>, alias: AliasMeta) -> Self {
        self.cmdline_aliases.insert(name.into(), alias);
        self
    }
}

/// An additional switch name for an argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasMeta {
    /// Type override for this alias; defaults to the owner's type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TypeDecl>,
    /// Boolean alias without a negated form.
    #[serde(default)]
    pub is_flag: bool,
    /// Short description (informational only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A type declaration as authored.
///
/// Either a bare type name (`"int"`, or `"int*"` as shorthand for a
/// required value) or a `[type, constraints]` pair. Any other JSON shape
/// fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    /// A bare type name, optionally suffixed with `*`.
    Name(String),
    /// A type name with a constraints object (`of`, `req`, ...).
    Pair(String, Map<String, Value>),
}

impl TypeDecl {
    /// An `array` declaration whose elements have the given type.
    pub fn array_of(element: impl Into<TypeDecl>) -> Self {
        let mut constraints = Map::new();
        let element = match element.into() {
            TypeDecl::Name(name) => Value::String(name),
            TypeDecl::Pair(name, clauses) => {
                Value::Array(vec![Value::String(name), Value::Object(clauses)])
            }
        };
        constraints.insert("of".to_string(), element);
        TypeDecl::Pair("array".to_string(), constraints)
    }
}

impl From<&str> for TypeDecl {
    fn from(name: &str) -> Self {
        TypeDecl::Name(name.to_string())
    }
}

impl From<String> for TypeDecl {
    fn from(name: String) -> Self {
        TypeDecl::Name(name)
    }
}
