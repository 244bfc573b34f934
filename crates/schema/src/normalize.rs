//! Normalization of raw metadata into canonical argument specs.
//!
//! Every type declaration is reduced to a [`TypeClass`] plus its constraint
//! clauses; the switch compiler only ever looks at the class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SchemaError;
use crate::meta::{AliasMeta, ArgMeta, FunctionMeta, META_VERSION, TypeDecl};
use crate::values::SwitchCallback;

/// Type names whose values are passed through as plain strings.
const SCALAR_TYPES: &[&str] = &[
    "str", "cistr", "int", "float", "num", "buf", "date", "duration", "re",
];

/// Type names whose values are structured (decoded from JSON/YAML text).
const COMPOSITE_TYPES: &[&str] = &["hash", "any", "obj", "code"];

/// Coarse type classification driving switch compilation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    /// Boolean flag, optionally negatable.
    Bool,
    /// A single string-like value.
    Scalar,
    /// A sequence of string-like values, one per switch occurrence.
    ArrayOfScalar,
    /// A sequence of structured values, given as one encoded literal.
    ArrayOfOther,
    /// Any other structured value, given as one encoded literal.
    Other,
}

impl TypeClass {
    /// Whether values of this class are taken verbatim from the command line.
    pub fn is_simple(self) -> bool {
        matches!(self, TypeClass::Bool | TypeClass::Scalar)
    }

    /// Whether values of this class are decoded from structured-literal text.
    pub fn is_structured(self) -> bool {
        matches!(self, TypeClass::ArrayOfOther | TypeClass::Other)
    }
}

impl std::fmt::Display for TypeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeClass::Bool => write!(f, "bool"),
            TypeClass::Scalar => write!(f, "scalar"),
            TypeClass::ArrayOfScalar => write!(f, "array-of-scalar"),
            TypeClass::ArrayOfOther => write!(f, "array-of-other"),
            TypeClass::Other => write!(f, "other"),
        }
    }
}

/// A type declaration in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedType {
    /// Base type name with any `*` suffix removed (e.g. `"int"`).
    pub base: String,
    /// Classification of the base type.
    pub class: TypeClass,
    /// Element type for `array`, when declared via `of`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<NormalizedType>>,
    /// Constraint clauses, including `req: true` from the `*` shorthand.
    pub constraints: Map<String, Value>,
}

impl NormalizedType {
    /// Class of the array element, if this is an array with a declared element.
    pub fn element_class(&self) -> Option<TypeClass> {
        self.element.as_ref().map(|e| e.class)
    }
}

/// Normalize a single type declaration.
///
/// `owner` names the argument for error messages.
pub fn normalize_type(owner: &str, decl: &TypeDecl) -> Result<NormalizedType, SchemaError> {
    let (name, mut constraints) = match decl {
        TypeDecl::Name(name) => (name.as_str(), Map::new()),
        TypeDecl::Pair(name, clauses) => (name.as_str(), clauses.clone()),
    };
    let base = match name.strip_suffix('*') {
        Some(stripped) => {
            constraints.insert("req".to_string(), Value::Bool(true));
            stripped
        }
        None => name,
    };
    if base.is_empty() {
        return Err(invalid(owner, "empty type name"));
    }

    if base == "bool" {
        return Ok(NormalizedType {
            base: base.to_string(),
            class: TypeClass::Bool,
            element: None,
            constraints,
        });
    }
    if SCALAR_TYPES.contains(&base) {
        return Ok(NormalizedType {
            base: base.to_string(),
            class: TypeClass::Scalar,
            element: None,
            constraints,
        });
    }
    if COMPOSITE_TYPES.contains(&base) {
        return Ok(NormalizedType {
            base: base.to_string(),
            class: TypeClass::Other,
            element: None,
            constraints,
        });
    }
    if base != "array" {
        return Err(invalid(owner, &format!("unknown type '{base}'")));
    }

    let element = match constraints.get("of") {
        Some(of) => {
            let decl = TypeDecl::deserialize(of)
                .map_err(|e| invalid(owner, &format!("invalid 'of' clause: {e}")))?;
            Some(Box::new(normalize_type(owner, &decl)?))
        }
        None => None,
    };
    let class = match element.as_ref().map(|e| e.class) {
        Some(c) if c.is_simple() => TypeClass::ArrayOfScalar,
        _ => TypeClass::ArrayOfOther,
    };
    Ok(NormalizedType {
        base: base.to_string(),
        class,
        element,
        constraints,
    })
}

fn invalid(owner: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidTypeDecl {
        arg: owner.to_string(),
        reason: reason.to_string(),
    }
}

/// Call-level settings copied into every [`ArgumentSpec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Install a `--<name>-json` switch for every non-bool argument.
    pub per_arg_json: bool,
    /// Install a `--<name>-yaml` switch for every non-bool argument.
    pub per_arg_yaml: bool,
}

/// An alias switch for an argument, in canonical form.
#[derive(Debug, Clone)]
pub struct AliasDefinition {
    /// Alias name as declared (not yet converted to switch spelling).
    pub name: String,
    /// Type override; `None` means the owner's type applies.
    pub ty: Option<NormalizedType>,
    /// Boolean alias without a negated form.
    pub is_flag: bool,
    /// Side-effecting handler invoked instead of assigning to the owner.
    pub handler: Option<SwitchCallback>,
}

impl AliasDefinition {
    /// The effective type: the override if present, otherwise `owner`.
    pub fn effective_type<'a>(&'a self, owner: &'a NormalizedType) -> &'a NormalizedType {
        self.ty.as_ref().unwrap_or(owner)
    }
}

/// One declared argument, normalized.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    /// Canonical name; the key used in the value mapping.
    pub name: String,
    /// Normalized type.
    pub ty: NormalizedType,
    /// Whether a value must be present after extraction.
    pub required: bool,
    /// Position index, if the argument may be given positionally.
    pub pos: Option<usize>,
    /// Consumes every remaining positional token from `pos` onwards.
    pub greedy: bool,
    /// Boolean switch without a negated form.
    pub is_flag: bool,
    /// Alias switches.
    pub aliases: Vec<AliasDefinition>,
    /// Install a `-json` suffix switch.
    pub per_arg_json: bool,
    /// Install a `-yaml` suffix switch.
    pub per_arg_yaml: bool,
    /// Short description (informational only).
    pub summary: Option<String>,
}

impl ArgumentSpec {
    /// Type class shortcut.
    pub fn class(&self) -> TypeClass {
        self.ty.class
    }

    /// Find an alias by its declared name.
    pub fn alias_mut(&mut self, name: &str) -> Option<&mut AliasDefinition> {
        self.aliases.iter_mut().find(|a| a.name == name)
    }
}

/// Normalize function metadata into argument specs, sorted by name.
///
/// Fails with [`SchemaError::UnsupportedVersion`] before looking at any
/// argument when `meta.v` is not [`META_VERSION`].
pub fn normalize_meta(
    meta: &FunctionMeta,
    opts: NormalizeOptions,
) -> Result<Vec<ArgumentSpec>, SchemaError> {
    if (meta.v - META_VERSION).abs() > f64::EPSILON {
        return Err(SchemaError::UnsupportedVersion {
            found: meta.v,
            expected: META_VERSION,
        });
    }

    let mut specs = Vec::with_capacity(meta.args.len());
    for (name, arg) in &meta.args {
        specs.push(normalize_arg(name, arg, opts)?);
    }
    check_positions(&specs)?;
    Ok(specs)
}

fn normalize_arg(
    name: &str,
    arg: &ArgMeta,
    opts: NormalizeOptions,
) -> Result<ArgumentSpec, SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    let ty = match &arg.schema {
        Some(decl) => normalize_type(name, decl)?,
        None => normalize_type(name, &TypeDecl::Name("any".to_string()))?,
    };
    let aliases = arg
        .cmdline_aliases
        .iter()
        .map(|(alias, meta)| normalize_alias(name, alias, meta))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ArgumentSpec {
        name: name.to_string(),
        ty,
        required: arg.req,
        pos: arg.pos,
        greedy: arg.greedy,
        is_flag: arg.is_flag,
        aliases,
        per_arg_json: opts.per_arg_json,
        per_arg_yaml: opts.per_arg_yaml,
        summary: arg.summary.clone(),
    })
}

fn normalize_alias(owner: &str, name: &str, meta: &AliasMeta) -> Result<AliasDefinition, SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    let ty = match &meta.schema {
        Some(decl) => Some(normalize_type(&format!("{owner}/{name}"), decl)?),
        None => None,
    };
    Ok(AliasDefinition {
        name: name.to_string(),
        ty,
        is_flag: meta.is_flag,
        handler: None,
    })
}

fn check_positions(specs: &[ArgumentSpec]) -> Result<(), SchemaError> {
    let mut by_pos: BTreeMap<usize, &str> = BTreeMap::new();
    for spec in specs {
        if let Some(pos) = spec.pos
            && let Some(first) = by_pos.insert(pos, &spec.name)
        {
            return Err(SchemaError::DuplicatePosition {
                pos,
                first: first.to_string(),
                second: spec.name.clone(),
            });
        }
    }
    let last = by_pos.keys().next_back().copied();
    for spec in specs {
        if spec.greedy
            && let Some(pos) = spec.pos
            && Some(pos) != last
        {
            return Err(SchemaError::GreedyNotLast {
                arg: spec.name.clone(),
                pos,
            });
        }
    }
    Ok(())
}
