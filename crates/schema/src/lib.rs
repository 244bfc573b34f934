//! Function argument metadata for switchboard.
//!
//! Defines the raw, serde-deserializable description of a function's named
//! arguments ([`FunctionMeta`]), the normalizer that turns it into one
//! canonical [`ArgumentSpec`] per argument, and the [`ValueMapping`] that
//! accumulates extracted values.  The switch compiler and argv extraction
//! engine in `switchboard_core` consume these types.

#![warn(missing_docs)]

/// Raw metadata as authored (JSON or YAML).
pub mod meta;
/// Type declaration and metadata normalization.
pub mod normalize;
/// Extracted values and switch callbacks.
pub mod values;

use thiserror::Error;

pub use meta::{AliasMeta, ArgMeta, FunctionMeta, META_VERSION, TypeDecl};
pub use normalize::{
    AliasDefinition, ArgumentSpec, NormalizeOptions, NormalizedType, TypeClass, normalize_meta,
    normalize_type,
};
pub use values::{Presence, SwitchCallback, ValueMapping};

/// Errors that can occur when loading or normalizing function metadata.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The metadata declares a format version other than [`META_VERSION`].
    #[error("unsupported metadata version {found} (only {expected} is supported)")]
    UnsupportedVersion {
        /// The version found in the metadata.
        found: f64,
        /// The single supported version.
        expected: f64,
    },

    /// An argument's type declaration could not be normalized.
    #[error("argument '{arg}': invalid type declaration: {reason}")]
    InvalidTypeDecl {
        /// The argument (or `arg/alias`) carrying the declaration.
        arg: String,
        /// A human-readable explanation of the failure.
        reason: String,
    },

    /// Two arguments claim the same position index.
    #[error("arguments '{first}' and '{second}' both declare position {pos}")]
    DuplicatePosition {
        /// The position index.
        pos: usize,
        /// The argument that claimed the position first (by name order).
        first: String,
        /// The argument that claimed the position second.
        second: String,
    },

    /// A greedy argument is followed by another positional argument.
    #[error("greedy argument '{arg}' at position {pos} must be the last positional argument")]
    GreedyNotLast {
        /// The greedy argument.
        arg: String,
        /// Its position.
        pos: usize,
    },

    /// An argument or alias name is empty.
    #[error("empty argument or alias name")]
    EmptyName,

    /// JSON deserialization failed.
    #[error("invalid metadata JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// YAML deserialization failed.
    #[error("invalid metadata YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Load function metadata from a JSON string.
///
/// Only deserializes; the version check and type normalization happen in
/// [`normalize_meta`], so that a metadata document can be inspected even when
/// it declares an unsupported version.
pub fn load_meta_from_str(json: &str) -> Result<FunctionMeta, SchemaError> {
    Ok(serde_json::from_str(json)?)
}

/// Load function metadata from a YAML string.
pub fn load_meta_from_yaml_str(yaml: &str) -> Result<FunctionMeta, SchemaError> {
    Ok(serde_yaml::from_str(yaml)?)
}
