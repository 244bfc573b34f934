//! Typed errors for argv extraction.

use serde::Serialize;
use switchboard_schema::SchemaError;

/// Classification of a [`GetArgsError`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Function metadata was not supplied.
    MissingInput,
    /// The metadata format version is not the supported one.
    UnsupportedSchemaVersion,
    /// The metadata is malformed.
    InvalidSchema,
    /// The switch scan or positional extraction failed.
    ParseError,
    /// A structured-literal value could not be decoded.
    ValueDecodeError,
    /// An argument was given both by switch and by position.
    ArgumentConflictError,
    /// A required argument received no value.
    MissingRequiredArgumentError,
    /// An alias or extension switch handler reported a failure.
    HookError,
}

impl ErrorKind {
    /// Whether lenient mode still treats this kind as fatal.
    pub fn is_fatal_when_lenient(self) -> bool {
        matches!(
            self,
            ErrorKind::MissingInput
                | ErrorKind::UnsupportedSchemaVersion
                | ErrorKind::InvalidSchema
                | ErrorKind::ValueDecodeError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingInput => write!(f, "missing_input"),
            ErrorKind::UnsupportedSchemaVersion => write!(f, "unsupported_schema_version"),
            ErrorKind::InvalidSchema => write!(f, "invalid_schema"),
            ErrorKind::ParseError => write!(f, "parse_error"),
            ErrorKind::ValueDecodeError => write!(f, "value_decode_error"),
            ErrorKind::ArgumentConflictError => write!(f, "argument_conflict_error"),
            ErrorKind::MissingRequiredArgumentError => {
                write!(f, "missing_required_argument_error")
            }
            ErrorKind::HookError => write!(f, "hook_error"),
        }
    }
}

/// Errors returned by argv extraction.
///
/// Use [`GetArgsError::kind()`] to classify and [`GetArgsError::arg()`] to
/// find the offending argument, when there is one.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GetArgsError {
    /// A required input (e.g. the function metadata) was not supplied.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// The metadata could not be normalized.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An alias handler was registered for an alias the metadata lacks.
    #[error("no alias '{alias}' declared for argument '{arg}'")]
    UnknownAlias {
        /// The argument the handler was registered for.
        arg: String,
        /// The alias name.
        alias: String,
    },

    /// The switch scan or positional extraction failed.
    #[error("{message}")]
    Parse {
        /// Human-readable description of the failure.
        message: String,
        /// The switch involved, when the failure concerns one.
        switch: Option<String>,
    },

    /// A structured-literal value could not be decoded.
    #[error("invalid value for argument '{arg}': cannot decode {raw:?} as {grammars}: {diagnostic}")]
    ValueDecode {
        /// The argument being decoded.
        arg: String,
        /// The raw text that failed to decode.
        raw: String,
        /// The grammar(s) tried, e.g. `"JSON or YAML"`.
        grammars: String,
        /// The diagnostic of the last grammar tried.
        diagnostic: String,
    },

    /// The same argument was supplied by switch and by position.
    #[error(
        "argument '{arg}' specified both as switch --{switch} and as positional argument #{pos}"
    )]
    ArgumentConflict {
        /// The argument.
        arg: String,
        /// The switch that supplied it.
        switch: String,
        /// The positional index that would also supply it.
        pos: usize,
    },

    /// A required argument received no value.
    #[error("missing required argument '{arg}'")]
    MissingRequiredArgument {
        /// The argument.
        arg: String,
    },

    /// A switch callback failed.
    #[error("handler for switch --{switch} failed: {message}")]
    Hook {
        /// The switch whose handler failed.
        switch: String,
        /// The handler's message.
        message: String,
    },
}

impl GetArgsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GetArgsError::MissingInput(_) => ErrorKind::MissingInput,
            GetArgsError::Schema(SchemaError::UnsupportedVersion { .. }) => {
                ErrorKind::UnsupportedSchemaVersion
            }
            GetArgsError::Schema(_) | GetArgsError::UnknownAlias { .. } => {
                ErrorKind::InvalidSchema
            }
            GetArgsError::Parse { .. } => ErrorKind::ParseError,
            GetArgsError::ValueDecode { .. } => ErrorKind::ValueDecodeError,
            GetArgsError::ArgumentConflict { .. } => ErrorKind::ArgumentConflictError,
            GetArgsError::MissingRequiredArgument { .. } => {
                ErrorKind::MissingRequiredArgumentError
            }
            GetArgsError::Hook { .. } => ErrorKind::HookError,
        }
    }

    /// The argument this error concerns, if any.
    pub fn arg(&self) -> Option<&str> {
        match self {
            GetArgsError::ValueDecode { arg, .. }
            | GetArgsError::ArgumentConflict { arg, .. }
            | GetArgsError::MissingRequiredArgument { arg }
            | GetArgsError::UnknownAlias { arg, .. } => Some(arg.as_str()),
            GetArgsError::Schema(SchemaError::InvalidTypeDecl { arg, .. })
            | GetArgsError::Schema(SchemaError::GreedyNotLast { arg, .. }) => Some(arg.as_str()),
            _ => None,
        }
    }

    /// The switch this error concerns, if any.
    pub fn switch(&self) -> Option<&str> {
        match self {
            GetArgsError::Parse { switch, .. } => switch.as_deref(),
            GetArgsError::ArgumentConflict { switch, .. } | GetArgsError::Hook { switch, .. } => {
                Some(switch.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn parse(message: impl Into<String>, switch: Option<&str>) -> Self {
        GetArgsError::Parse {
            message: message.into(),
            switch: switch.map(str::to_string),
        }
    }
}
