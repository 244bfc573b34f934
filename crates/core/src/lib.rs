//! Switchboard core library.
//!
//! Turns function metadata into a table of command-line switches and
//! extracts argument values from an argv token list. The main entry points
//! are [`ArgvParser`] for configurable extraction and [`get_args_from_argv`]
//! for the defaults (strict mode, no extra switches).
//!
//! Extraction runs in stages: normalize the metadata, compile switches,
//! scan switches out of the token list, assign remaining tokens by position,
//! then enforce requiredness. The caller's token list is shortened in place
//! to exactly the tokens no argument claimed.

#![warn(missing_docs)]

/// Switch compilation from argument specs.
pub mod compile;
/// Structured-literal (JSON / YAML) value decoding.
pub mod decode;
/// Applying scanned switches to the value mapping.
pub mod dispatch;
/// Error types.
pub mod error;
/// Positional extraction and reconciliation.
pub mod positional;
/// Requiredness enforcement.
pub mod required;
/// Getopt-style token scanner.
pub mod scanner;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;

// ── Convenience re-exports ──────────────────────────────────────────────────

pub use compile::{
    Arity, CompiledSwitches, SwitchBinding, SwitchHandler, SwitchInfo, SwitchTable,
    compile_switches, negated_name, switch_name,
};
pub use decode::{FALLBACK_ORDER, Grammar, decode_structured, decode_value};
pub use dispatch::{SwitchEvent, SwitchObserver, apply_switch, assemble_table};
pub use error::{ErrorKind, GetArgsError};
pub use positional::{ArrayExtractor, Assignment, PositionalExtractor};
pub use required::{MissingAction, MissingHook};
pub use scanner::{GetoptScanner, OnSwitch, ScanConfig, ScanError, Scanner};

// Metadata model (re-exported from the schema crate)
pub use switchboard_schema::{
    self as schema, AliasMeta, ArgMeta, ArgumentSpec, FunctionMeta, NormalizeOptions, Presence,
    SwitchCallback, TypeClass, TypeDecl, ValueMapping,
};

/// Per-call settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallConfig {
    /// Fail on every error; lenient mode swallows the recoverable ones.
    pub strict: bool,
    /// Install `--<name>-json` switches.
    pub per_arg_json: bool,
    /// Install `--<name>-yaml` switches.
    pub per_arg_yaml: bool,
    /// Tolerate tokens beyond the last positional argument.
    pub allow_extra_elems: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            strict: true,
            per_arg_json: false,
            per_arg_yaml: false,
            allow_extra_elems: false,
        }
    }
}

/// Configurable argv extraction for one function's metadata.
///
/// ```
/// use serde_json::json;
/// use switchboard_core::{ArgMeta, ArgvParser, FunctionMeta};
///
/// let meta = FunctionMeta::new()
///     .with_arg("name", ArgMeta::of_type("str").at(0))
///     .with_arg("verbose", ArgMeta::of_type("bool"));
/// let mut argv: Vec<String> = vec!["--verbose".into(), "world".into()];
/// let values = ArgvParser::new().meta(&meta).parse(&mut argv).unwrap();
/// assert_eq!(values.to_json(), json!({"name": "world", "verbose": true}));
/// assert!(argv.is_empty());
/// ```
pub struct ArgvParser<'a> {
    meta: Option<&'a FunctionMeta>,
    config: CallConfig,
    common: Vec<SwitchBinding>,
    before: Vec<SwitchBinding>,
    after: Vec<SwitchBinding>,
    alias_handlers: Vec<(String, String, SwitchCallback)>,
    on_missing: Option<Box<MissingHook<'a>>>,
    on_switch: Option<Box<SwitchObserver<'a>>>,
    scanner: Box<dyn Scanner + 'a>,
    extractor: Box<dyn PositionalExtractor + 'a>,
}

impl Default for ArgvParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ArgvParser<'a> {
    /// A parser with default settings and no metadata.
    pub fn new() -> Self {
        Self {
            meta: None,
            config: CallConfig::default(),
            common: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            alias_handlers: Vec::new(),
            on_missing: None,
            on_switch: None,
            scanner: Box::new(GetoptScanner),
            extractor: Box::new(ArrayExtractor),
        }
    }

    /// The function metadata to extract arguments for.
    pub fn meta(mut self, meta: &'a FunctionMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: CallConfig) -> Self {
        self.config = config;
        self
    }

    /// Strict (default) or lenient mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Install a `--<name>-json` switch for every non-bool argument.
    pub fn per_arg_json(mut self, enabled: bool) -> Self {
        self.config.per_arg_json = enabled;
        self
    }

    /// Install a `--<name>-yaml` switch for every non-bool argument.
    pub fn per_arg_yaml(mut self, enabled: bool) -> Self {
        self.config.per_arg_yaml = enabled;
        self
    }

    /// Tolerate tokens beyond the last positional argument.
    pub fn allow_extra_elems(mut self, allow: bool) -> Self {
        self.config.allow_extra_elems = allow;
        self
    }

    /// Switches placed before the compiled ones. Argument switches of the
    /// same name replace them.
    pub fn extra_switches_before<I: IntoIterator<Item = SwitchBinding>>(mut self, switches: I) -> Self {
        self.before.extend(switches);
        self
    }

    /// Switches placed after the compiled ones. They replace argument
    /// switches of the same name.
    pub fn extra_switches_after<I: IntoIterator<Item = SwitchBinding>>(mut self, switches: I) -> Self {
        self.after.extend(switches);
        self
    }

    /// Caller-level switches (`help`, `format`, ...) whose names are
    /// reserved: colliding argument switches get renamed instead.
    pub fn common_switches<I: IntoIterator<Item = SwitchBinding>>(mut self, switches: I) -> Self {
        self.common.extend(switches);
        self
    }

    /// Bind a side-effecting handler to alias `alias` of argument `arg`.
    ///
    /// The alias then calls `handler` instead of assigning to `arg`. Parsing
    /// fails with [`GetArgsError::UnknownAlias`] when the metadata declares
    /// no such alias.
    pub fn alias_handler<F>(mut self, arg: impl Into<String>, alias: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ValueMapping, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.alias_handlers
            .push((arg.into(), alias.into(), SwitchCallback::new(handler)));
        self
    }

    /// Hook called for every argument still absent after extraction.
    pub fn on_missing<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&str, &ArgumentSpec, &mut ValueMapping) -> MissingAction + 'a,
    {
        self.on_missing = Some(Box::new(hook));
        self
    }

    /// Observer called after every handled switch occurrence.
    pub fn on_switch<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&SwitchEvent<'_>, &ValueMapping) + 'a,
    {
        self.on_switch = Some(Box::new(observer));
        self
    }

    /// Replace the token scanner.
    pub fn scanner<S: Scanner + 'a>(mut self, scanner: S) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    /// Replace the positional extractor.
    pub fn extractor<E: PositionalExtractor + 'a>(mut self, extractor: E) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// The full switch table a parse would scan with.
    pub fn compile(&self) -> Result<SwitchTable, GetArgsError> {
        Ok(self.prepare()?.1)
    }

    /// Extract argument values from `argv`.
    ///
    /// On return, successful or not, `argv` holds exactly the tokens that
    /// no argument claimed.
    pub fn parse(&mut self, argv: &mut Vec<String>) -> Result<ValueMapping, GetArgsError> {
        let (specs, table) = self.prepare()?;
        let strict = self.config.strict;
        debug!(
            args = specs.len(),
            switches = table.len(),
            tokens = argv.len(),
            strict,
            "extracting arguments"
        );

        let mut values = ValueMapping::new();
        let mut sources = BTreeMap::new();
        dispatch::dispatch(
            argv,
            &table,
            strict,
            self.scanner.as_ref(),
            &mut values,
            &mut sources,
            self.on_switch.as_deref_mut(),
        )?;
        positional::reconcile(
            argv,
            &specs,
            self.extractor.as_ref(),
            self.config.allow_extra_elems,
            strict,
            &mut values,
            &sources,
        )?;
        required::enforce(&specs, &mut values, strict, self.on_missing.as_deref_mut())?;

        debug!(values = values.len(), leftover = argv.len(), "extraction finished");
        Ok(values)
    }

    fn prepare(&self) -> Result<(Vec<ArgumentSpec>, SwitchTable), GetArgsError> {
        let meta = self
            .meta
            .ok_or(GetArgsError::MissingInput("function metadata"))?;
        let mut specs = schema::normalize_meta(
            meta,
            NormalizeOptions {
                per_arg_json: self.config.per_arg_json,
                per_arg_yaml: self.config.per_arg_yaml,
            },
        )?;
        for (arg, alias, handler) in &self.alias_handlers {
            let slot = specs
                .iter_mut()
                .find(|s| &s.name == arg)
                .and_then(|s| s.alias_mut(alias))
                .ok_or_else(|| GetArgsError::UnknownAlias {
                    arg: arg.clone(),
                    alias: alias.clone(),
                })?;
            slot.handler = Some(handler.clone());
        }

        let reserved: BTreeSet<String> = self.common.iter().map(|b| b.name.clone()).collect();
        let compiled = compile_switches(&specs, &reserved);
        let mut pre: Vec<SwitchBinding> = self
            .common
            .iter()
            .cloned()
            .map(|mut binding| {
                if let Some(renamed) = compiled.common_renames.get(&binding.name) {
                    binding.name = renamed.clone();
                }
                binding
            })
            .collect();
        pre.extend(self.before.iter().cloned());

        let table = assemble_table(&pre, &compiled.table, &self.after);
        Ok((specs, table))
    }
}

/// Extract argument values from `argv` with default settings.
pub fn get_args_from_argv(
    argv: &mut Vec<String>,
    meta: &FunctionMeta,
) -> Result<ValueMapping, GetArgsError> {
    ArgvParser::new().meta(meta).parse(argv)
}
