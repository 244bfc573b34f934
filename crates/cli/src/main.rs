mod render;

use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use switchboard_core::{ArgvParser, FunctionMeta};
use switchboard_schema::{load_meta_from_str, load_meta_from_yaml_str};
use tracing::debug;

use crate::render::{
    Format, print_command_failure, print_extraction_failure, print_switches, print_values,
};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "switchboard",
    version,
    about = "Extract function arguments from command-line tokens using argument metadata"
)]
struct Cli {
    /// Output mode: "pretty" for plain text, "json" for machine-readable
    /// envelopes. Defaults to "pretty" when stdout is a TTY, "json"
    /// otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Options shared by every command that compiles switches.
#[derive(Args, Debug)]
struct MetaArgs {
    /// Function metadata file. `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON.
    #[arg(long)]
    meta: String,
    /// Install a `--<arg>-json` switch for every non-bool argument.
    #[arg(long)]
    per_arg_json: bool,
    /// Install a `--<arg>-yaml` switch for every non-bool argument.
    #[arg(long)]
    per_arg_yaml: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Extract argument values from the tokens after `--`.
    Parse {
        #[command(flatten)]
        meta: MetaArgs,
        /// Ignore unknown switches, conflicts and missing required arguments.
        #[arg(long)]
        lenient: bool,
        /// Tolerate tokens beyond the last positional argument.
        #[arg(long)]
        allow_extra: bool,
        /// Tokens to extract from.
        #[arg(last = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Print the switch table compiled from the metadata.
    Switches {
        #[command(flatten)]
        meta: MetaArgs,
    },
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    let outcome = match cli.cmd {
        Cmd::Parse {
            meta,
            lenient,
            allow_extra,
            tokens,
        } => cmd_parse(&meta, lenient, allow_extra, tokens, format),
        Cmd::Switches { meta } => cmd_switches(&meta, format).map(|()| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_command_failure(format, &e);
            process::exit(1);
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────────

/// Returns whether extraction succeeded.
fn cmd_parse(
    args: &MetaArgs,
    lenient: bool,
    allow_extra: bool,
    mut tokens: Vec<String>,
    format: Format,
) -> Result<bool> {
    let meta = load_meta(&args.meta)?;
    let result = ArgvParser::new()
        .meta(&meta)
        .strict(!lenient)
        .per_arg_json(args.per_arg_json)
        .per_arg_yaml(args.per_arg_yaml)
        .allow_extra_elems(allow_extra)
        .parse(&mut tokens);

    match result {
        Ok(values) => {
            print_values(format, &values, &tokens);
            Ok(true)
        }
        Err(e) => {
            print_extraction_failure(format, &e, &tokens);
            Ok(false)
        }
    }
}

fn cmd_switches(args: &MetaArgs, format: Format) -> Result<()> {
    let meta = load_meta(&args.meta)?;
    let table = ArgvParser::new()
        .meta(&meta)
        .per_arg_json(args.per_arg_json)
        .per_arg_yaml(args.per_arg_yaml)
        .compile()
        .with_context(|| format!("failed to compile switches for '{}'", args.meta))?;
    print_switches(format, &table.describe());
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Read a metadata file, choosing the format by extension.
fn load_meta(path: &str) -> Result<FunctionMeta> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read metadata file '{path}'"))?;
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    debug!(path, is_yaml, "loading metadata");
    let meta = if is_yaml {
        load_meta_from_yaml_str(&text)
    } else {
        load_meta_from_str(&text)
    };
    meta.with_context(|| format!("failed to load metadata file '{path}'"))
}
