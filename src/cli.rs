use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Cross-project export index and subclass matcher for TypeScript/JavaScript packages.
///
/// heritage-graph indexes the exports of a set of reference packages and finds which
/// classes in a set of target packages extend them, directly, through renamed
/// re-exports, or through mixin functions.
#[derive(Parser, Debug)]
#[command(
    name = "heritage-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per export / match (default).
    #[default]
    Compact,
    /// The full analyzer result as pretty-printed JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an analyzer over reference and target projects.
    Query {
        /// Analyzer name (see `heritage-graph analyzers`).
        analyzer: String,

        /// Target project directory or glob pattern. Repeatable.
        #[arg(short, long = "target", value_name = "PATH")]
        targets: Vec<PathBuf>,

        /// Reference project directory or glob pattern. Repeatable.
        #[arg(short, long = "reference", value_name = "PATH", required = true)]
        references: Vec<PathBuf>,

        /// Analyzer option as key=value; the value is parsed as JSON when possible.
        #[arg(short, long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, serde_json::Value)>,

        /// Recompute everything, ignoring and not updating any cache.
        #[arg(long)]
        no_cache: bool,

        /// Configuration file (defaults to ./heritage-graph.toml).
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// List the registered analyzers.
    Analyzers,
}

/// `key=value` → (key, JSON value). Values that are not valid JSON are taken as strings.
fn parse_option(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty option key in {raw:?}"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
