mod cli;
mod output;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use heritage_graph::analyzers::AnalyzerName;
use heritage_graph::config::{CONFIG_FILE, HeritageConfig};
use heritage_graph::query::{QueryConfig, QueryOrchestrator, RunConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyzers => {
            for analyzer in AnalyzerName::ALL {
                println!("{:<18} {}", analyzer.as_str(), analyzer.description());
            }
        }

        Commands::Query {
            analyzer,
            targets,
            references,
            options,
            no_cache,
            config,
            format,
        } => {
            let config = match config {
                Some(path) => HeritageConfig::load_file(&path),
                None => HeritageConfig::load(Path::new(".")),
            };
            let orchestrator = if no_cache {
                QueryOrchestrator::with_cache_disabled(config)
            } else {
                QueryOrchestrator::new(config)
            }
            .context("failed to start query orchestrator")?;

            let query = QueryConfig {
                analyzer_name: analyzer.clone(),
                options: options.into_iter().collect(),
            };
            let run = RunConfig {
                target_project_paths: targets,
                reference_project_paths: references,
            };

            let result = orchestrator
                .run(&query, &run)
                .with_context(|| format!("query {analyzer} failed"))?;
            output::print_result(&result, format)?;

            if let Err(err) = orchestrator.persist_cache() {
                tracing::warn!("could not save cache ({CONFIG_FILE} cache.dir): {err}");
            }
        }
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
