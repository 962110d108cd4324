//! Caddywrap - serve applications wrapped as Caddyfile directives
//!
//! This is the main entry point for the Caddywrap CLI.

mod apps;
mod loader;

use caddywrap_core::server::serve;
use caddywrap_plugin::{DirectiveRegistry, SiteSetup};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Caddywrap - run apps configured from a Caddyfile
#[derive(Parser)]
#[command(name = "caddywrap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with a Caddyfile
    Run {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        config: PathBuf,
    },

    /// Validate a Caddyfile without serving it
    Validate {
        /// Path to the Caddyfile
        #[arg(default_value = "Caddyfile")]
        config: PathBuf,

        /// Print the config every directive was adapted to
        #[arg(long)]
        json: bool,
    },

    /// List the available directives
    Directives,

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only changes the default
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let registry = apps::registry();

    match cli.command {
        Commands::Run { config } => {
            tracing::info!("Starting Caddywrap with config: {}", config.display());
            let sites = load_or_exit(&config, &registry);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_server(sites))?;
        }

        Commands::Validate { config, json } => {
            let sites = load_or_exit(&config, &registry);
            if json {
                println!("{}", serde_json::to_string_pretty(&adapted_json(&config, &sites))?);
            } else {
                println!(
                    "Configuration '{}' is valid ({} site(s))",
                    config.display(),
                    sites.len()
                );
            }
        }

        Commands::Directives => {
            for info in registry.list() {
                println!("{} v{} - {}", info.name, info.version, info.description);
                for field in &info.fields {
                    let position = field
                        .position
                        .map(|p| format!(" (arg{})", p))
                        .unwrap_or_default();
                    println!("    {}{}: {}", field.keyword, position, field.kind);
                }
            }
        }

        Commands::Version => {
            println!("Caddywrap v{}", caddywrap_core::VERSION);
        }
    }

    Ok(())
}

fn load_or_exit(path: &Path, registry: &DirectiveRegistry) -> Vec<SiteSetup> {
    match loader::load(path, registry) {
        Ok(sites) => sites,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            eprintln!("{}", e.report());
            process::exit(1);
        }
    }
}

fn adapted_json(path: &Path, sites: &[SiteSetup]) -> serde_json::Value {
    let sites: Vec<serde_json::Value> = sites
        .iter()
        .map(|site| {
            let directives: serde_json::Map<String, serde_json::Value> =
                site.adapted.iter().cloned().collect();
            serde_json::json!({
                "addresses": site.addresses.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
                "directives": directives,
            })
        })
        .collect();
    serde_json::json!({
        "file": path.display().to_string(),
        "sites": sites,
    })
}

/// Serve every listener until Ctrl-C or the first listener failure
async fn run_server(sites: Vec<SiteSetup>) -> anyhow::Result<()> {
    let listeners = loader::listeners(&sites);
    tracing::info!(
        "Serving {} site(s) on {} listener(s)",
        sites.len(),
        listeners.len()
    );

    let mut tasks = JoinSet::new();
    for (addr, hosts) in listeners {
        tasks.spawn(serve(addr, Arc::new(hosts)));
    }

    tokio::select! {
        Some(result) = tasks.join_next() => {
            result??;
            anyhow::bail!("listener stopped unexpectedly");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down");
        }
    }

    tasks.shutdown().await;
    Ok(())
}
