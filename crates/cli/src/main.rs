//! AlignView CLI - Main Entry Point
//!
//! Command-line interface for building experiment manifests, serving the
//! comparison table API, and checking a running server.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{manifest, serve};

/// AlignView - Experiment Run Comparison Platform
#[derive(Parser)]
#[command(name = "alignview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and inspect experiment manifests
    #[command(subcommand)]
    Manifest(manifest::ManifestCommands),

    /// Serve the comparison API over HTTP
    Serve(serve::ServeArgs),

    /// Check a running server
    Status {
        /// Server address
        #[arg(long, default_value = "http://127.0.0.1:8310")]
        addr: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Manifest(cmd) => manifest::execute(cmd, cli.format).await?,
        Commands::Serve(args) => serve::execute(args).await?,
        Commands::Status { addr } => {
            let url = format!("{}/api/health", addr.trim_end_matches('/'));
            match reqwest::get(&url).await {
                Ok(response) if response.status().is_success() => {
                    let health: serde_json::Value = response.json().await?;
                    output::print_success(&format!(
                        "Server is running at {} (session {})",
                        addr,
                        health["session"].as_str().unwrap_or("unknown")
                    ));
                }
                Ok(response) => {
                    output::print_error(&format!(
                        "Server at {} responded with {}",
                        addr,
                        response.status()
                    ));
                    std::process::exit(1);
                }
                Err(e) => {
                    output::print_error(&format!("Cannot reach server at {}: {}", addr, e));
                    std::process::exit(1);
                }
            }
        }
        Commands::Version => {
            println!("AlignView CLI v{}", alignview_common::VERSION);
            println!("Experiment run comparison platform");
        }
    }

    Ok(())
}
