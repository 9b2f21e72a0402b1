//! E2E harness entry point
//!
//! Runs the bundled YAML interaction scripts against a file-backed session
//! over a temporary experiments tree.
//! Run with: cargo test --package alignview-e2e --test e2e

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use alignview_e2e::{E2eResult, Fixture, ScriptRunner, ScriptSpec};

#[derive(Parser, Debug)]
#[command(name = "alignview-e2e")]
#[command(about = "Scripted e2e runner for AlignView")]
struct Args {
    /// Path to the scripts directory
    #[arg(short, long)]
    scripts: Option<PathBuf>,

    /// Run only scripts matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific script by name
    #[arg(short, long)]
    name: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let scripts_dir = args
        .scripts
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scripts"));

    let mut specs = ScriptSpec::load_all(&scripts_dir)?;
    if let Some(tag) = &args.tag {
        specs.retain(|s| s.tags.contains(tag));
    }
    if let Some(name) = &args.name {
        specs.retain(|s| &s.name == name);
        if specs.is_empty() {
            return Err(alignview_e2e::E2eError::Script(format!(
                "Script not found: {}",
                name
            )));
        }
    }

    let fixture = Fixture::new()?;
    let mut runner = ScriptRunner::new(fixture.session());
    let summary = runner.run_all(&specs).await;

    println!(
        "{} passed, {} failed of {} ({} ms)",
        summary.passed, summary.failed, summary.total, summary.duration_ms
    );
    Ok(summary.failed == 0)
}
