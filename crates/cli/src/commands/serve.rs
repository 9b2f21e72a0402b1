//! Serve command: session over HTTP

use alignview_common::{AppConfig, Manifest};
use alignview_session::{FileFetcher, Session};
use alignview_web::server::WebServerConfig;
use clap::Args;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Manifest path (overrides config)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Experiments root for resolving result paths (overrides config)
    #[arg(long)]
    experiments_root: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(long)]
    listen: Option<String>,

    /// Static asset directory (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    if let Some(manifest) = args.manifest {
        // Resolve result paths next to the manifest unless told otherwise
        if args.experiments_root.is_none() && args.config.is_none() {
            config.experiments_root = manifest
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
        }
        config.manifest_path = manifest;
    }
    if let Some(root) = args.experiments_root {
        config.experiments_root = root;
    }
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = Some(dir);
    }

    let addr: SocketAddr = config.listen.parse()?;
    let manifest = Manifest::load(&config.manifest_path)?;
    info!(
        "Loaded manifest with {} runs from {}",
        manifest.runs.len(),
        config.manifest_path.display()
    );

    let metadata = Arc::new(manifest.index());
    let fetcher = Arc::new(
        FileFetcher::new(&manifest, config.experiments_root.clone()).with_timeout(
            std::time::Duration::from_secs(config.fetch_timeout_secs),
        ),
    );
    let session = Session::new(metadata, fetcher);

    let web_config = WebServerConfig {
        static_dir: config.static_dir.clone(),
    };
    alignview_web::server::serve(addr, web_config, session).await
}
