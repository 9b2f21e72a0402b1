use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use alignview_common::Manifest;
use alignview_session::{FileFetcher, Session};
use alignview_web::server::WebServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr: SocketAddr = std::env::var("ALIGNVIEW_WEB_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8310".to_string())
        .parse()?;

    let manifest_path = PathBuf::from(
        std::env::var("ALIGNVIEW_MANIFEST")
            .map_err(|_| anyhow::anyhow!("ALIGNVIEW_MANIFEST is required"))?,
    );
    let experiments_root = std::env::var("ALIGNVIEW_EXPERIMENTS_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            manifest_path
                .parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });

    let config = WebServerConfig {
        static_dir: std::env::var("ALIGNVIEW_STATIC_DIR").ok().map(PathBuf::from),
    };

    let manifest = Manifest::load(&manifest_path)?;
    info!(
        "Loaded manifest with {} runs from {}",
        manifest.runs.len(),
        manifest_path.display()
    );

    let metadata = Arc::new(manifest.index());
    let fetcher = Arc::new(FileFetcher::new(&manifest, experiments_root));
    let session = Session::new(metadata, fetcher);

    alignview_web::server::serve(addr, config, session).await
}
