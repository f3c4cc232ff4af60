use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use docrest::{
    AppContext,
    DocumentResource,
    NodeManager,
    cli::Cli,
    error::Result,
    server,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCREST_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Resources served by this binary.
fn resources() -> Vec<DocumentResource> {
    vec![
        DocumentResource::new("lib", "book"),
        DocumentResource::new("lib", "author"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let node = Arc::new(NodeManager::new(&cli.data_dir));
    node.start()?;

    let ctx = AppContext::new(Arc::clone(&node));
    let app = server::build_router(ctx, resources(), &cli.server_config())?;

    let addr = SocketAddr::new(cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal(cli.grace_period()))
        .await?;

    tokio::task::spawn_blocking(move || node.stop()).await??;
    tracing::info!("halted");
    Ok(())
}
