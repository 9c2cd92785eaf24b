mod bootstrap;
mod branding;
mod cli;
mod config;
mod context;
mod deeplink;
mod feed;
mod gate;
mod present;
mod session_store;
mod share;
mod throttle;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kvitto=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    if let Err(err) = cli::run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
