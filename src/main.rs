use std::sync::Arc;

use clap::Parser;
use repomigrate::cli::{self, Args};
use repomigrate::pipeline;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(args.log_level);

    let config = cli::load_config(&args.config)?;
    info!(
        mode = ?args.mode,
        dry_run = args.dry_run,
        "Migrating from {} to {}",
        config.source.host,
        config.destination.host
    );

    pipeline::run(args.mode, Arc::new(config), args.dry_run).await
}
