use std::path::PathBuf;

use clap::Parser;

use evaluation::api::{self, ApiState};
use evaluation::config::Config;
use evaluation::server::{HttpServer, Shutdown};

/// Evaluation component HTTP server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and EVAL_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen backlog (overrides config and EVAL_BACKLOG)
    #[arg(short, long)]
    backlog: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(backlog) = args.backlog {
        cfg.backlog = backlog;
    }
    cfg.validate()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.log_level()?)
        .init();

    let (notify_shutdown, shutdown) = Shutdown::channel();

    // `notify_shutdown` stays alive in main so a failed signal listener
    // does not close the channel
    let signal_tx = notify_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Unable to listen for shutdown signal");
            return;
        }
        tracing::info!("Ctrl-C received, shutting down");
        let _ = signal_tx.send(());
    });

    let mut server = HttpServer::new(&cfg, api::router(ApiState::from_config(&cfg)));
    let result = server.run(shutdown).await;
    drop(notify_shutdown);
    result
}
