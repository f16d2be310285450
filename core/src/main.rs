use clap::Parser;
use relaymq::{BrokerConfig, BrokerServer, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "relaymq")]
#[command(about = "A lightweight TCP message broker with broadcast and queue delivery modes")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, default_value = "9080")]
    port: u16,

    /// Delivery mode: "broadcast" or "queue" (unrecognized values fall back
    /// to broadcast)
    #[arg(short, long, default_value = "broadcast")]
    mode: String,

    /// Queue capacity in queue mode (non-positive uses the default 10000)
    #[arg(long, default_value = "10000")]
    queue_capacity: i64,

    /// Per-consumer mailbox capacity in broadcast mode (non-positive uses
    /// the default 64)
    #[arg(long, default_value = "64")]
    mailbox_capacity: i64,

    /// Port for the health/metrics HTTP server (omit to disable)
    #[arg(long, default_value = "8080")]
    http_port: Option<u16>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .init();

    let config = BrokerConfig {
        host: args.host,
        port: args.port,
        delivery_mode: args.mode.to_lowercase(),
        queue_capacity: args.queue_capacity,
        mailbox_capacity: args.mailbox_capacity,
        http_port: args.http_port,
    };

    info!("starting relaymq broker on {}:{}", config.host, config.port);
    info!("delivery mode: {}", config.delivery_mode);
    if let Some(http_port) = config.http_port {
        info!("health HTTP server port: {}", http_port);
    } else {
        info!("health HTTP server: disabled");
    }

    let server = Arc::new(BrokerServer::new(config)?);

    let server_task = Arc::clone(&server);
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server_task.run().await {
            error!("server error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down gracefully");
            server.shutdown();
            let _ = server_handle.await;
        }
        _ = &mut server_handle => {
            info!("server task completed");
        }
    }

    info!("relaymq shut down successfully");
    Ok(())
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            warn!("invalid log level '{}', defaulting to 'info'", level);
            tracing::Level::INFO
        }
    }
}
