//! TCP server: accept loop, graceful shutdown, HTTP sidecar wiring.

use crate::broker::handler::{self, DeliveryMode, MessageRouter};
use crate::config::BrokerConfig;
use crate::http_server::HttpSidecar;
use crate::metrics::BrokerMetrics;
use crate::{RelaymqError, Result};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub struct BrokerServer {
    config: BrokerConfig,
    router: Arc<MessageRouter>,
    // Graceful shutdown coordination
    shutdown_tx: broadcast::Sender<()>,
}

impl BrokerServer {
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate().map_err(RelaymqError::Config)?;

        let mode = DeliveryMode::parse(config.delivery_mode.to_lowercase().as_str());
        let metrics = Arc::new(BrokerMetrics::new());
        let router = Arc::new(MessageRouter::new(
            mode,
            config.queue_capacity,
            config.mailbox_capacity,
            metrics,
        ));
        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            router,
            shutdown_tx,
        })
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn metrics(&self) -> &Arc<BrokerMetrics> {
        self.router.metrics()
    }

    /// Initiate graceful shutdown: the accept loop stops, the delivery
    /// backend closes, and in-flight handlers observe closed channels.
    pub fn shutdown(&self) {
        info!("initiating graceful shutdown");
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            delivery_mode = %self.router.mode(),
            "broker listening"
        );
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener (lets tests bind port 0).
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Some(http_port) = self.config.http_port {
            let sidecar = HttpSidecar::new(Arc::clone(self.router.metrics()), http_port);
            let mut http_shutdown_rx = self.shutdown_tx.subscribe();
            tokio::spawn(async move {
                let shutdown = async move {
                    let _ = http_shutdown_rx.recv().await;
                };
                if let Err(e) = sidecar.run(shutdown).await {
                    error!("health HTTP server error: {}", e);
                }
            });
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            if let Err(e) = Self::optimize_client_socket(&stream) {
                                warn!("failed to tune client socket {}: {}", peer_addr, e);
                            }

                            let router = Arc::clone(&self.router);
                            let metrics = Arc::clone(self.router.metrics());
                            metrics.connection_opened();
                            info!("accepted connection from {}", peer_addr);

                            tokio::spawn(async move {
                                handler::handle_connection(stream, router).await;
                                metrics.connection_closed();
                                info!("client {} disconnected", peer_addr);
                            });
                        }
                        Err(e) => {
                            error!("failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("received shutdown signal, stopping accept loop");
                    break;
                }
            }
        }

        // Closing the delivery backend wakes the in-flight consumer loops,
        // which then drop their connections.
        self.router.close();
        info!("broker shutdown complete");
        Ok(())
    }

    /// Disable Nagle and enable keepalive on accepted client sockets.
    fn optimize_client_socket(stream: &TcpStream) -> Result<()> {
        use socket2::SockRef;

        let socket_ref = SockRef::from(stream);
        socket_ref.set_tcp_nodelay(true)?;
        socket_ref.set_keepalive(true)?;
        Ok(())
    }
}
