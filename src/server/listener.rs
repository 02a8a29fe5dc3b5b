//! Relay driver
//!
//! Handles the TCP accept loop for subscribers and the upstream connection,
//! and tears both down in order on shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::registry::{Broadcaster, Subscriber};
use crate::server::config::RelayConfig;
use crate::server::upstream::relay_frames;
use crate::stats::{RelayCounters, RelayStats};

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// RTCM relay
pub struct Relay {
    config: RelayConfig,
    broadcaster: Arc<Broadcaster>,
    counters: RelayCounters,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            broadcaster: Arc::new(Broadcaster::with_config(config.registry_config())),
            config,
            counters: RelayCounters::new(),
        })
    }

    /// Get a reference to the subscriber registry
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Snapshot of the relay statistics
    pub async fn stats(&self) -> RelayStats {
        self.counters.snapshot(self.broadcaster.len().await)
    }

    /// Run the relay until the upstream ends
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the relay until the upstream ends or `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Run the relay on an already bound listener
    ///
    /// Subscribers are accepted as soon as this is called, also while the
    /// upstream connection is still being set up. On return the reap task
    /// is stopped and every subscriber connection is closed.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Listening for subscribers");

        self.broadcaster.spawn_reaper();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.relay_upstream() => result,
            result = self.accept_loop(&listener) => result,
        };

        self.broadcaster.close().await;

        let stats = self.stats().await;
        tracing::info!(
            frames = stats.frames_relayed,
            broadcast_failures = stats.broadcast_failures,
            accepted = stats.connections_accepted,
            rejected = stats.connections_rejected,
            uptime_secs = stats.uptime.as_secs(),
            "Terminating"
        );

        result
    }

    async fn relay_upstream(&self) -> Result<()> {
        let mut upstream = TcpStream::connect(self.config.upstream_addr.as_str())
            .await
            .map_err(|source| Error::Upstream {
                addr: self.config.upstream_addr.clone(),
                source,
            })?;

        tracing::info!(addr = %self.config.upstream_addr, "Connected to upstream");

        relay_frames(
            &mut upstream,
            &self.broadcaster,
            self.config.read_buffer_size,
            &self.counters,
        )
        .await;

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::info!(peer = %peer_addr, "Connection from subscriber");

        // Check subscriber limit
        if self.config.max_subscribers > 0
            && self.broadcaster.len().await >= self.config.max_subscribers
        {
            tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
            self.counters.connection_rejected();
            return;
        }

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            self.counters.connection_rejected();
            return;
        }

        let subscriber = Subscriber::from_tcp(socket, peer_addr, self.config.write_timeout);

        // A rejected subscriber is dropped here, closing its connection
        match self.broadcaster.register(subscriber).await {
            Ok(()) => self.counters.connection_accepted(),
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Unable to register subscriber");
                self.counters.connection_rejected();
            }
        }
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_config() {
        let config = RelayConfig::default().reap_interval(Duration::ZERO);
        assert!(matches!(Relay::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_write_timeout_wired_to_registry() {
        let config = RelayConfig::default().write_timeout(Duration::from_millis(750));
        let relay = Relay::new(config).unwrap();

        assert_eq!(
            relay.broadcaster().config().write_timeout,
            Duration::from_millis(750)
        );
        assert_eq!(relay.stats().await.subscribers, 0);
    }

    #[tokio::test]
    async fn test_upstream_connect_failure() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = RelayConfig::new(format!("127.0.0.1:{}", port));
        let relay = Relay::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = relay.serve(listener, std::future::pending()).await;

        assert!(matches!(result, Err(Error::Upstream { .. })));
        assert!(relay.broadcaster().is_closed().await);
    }

    #[tokio::test]
    async fn test_run_binds_listen_addr() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = RelayConfig::new(format!("127.0.0.1:{}", port))
            .listen(SocketAddr::from(([127, 0, 0, 1], 0)));
        let relay = Relay::new(config).unwrap();

        // Listener binds, then the unreachable upstream ends the run
        let result = relay.run().await;

        assert!(matches!(result, Err(Error::Upstream { .. })));
        assert!(relay.broadcaster().is_closed().await);
    }

    #[tokio::test]
    async fn test_run_fails_on_unusable_listen_addr() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = RelayConfig::new("127.0.0.1:1").listen(taken.local_addr().unwrap());
        let relay = Relay::new(config).unwrap();

        assert!(matches!(relay.run().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_shutdown_closes_registry() {
        // Upstream accepts but never sends
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = RelayConfig::new(upstream.local_addr().unwrap().to_string());
        let relay = Relay::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        relay
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();

        assert!(relay.broadcaster().is_closed().await);
    }
}
