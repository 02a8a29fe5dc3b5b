//! Subscriber registry and broadcaster
//!
//! The central registry that holds every downstream subscriber and fans each
//! validated frame out to all of them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use super::config::RegistryConfig;
use super::error::{BroadcastError, RegistryError, SendError};
use super::subscriber::Subscriber;
use crate::protocol::Frame;

struct Inner<W> {
    subscribers: Vec<Arc<Subscriber<W>>>,
    closed: bool,
}

/// Registry of downstream subscribers
///
/// Thread-safe via `RwLock`. Registration, reaping and shutdown take the
/// write lock; a broadcast only holds the read lock long enough to snapshot
/// the subscriber list, then writes to every subscriber concurrently without
/// any registry lock held.
pub struct Broadcaster<W = TcpStream> {
    inner: RwLock<Inner<W>>,

    /// Handle of the periodic reap task, if started
    reaper: Mutex<Option<JoinHandle<()>>>,

    /// Configuration
    config: RegistryConfig,
}

impl<W> Broadcaster<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                subscribers: Vec::new(),
                closed: false,
            }),
            reaper: Mutex::new(None),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a subscriber
    ///
    /// Fails without changing the registry if a subscriber with the same
    /// identity is already present or the registry is closed. The rejected
    /// subscriber is dropped, which closes its transport.
    pub async fn register(&self, subscriber: Subscriber<W>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.closed {
            return Err(RegistryError::Closed);
        }

        if inner
            .subscribers
            .iter()
            .any(|s| s.identity() == subscriber.identity())
        {
            tracing::debug!(peer = %subscriber.identity(), "Duplicate subscriber identity");
            return Err(RegistryError::Duplicate(subscriber.identity().to_string()));
        }

        tracing::info!(
            peer = %subscriber.identity(),
            subscribers = inner.subscribers.len() + 1,
            "Subscriber registered"
        );
        inner.subscribers.push(Arc::new(subscriber));

        Ok(())
    }

    /// Deliver a frame to every registered subscriber
    ///
    /// One write per subscriber runs concurrently; the call returns once all
    /// of them finished or timed out. Returns the number of subscribers that
    /// received the frame, or every individual failure (dead subscribers
    /// included) if there was at least one.
    pub async fn broadcast(&self, frame: &Frame) -> Result<usize, BroadcastError> {
        let subscribers = self.inner.read().await.subscribers.clone();
        if subscribers.is_empty() {
            return Ok(0);
        }

        let attempted = subscribers.len();
        let mut tasks = JoinSet::new();
        let mut peers = HashMap::with_capacity(attempted);
        for subscriber in subscribers {
            let data = frame.as_bytes().clone();
            let peer = subscriber.identity().to_string();
            let handle = tasks.spawn(async move { subscriber.send(&data).await });
            peers.insert(handle.id(), peer);
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                // Delivery task panicked or was cancelled
                Err(e) => failures.push(SendError::Io {
                    peer: peers.remove(&e.id()).unwrap_or_default(),
                    kind: std::io::ErrorKind::Other,
                    message: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(attempted)
        } else {
            Err(BroadcastError {
                attempted,
                failures,
            })
        }
    }

    /// Remove every dead subscriber
    ///
    /// Their transports were already closed when they failed. Returns the
    /// number of subscribers removed.
    pub async fn reap(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.subscribers.len();

        inner.subscribers.retain(|subscriber| {
            let dead = subscriber.is_dead();
            if dead {
                tracing::info!(peer = %subscriber.identity(), "Subscriber reaped");
            }
            !dead
        });

        let removed = before - inner.subscribers.len();
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = inner.subscribers.len(),
                "Reap complete"
            );
        }
        removed
    }

    /// Spawn the periodic reap task
    ///
    /// The first reap runs one interval from now. Calling this again
    /// replaces the previous task. The task stops on [`close`](Self::close)
    /// or once the registry is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) {
        let registry: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.reap_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match registry.upgrade() {
                    Some(registry) => {
                        registry.reap().await;
                    }
                    None => break,
                }
            }
        });

        if let Some(previous) = self.lock_reaper().replace(handle) {
            previous.abort();
        }
    }

    /// Stop reaping and close every subscriber
    ///
    /// Every transport is closed regardless of subscriber state. The
    /// registry rejects registrations afterwards and broadcasts reach nobody.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;

        let reaper = self.lock_reaper().take();
        if let Some(reaper) = reaper {
            reaper.abort();
        }

        for subscriber in inner.subscribers.drain(..) {
            subscriber.close().await;
        }
        inner.closed = true;

        tracing::info!("Registry closed");
    }

    /// Number of registered subscribers (dead ones included until reaped)
    pub async fn len(&self) -> usize {
        self.inner.read().await.subscribers.len()
    }

    /// Check if no subscribers are registered
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.subscribers.is_empty()
    }

    /// Identities of registered subscribers, in registration order
    pub async fn identities(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .subscribers
            .iter()
            .map(|s| s.identity().to_string())
            .collect()
    }

    /// Check if the registry has been closed
    pub async fn is_closed(&self) -> bool {
        self.inner.read().await.closed
    }

    fn lock_reaper(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guarded value is a plain handle, so a poisoned lock is still usable
        self.reaper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W> Default for Broadcaster<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Drop for Broadcaster<W> {
    fn drop(&mut self) {
        if let Ok(mut reaper) = self.reaper.lock() {
            if let Some(handle) = reaper.take() {
                handle.abort();
            }
        }
    }
}
