//! Downstream subscriber
//!
//! A subscriber wraps one downstream connection. Every send is bounded by the
//! write timeout. A timeout leaves the subscriber usable for the next frame;
//! any other write failure closes the transport and latches the error, after
//! which every send returns that error without touching the transport.
//!
//! ```text
//!   Active ──send ok / timeout──► Active
//!     │
//!     └──────write error────────► Dead(error) ──reap──► removed
//! ```
//!
//! Closing is signalled before the state lock is taken, so a send stalled
//! on a peer that stopped reading is abandoned instead of holding up the close.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use super::error::SendError;

/// Subscriber lifecycle state
#[derive(Debug)]
pub enum SubscriberState<W> {
    /// Transport open, frames are written to it
    Active(W),
    /// Transport closed after a hard failure; the error is returned on every send
    Dead(SendError),
}

impl<W> SubscriberState<W> {
    /// Check if the subscriber is dead
    pub fn is_dead(&self) -> bool {
        matches!(self, SubscriberState::Dead(_))
    }
}

/// One downstream peer receiving the relayed stream
pub struct Subscriber<W = TcpStream> {
    identity: String,
    write_timeout: Duration,
    state: Mutex<SubscriberState<W>>,
    closing: watch::Sender<bool>,
}

impl Subscriber<TcpStream> {
    /// Wrap an accepted TCP connection
    pub fn from_tcp(stream: TcpStream, peer_addr: SocketAddr, write_timeout: Duration) -> Self {
        Self::new(peer_addr.to_string(), stream, write_timeout)
    }
}

impl<W> Subscriber<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a subscriber writing to `writer`
    ///
    /// `identity` is used for duplicate detection and logging. A zero
    /// `write_timeout` disables the write deadline.
    pub fn new(identity: impl Into<String>, writer: W, write_timeout: Duration) -> Self {
        Self {
            identity: identity.into(),
            write_timeout,
            state: Mutex::new(SubscriberState::Active(writer)),
            closing: watch::Sender::new(false),
        }
    }

    /// Identity of the peer (its remote address for TCP subscribers)
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Configured write timeout
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Write one frame to the peer
    ///
    /// Returns [`SendError::Closed`] without finishing the write if
    /// [`close`](Self::close) is called while the write is in flight.
    pub async fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        let mut closing = self.closing.subscribe();
        let mut state = self.state.lock().await;

        let writer = match &mut *state {
            SubscriberState::Dead(err) => return Err(err.clone()),
            SubscriberState::Active(writer) => writer,
        };

        let write = async {
            if self.write_timeout.is_zero() {
                write_frame(writer, frame).await
            } else {
                match tokio::time::timeout(self.write_timeout, write_frame(writer, frame)).await {
                    Ok(result) => result,
                    Err(_) => Err(io::ErrorKind::TimedOut.into()),
                }
            }
        };

        let result = tokio::select! {
            result = write => result,
            () = closed(&mut closing) => {
                tracing::debug!(peer = %self.identity, "Subscriber write abandoned on close");
                return Err(SendError::Closed {
                    peer: self.identity.clone(),
                });
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                tracing::debug!(peer = %self.identity, "Subscriber write timed out");
                Err(SendError::Timeout {
                    peer: self.identity.clone(),
                    timeout: self.write_timeout,
                })
            }
            Err(e) => {
                let err = SendError::io(&self.identity, &e);
                // Replacing the state drops the writer, closing the transport
                *state = SubscriberState::Dead(err.clone());
                tracing::info!(peer = %self.identity, error = %e, "Subscriber failed");
                Err(err)
            }
        }
    }

    /// Close the transport unconditionally
    ///
    /// An in-flight send is abandoned first, so this never waits on a
    /// stalled peer. A dead subscriber keeps its original error.
    pub async fn close(&self) {
        self.closing.send_replace(true);

        let mut state = self.state.lock().await;
        if let SubscriberState::Active(writer) = &mut *state {
            let _ = writer.shutdown().await;
            *state = SubscriberState::Dead(SendError::Closed {
                peer: self.identity.clone(),
            });
        }
    }

    /// Check if the subscriber has latched a failure
    ///
    /// A subscriber with a send in flight is reported alive; it is picked up
    /// by a later check once the send completes.
    pub fn is_dead(&self) -> bool {
        self.state
            .try_lock()
            .map(|state| state.is_dead())
            .unwrap_or(false)
    }
}

/// Resolves once the subscriber is being closed
async fn closed(closing: &mut watch::Receiver<bool>) {
    loop {
        let closed = *closing.borrow_and_update();
        if closed {
            return;
        }
        if closing.changed().await.is_err() {
            // Sender lives as long as the subscriber
            std::future::pending::<()>().await;
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

impl<W> std::fmt::Debug for Subscriber<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("identity", &self.identity)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}
