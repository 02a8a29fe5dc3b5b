//! Registry error types
//!
//! Error types for subscriber registration and frame delivery.

use std::io;
use std::time::Duration;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A subscriber with the same identity is already registered
    Duplicate(String),
    /// The registry has been closed
    Closed,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Duplicate(peer) => write!(f, "Subscriber already registered: {}", peer),
            RegistryError::Closed => write!(f, "Registry closed"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failure to deliver one frame to one subscriber
///
/// `Clone` so that a dead subscriber can hand back the same error on every
/// later attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The write did not complete within the write timeout; the subscriber stays active
    Timeout {
        /// Subscriber identity
        peer: String,
        /// Configured write timeout
        timeout: Duration,
    },
    /// The transport failed; the subscriber is dead
    Io {
        /// Subscriber identity
        peer: String,
        /// Kind of the underlying I/O error
        kind: io::ErrorKind,
        /// Message of the underlying I/O error
        message: String,
    },
    /// The subscriber was closed by the registry
    Closed {
        /// Subscriber identity
        peer: String,
    },
}

impl SendError {
    pub(crate) fn io(peer: &str, err: &io::Error) -> Self {
        SendError::Io {
            peer: peer.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Check if this is a retryable timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::Timeout { .. })
    }

    /// Identity of the subscriber the error belongs to
    pub fn peer(&self) -> &str {
        match self {
            SendError::Timeout { peer, .. }
            | SendError::Io { peer, .. }
            | SendError::Closed { peer } => peer,
        }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Timeout { peer, timeout } => {
                write!(f, "{}: write timed out after {:?}", peer, timeout)
            }
            SendError::Io { peer, message, .. } => write!(f, "{}: {}", peer, message),
            SendError::Closed { peer } => write!(f, "{}: subscriber closed", peer),
        }
    }
}

impl std::error::Error for SendError {}

/// Every failure from a single broadcast
#[derive(Debug, Clone)]
pub struct BroadcastError {
    /// Subscribers the frame was handed to
    pub attempted: usize,
    /// One entry per subscriber that did not receive the frame
    pub failures: Vec<SendError>,
}

impl BroadcastError {
    /// Number of subscribers that received the frame
    pub fn delivered(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// Failures that were timeouts
    pub fn timeouts(&self) -> impl Iterator<Item = &SendError> {
        self.failures.iter().filter(|e| e.is_timeout())
    }
}

impl std::fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} subscribers failed: ",
            self.failures.len(),
            self.attempted
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for BroadcastError {}
