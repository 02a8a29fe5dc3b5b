//! Error types for the relay

use std::io;

use crate::registry::RegistryError;

/// Result type alias using the relay error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level relay error
#[derive(Debug)]
pub enum Error {
    /// Socket or listener failure
    Io(io::Error),
    /// Subscriber registry failure
    Registry(RegistryError),
    /// Invalid configuration
    Config(String),
    /// Could not connect to the upstream source
    Upstream {
        /// Upstream address as configured
        addr: String,
        /// Underlying connect error
        source: io::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Upstream { addr, source } => {
                write!(f, "Unable to connect to upstream {}: {}", addr, source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Config(_) => None,
            Error::Upstream { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
