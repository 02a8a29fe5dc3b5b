//! Relay driver: upstream read loop and subscriber accept loop

pub mod config;
pub mod listener;
pub mod upstream;

pub use config::RelayConfig;
pub use listener::Relay;
pub use upstream::relay_frames;
