//! # rtcm-relay
//!
//! Relay for an RTCM 3 correction stream: one upstream source, any number of
//! downstream TCP subscribers.
//!
//! The relay keeps a single upstream connection, reassembles complete frames
//! from the raw byte stream, checks each frame's CRC-24Q and forwards the
//! validated bytes unchanged to every registered subscriber. A slow or dead
//! subscriber never holds up the upstream loop or the other subscribers.
//!
//! ```text
//!  upstream ──► FrameBuffer ──► Frame ──► Broadcaster ──┬─► Subscriber ──► TCP
//!  (bytes)      (resync, CRC)             (fan-out)     ├─► Subscriber ──► TCP
//!                                                       └─► Subscriber ──► TCP
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use rtcm_relay::{Relay, RelayConfig};
//!
//! # async fn example() -> rtcm_relay::Result<()> {
//! let config = RelayConfig::new("192.168.59.22:8855")
//!     .write_timeout(Duration::from_secs(2))
//!     .reap_interval(Duration::from_secs(30));
//!
//! let relay = Relay::new(config)?;
//! relay
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{crc24q, Frame, FrameBuffer};
pub use registry::{
    BroadcastError, Broadcaster, RegistryConfig, RegistryError, SendError, Subscriber,
};
pub use server::{Relay, RelayConfig};
pub use stats::{FrameStats, RelayStats};
