//! Subscriber registry and frame fan-out
//!
//! The registry holds every downstream subscriber and delivers each validated
//! frame to all of them concurrently.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<Broadcaster>
//!                  ┌──────────────────────────┐
//!                  │ RwLock<Vec<Arc<          │
//!                  │   Subscriber {           │
//!                  │     Mutex<Active | Dead> │
//!                  │   }>>                    │
//!                  └────────────┬─────────────┘
//!                               │ snapshot (read lock)
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//!    send() task           send() task           send() task
//!    timeout-bounded       timeout-bounded       dead: cached error
//!         │                     │                     │
//!         └──────── JoinSet: wait for all ────────────┘
//!                               │
//!                  Ok(delivered) | BroadcastError
//! ```
//!
//! # Zero-Copy Design
//!
//! A [`Frame`](crate::protocol::Frame) wraps `bytes::Bytes`, so every delivery
//! task shares the same allocation; only the reference count is touched.

pub mod config;
pub mod error;
pub mod store;
pub mod subscriber;

pub use config::RegistryConfig;
pub use error::{BroadcastError, RegistryError, SendError};
pub use store::Broadcaster;
pub use subscriber::{Subscriber, SubscriberState};
