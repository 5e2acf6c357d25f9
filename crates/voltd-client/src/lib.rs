//! Client library for the voltd power management daemon
//!
//! The daemon manages a battery power module (charge state, real-time
//! clock, tap button) and speaks a textual protocol over a Unix domain
//! socket or TCP. This crate opens two independent connections: one for
//! synchronous request/response commands and, optionally, one the daemon
//! pushes tap-button notifications onto.
//!
//! ```no_run
//! use voltd_client::{TapEvent, VoltdClient};
//!
//! # async fn demo() -> voltd_client::Result<()> {
//! let client = VoltdClient::connect().await?;
//!
//! client.register_tap_handler(TapEvent::Double, || {
//!     println!("double tap");
//! })?;
//!
//! let level = client.battery_level().await?;
//! println!("battery at {level}%");
//!
//! client.set_battery_charging_range(60.0, 80.0).await?;
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Command exchanges are serialized internally, so one client can be shared
//! across tasks behind an `Arc`. The event listener never gives up on a bad
//! connection; it logs and retries until [`VoltdClient::shutdown`].

mod client;
mod command;
mod config;
mod events;

pub use client::VoltdClient;
pub use command::CommandClient;
pub use config::{ClientConfig, Endpoint};
pub use events::TapHandler;

// Re-exports from voltd-protocol for convenience
pub use voltd_protocol::{Error, FieldValue, ParserKind, Result, TapEvent};
