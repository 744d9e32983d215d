//! SPCe Pump Monitor
//!
//! Polls an SPCe ion pump controller on a fixed interval, appends each
//! reading to a CSV log, and raises alert events when the emission
//! current crosses multiples of a configured threshold.
//!
//! The poll loop is the sole writer of alert state; everyone else
//! observes it through [`AlertBroadcaster`] subscriptions.

mod alert;
mod broadcast;
mod config;
mod error;
mod log;
mod poll;

pub use alert::*;
pub use broadcast::*;
pub use config::*;
pub use error::*;
pub use log::*;
pub use poll::*;
