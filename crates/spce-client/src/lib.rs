//! SPCe Controller Client
//!
//! This crate owns the connection to an SPCe ion pump controller and
//! exposes it through a typed command surface. It has two layers:
//!
//! - [`Transport`] owns the physical connection (TCP socket or serial
//!   port) and serializes request/response exchanges behind a single
//!   lock, enforcing the instrument's minimum inter-command spacing.
//!   Three implementations: [`TcpTransport`], [`SerialTransport`], and
//!   [`SimulatedTransport`] for testing without hardware.
//! - [`SpceController`] composes the frame codec, a transport, and
//!   response-value extraction into one method per instrument
//!   operation, validating arguments before any I/O happens.
//!
//! # Example
//!
//! ```rust,ignore
//! use spce_client::{LinkTiming, SpceController, TcpTransport};
//!
//! let transport = TcpTransport::new("10.0.0.40", 4001, LinkTiming::default());
//! transport.connect()?;
//! let controller = SpceController::new(0x05, Box::new(transport));
//! let pressure = controller.read_pressure()?;
//! ```

mod controller;
mod error;
mod transport;

pub use controller::*;
pub use error::*;
pub use transport::*;
