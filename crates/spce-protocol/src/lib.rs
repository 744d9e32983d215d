//! SPCe Pump Controller Wire Protocol
//!
//! This crate provides types and utilities for talking to a Gamma Vacuum
//! SPCe ion pump controller over its half-duplex command/response link
//! (RS-232/RS-485 or the controller's TCP bridge). It contains no I/O:
//! frame construction, checksum computation, the command catalog with its
//! argument validators, and tolerant response-value extraction are all
//! pure functions, so the same code serves both the host side and the
//! instrument simulator.
//!
//! # Protocol Overview
//!
//! Requests are single ASCII lines terminated with `\r`:
//!
//! - **Request** (host to instrument): `~ {BA} {CC} [DATA ]{CKS}\r`:
//!   attention marker, 2-hex-digit bus address, 2-hex-digit command code,
//!   optional data token(s), 2-hex-digit checksum.
//! - **Response** (instrument to host): ` {BA} OK 00 {DATA} {CKS}\r` on
//!   success, ` {BA} ER {CODE} {CKS}\r` on error. No attention marker.
//! - **Checksum**: sum of the ASCII code points of every character
//!   between the attention marker (or line start, on the response side)
//!   and the checksum field, modulo 256, as two uppercase hex digits.
//!
//! # Example
//!
//! ```rust
//! use spce_protocol::Command;
//!
//! // Build a request frame for "read firmware version" on bus address 1.
//! let frame = Command::ReadVersion.encode(0x01).unwrap();
//! assert_eq!(frame, "~ 01 02 23\r");
//! ```

mod commands;
mod error;
mod extract;
mod frame;

pub use commands::*;
pub use error::*;
pub use extract::*;
pub use frame::*;
