//! SPCe Instrument Simulator
//!
//! A stand-in for a Gamma Vacuum SPCe ion pump controller, used to test
//! the client and monitor without hardware. [`SimulatedPump`] models the
//! device itself and answers raw request frames; [`serve`] exposes a
//! pump over TCP with the same half-duplex line discipline as the real
//! serial bridge.

mod device;
mod server;

pub use device::*;
pub use server::*;
