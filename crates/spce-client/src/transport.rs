//! Transport implementations for the SPCe link.
//!
//! A transport owns exactly one connection and guarantees that each
//! request/response exchange is atomic with respect to other callers:
//! the write, the mandatory inter-command delay, and the response read
//! all happen under one exclusive lock. Concurrent callers queue on the
//! lock; nothing is reordered and an in-flight exchange cannot be
//! cancelled.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Timing invariants of the shared link.
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Minimum spacing between consecutive exchanges. The instrument
    /// drops commands that arrive faster than this; the sleep is
    /// unconditional, not an optimization.
    pub command_gap: Duration,
    /// How long to wait for a response line before giving up.
    pub read_timeout: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        LinkTiming {
            command_gap: Duration::from_millis(120),
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// A serialized request/response channel to the instrument.
pub trait Transport: Send + Sync {
    /// Perform one atomic exchange: write `frame`, hold the mandatory
    /// inter-command gap, and read a `\r`-terminated response if one is
    /// expected.
    fn exchange(&self, frame: &str, expect_response: bool) -> ClientResult<Option<String>>;
}

/// Map an I/O failure during an exchange to a client error.
fn map_io_error(e: io::Error) -> ClientError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => ClientError::Timeout,
        _ => ClientError::Connection(e.to_string()),
    }
}

/// Read bytes until the `\r` terminator, returning the line without it.
fn read_line<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "connection closed"));
        }
        if byte[0] == b'\r' {
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
        line.push(byte[0]);
    }
}

/// The write/delay/read sequence shared by the real transports. Must be
/// called with the connection lock held.
fn locked_exchange<S: Read + Write>(
    stream: &mut S,
    frame: &str,
    timing: LinkTiming,
    expect_response: bool,
) -> ClientResult<Option<String>> {
    debug!(frame = frame.trim_end(), "sending frame");
    stream.write_all(frame.as_bytes()).map_err(map_io_error)?;
    thread::sleep(timing.command_gap);
    if !expect_response {
        return Ok(None);
    }
    let line = read_line(stream).map_err(map_io_error)?;
    debug!(response = line.as_str(), "received response");
    Ok(Some(line))
}

// ============================================================================
// TCP
// ============================================================================

/// Transport over the controller's TCP serial bridge.
pub struct TcpTransport {
    host: String,
    port: u16,
    timing: LinkTiming,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    /// Create an unconnected TCP transport.
    pub fn new(host: impl Into<String>, port: u16, timing: LinkTiming) -> Self {
        TcpTransport {
            host: host.into(),
            port,
            timing,
            stream: Mutex::new(None),
        }
    }

    /// Establish the connection and drain any stale bytes left in the
    /// socket from a previous session.
    pub fn connect(&self) -> ClientResult<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        stream
            .set_read_timeout(Some(self.timing.read_timeout))
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        drain_stale_bytes(&stream);
        info!(host = self.host.as_str(), port = self.port, "connected to instrument");
        *self.stream.lock() = Some(stream);
        Ok(())
    }

    /// Tear down the connection. Subsequent exchanges fail fast.
    pub fn disconnect(&self) {
        if let Some(stream) = self.stream.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(host = self.host.as_str(), port = self.port, "disconnected from instrument");
        }
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }
}

/// Discard whatever is already buffered on the socket so the first
/// exchange does not pair with a leftover response.
fn drain_stale_bytes(stream: &TcpStream) {
    if stream.set_nonblocking(true).is_err() {
        return;
    }
    let mut reader = stream;
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => continue,
        }
    }
    let _ = stream.set_nonblocking(false);
}

impl Transport for TcpTransport {
    fn exchange(&self, frame: &str, expect_response: bool) -> ClientResult<Option<String>> {
        let mut guard = self.stream.lock();
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;
        locked_exchange(stream, frame, self.timing, expect_response)
    }
}

// ============================================================================
// Serial
// ============================================================================

/// Line settings for a physical serial connection.
#[derive(Debug, Clone, Copy)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            baud_rate: 115_200,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
        }
    }
}

/// Transport over a physical serial line.
pub struct SerialTransport {
    path: String,
    settings: SerialSettings,
    timing: LinkTiming,
    port: Mutex<Option<Box<dyn SerialPort>>>,
}

impl SerialTransport {
    /// Create an unconnected serial transport.
    pub fn new(path: impl Into<String>, settings: SerialSettings, timing: LinkTiming) -> Self {
        SerialTransport {
            path: path.into(),
            settings,
            timing,
            port: Mutex::new(None),
        }
    }

    /// Open the serial port.
    pub fn connect(&self) -> ClientResult<()> {
        let port = serialport::new(&self.path, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .parity(self.settings.parity)
            .stop_bits(self.settings.stop_bits)
            .timeout(self.timing.read_timeout)
            .open()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        info!(
            path = self.path.as_str(),
            baud = self.settings.baud_rate,
            "opened serial port"
        );
        *self.port.lock() = Some(port);
        Ok(())
    }

    /// Close the serial port. Subsequent exchanges fail fast.
    pub fn disconnect(&self) {
        if self.port.lock().take().is_some() {
            info!(path = self.path.as_str(), "closed serial port");
        }
    }

    /// Whether the port is currently open.
    pub fn is_connected(&self) -> bool {
        self.port.lock().is_some()
    }
}

impl Transport for SerialTransport {
    fn exchange(&self, frame: &str, expect_response: bool) -> ClientResult<Option<String>> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(ClientError::NotConnected)?;
        locked_exchange(port, frame, self.timing, expect_response)
    }
}

// ============================================================================
// Simulated
// ============================================================================

/// Responder closure routing frames to an in-process test double.
pub type Responder = Box<dyn FnMut(&str) -> Option<String> + Send>;

/// Transport that short-circuits I/O for testing.
///
/// Outgoing frames are logged and the mandatory inter-command gap is
/// still honored, so timing-dependent callers behave as they would
/// against hardware. With a responder installed the frame is routed to
/// the in-process instrument double; without one the exchange completes
/// with no payload.
pub struct SimulatedTransport {
    timing: LinkTiming,
    responder: Mutex<Option<Responder>>,
}

impl SimulatedTransport {
    /// Create a simulated transport that answers nothing.
    pub fn new(timing: LinkTiming) -> Self {
        SimulatedTransport {
            timing,
            responder: Mutex::new(None),
        }
    }

    /// Create a simulated transport routing frames through `responder`.
    pub fn with_responder(
        timing: LinkTiming,
        responder: impl FnMut(&str) -> Option<String> + Send + 'static,
    ) -> Self {
        SimulatedTransport {
            timing,
            responder: Mutex::new(Some(Box::new(responder))),
        }
    }
}

impl Transport for SimulatedTransport {
    fn exchange(&self, frame: &str, expect_response: bool) -> ClientResult<Option<String>> {
        let mut guard = self.responder.lock();
        info!(frame = frame.trim_end(), "simulated send");
        thread::sleep(self.timing.command_gap);
        if !expect_response {
            return Ok(None);
        }
        match guard.as_mut() {
            Some(responder) => Ok(responder(frame)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn fast_timing() -> LinkTiming {
        LinkTiming {
            command_gap: Duration::from_millis(20),
            read_timeout: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_unconnected_tcp_fails_fast() {
        let transport = TcpTransport::new("127.0.0.1", 1, fast_timing());
        let err = transport.exchange("~ 01 02 23\r", true).unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[test]
    fn test_unconnected_serial_fails_fast() {
        let transport =
            SerialTransport::new("/dev/null", SerialSettings::default(), fast_timing());
        let err = transport.exchange("~ 01 02 23\r", true).unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[test]
    fn test_simulated_exchange_honors_command_gap() {
        let timing = fast_timing();
        let transport = SimulatedTransport::new(timing);
        let start = Instant::now();
        let response = transport.exchange("~ 01 02 23\r", true).unwrap();
        assert!(start.elapsed() >= timing.command_gap);
        assert!(response.is_none());
    }

    #[test]
    fn test_simulated_responder_sees_each_frame() {
        let transport = SimulatedTransport::with_responder(fast_timing(), |frame| {
            Some(format!("echo {frame}"))
        });
        let response = transport.exchange("~ 01 0A 2B\r", true).unwrap();
        assert_eq!(response.as_deref(), Some("echo ~ 01 0A 2B\r"));
    }

    #[test]
    fn test_concurrent_exchanges_never_interleave() {
        // Each responder call happens inside the transport lock; with
        // two threads the total wall time must cover both command gaps
        // back to back.
        let timing = fast_timing();
        let transport = Arc::new(SimulatedTransport::with_responder(timing, |_| {
            Some("ok".to_string())
        }));

        let start = Instant::now();
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let transport = Arc::clone(&transport);
                std::thread::spawn(move || transport.exchange("~ 01 0A 2B\r", true).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert!(start.elapsed() >= timing.command_gap * 2);
    }
}
