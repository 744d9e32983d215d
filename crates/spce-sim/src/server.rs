//! TCP front end for the simulated pump.
//!
//! Mirrors the serial-to-ethernet bridge the real controller sits
//! behind: one client at a time, `\r`-terminated frames, one response
//! per request.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};

use tracing::{info, warn};

use crate::device::SimulatedPump;

/// Accept connections and serve the pump until the listener fails.
///
/// Sessions run one at a time on the calling thread; the instrument
/// link is half duplex and a second client would interleave frames.
pub fn serve(listener: TcpListener, mut pump: SimulatedPump) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, bus_address = pump.bus_address(), "simulator listening");
    loop {
        let (stream, peer) = listener.accept()?;
        info!(%peer, "client connected");
        if let Err(e) = session(stream, &mut pump) {
            warn!(%peer, error = %e, "session ended with error");
        } else {
            info!(%peer, "client disconnected");
        }
    }
}

/// Serve one client connection until it closes.
fn session(mut stream: TcpStream, pump: &mut SimulatedPump) -> io::Result<()> {
    loop {
        let request = match read_frame(&mut stream) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e),
        };
        if let Some(response) = pump.handle_request(&request) {
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
    }
}

/// Read one `\r`-terminated frame, or `None` on a clean disconnect.
fn read_frame(stream: &mut TcpStream) -> io::Result<Option<String>> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => {
                if frame.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                ));
            }
            Ok(_) => {
                if byte[0] == b'\r' {
                    return Ok(Some(String::from_utf8_lossy(&frame).into_owned()));
                }
                frame.push(byte[0]);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Bind an ephemeral port, serve a pump on a background thread, and
    /// return the port.
    fn spawn_simulator(pump: SimulatedPump) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || serve(listener, pump));
        port
    }

    #[test]
    fn test_serves_frames_over_tcp() {
        let port = spawn_simulator(SimulatedPump::new(0x05).with_fixed_readings(
            7000.0, 15e-6, 1.5e-6,
        ));
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

        let request = spce_protocol::encode_request(0x05, 0x0C, None);
        stream.write_all(request.as_bytes()).unwrap();
        let response = read_frame(&mut stream).unwrap().unwrap();

        let frame = spce_protocol::ResponseFrame::parse(&response, 0x05).unwrap();
        assert_eq!(frame.payload, "7000.00");
    }

    #[test]
    fn test_survives_client_reconnect() {
        let port = spawn_simulator(SimulatedPump::new(0x05));
        for _ in 0..2 {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            let request = spce_protocol::encode_request(0x05, 0x01, None);
            stream.write_all(request.as_bytes()).unwrap();
            let response = read_frame(&mut stream).unwrap().unwrap();
            assert!(response.contains("MODEL=SPCe-1000"));
        }
    }
}
