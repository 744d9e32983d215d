//! Frame encoding/decoding for the SPCe serial protocol.
//!
//! Every message is a single ASCII line terminated with a carriage
//! return. Requests carry a leading `~` attention marker; responses do
//! not. Both directions end with an additive 8-bit checksum rendered as
//! two uppercase hex digits:
//!
//! ```text
//! request:   ~ {BA:02X} {CC:02X} [DATA ]{CKS:02X}\r
//! response:    {BA:02X} OK 00 {DATA} {CKS:02X}\r
//! response:    {BA:02X} ER {CODE:02X} {CKS:02X}\r
//! ```
//!
//! The checksum spans every character strictly between the attention
//! marker (request) or the start of the line (response) and the checksum
//! field itself; the spaces on both ends of that span are part of it.

use crate::error::{ProtocolError, ProtocolResult};

/// Attention marker that opens every request frame.
pub const ATTENTION: char = '~';

/// Line terminator for both directions.
pub const TERMINATOR: char = '\r';

/// Compute the additive checksum over a frame body.
///
/// The protocol is pure ASCII, so the sum of code points modulo 256 is
/// the wrapping sum of the bytes.
pub fn checksum(span: &str) -> u8 {
    span.bytes().fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// Build a request frame.
///
/// The body is ` {BA:02X} {CC:02X} ` with each data token followed by a
/// trailing space; the checksum is computed over exactly that substring.
pub fn encode_request(bus_address: u8, code: u8, data: Option<&str>) -> String {
    let mut body = format!(" {:02X} {:02X} ", bus_address, code);
    if let Some(data) = data {
        body.push_str(data);
        body.push(' ');
    }
    format!("{}{}{:02X}{}", ATTENTION, body, checksum(&body), TERMINATOR)
}

/// Build a success response frame around a data payload.
pub fn encode_response(bus_address: u8, data: &str) -> String {
    let body = format!(" {:02X} OK 00 {} ", bus_address, data);
    format!("{}{:02X}{}", body, checksum(&body), TERMINATOR)
}

/// Build an error response frame carrying a status code.
pub fn encode_error_response(bus_address: u8, code: u8) -> String {
    let body = format!(" {:02X} ER {:02X} ", bus_address, code);
    format!("{}{:02X}{}", body, checksum(&body), TERMINATOR)
}

/// A decoded request frame, as seen by the instrument side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Bus address the request is directed at.
    pub bus_address: u8,
    /// Command code.
    pub code: u8,
    /// Data payload, if the request carried one.
    pub data: Option<String>,
}

impl RequestFrame {
    /// Parse a raw request line.
    ///
    /// Requires the attention marker and at least three whitespace
    /// tokens after it (bus address, command code, checksum); everything
    /// between the command code and the final token is data. The request
    /// checksum is not re-verified here.
    pub fn parse(raw: &str) -> ProtocolResult<RequestFrame> {
        let line = raw.trim();
        let body = line
            .strip_prefix(ATTENTION)
            .ok_or_else(|| ProtocolError::Parse(format!("missing attention marker: {line:?}")))?;

        let tokens: Vec<&str> = body.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(ProtocolError::Parse(format!("incomplete request: {line:?}")));
        }

        let bus_address = u8::from_str_radix(tokens[0], 16)
            .map_err(|_| ProtocolError::Parse(format!("bad bus address: {:?}", tokens[0])))?;
        let code = u8::from_str_radix(tokens[1], 16)
            .map_err(|_| ProtocolError::Parse(format!("bad command code: {:?}", tokens[1])))?;

        let data = if tokens.len() > 3 {
            Some(tokens[2..tokens.len() - 1].join(" "))
        } else {
            None
        };

        Ok(RequestFrame { bus_address, code, data })
    }
}

/// Status field of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `OK 00`: the command was accepted.
    Ok,
    /// `ER {code}`: the instrument rejected the command.
    Error(u8),
}

/// A decoded and checksum-verified response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Bus address of the responding instrument.
    pub bus_address: u8,
    /// Success or error status.
    pub status: ResponseStatus,
    /// Data payload (empty for error responses).
    pub payload: String,
}

impl ResponseFrame {
    /// Parse a raw response line and verify its integrity.
    ///
    /// The trailing checksum must match the sum over everything before
    /// it, and the bus address must match `expected_bus`; either
    /// mismatch rejects the response before any value extraction.
    pub fn parse(raw: &str, expected_bus: u8) -> ProtocolResult<ResponseFrame> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if !line.is_ascii() || line.len() < 8 {
            return Err(ProtocolError::Parse(format!("truncated response: {line:?}")));
        }

        let (span, cks_field) = line.split_at(line.len() - 2);
        let actual = u8::from_str_radix(cks_field, 16)
            .map_err(|_| ProtocolError::Parse(format!("bad checksum field: {cks_field:?}")))?;
        let expected = checksum(span);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let rest = span.strip_prefix(' ').unwrap_or(span);
        let (ba_field, rest) = rest
            .split_once(' ')
            .ok_or_else(|| ProtocolError::Parse(format!("missing status field: {line:?}")))?;
        let bus_address = u8::from_str_radix(ba_field, 16)
            .map_err(|_| ProtocolError::Parse(format!("bad bus address: {ba_field:?}")))?;
        if bus_address != expected_bus {
            return Err(ProtocolError::AddressMismatch {
                expected: expected_bus,
                actual: bus_address,
            });
        }

        let (status_field, rest) = rest
            .split_once(' ')
            .ok_or_else(|| ProtocolError::Parse(format!("missing status code: {line:?}")))?;
        match status_field {
            "OK" => {
                // The status code after OK is always 00; the payload is
                // everything between it and the checksum field.
                let (_, payload) = rest.split_once(' ').unwrap_or((rest, ""));
                Ok(ResponseFrame {
                    bus_address,
                    status: ResponseStatus::Ok,
                    payload: payload.trim().to_string(),
                })
            }
            "ER" => {
                let code_field = rest
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| ProtocolError::Parse(format!("missing error code: {line:?}")))?;
                let code = u8::from_str_radix(code_field, 16)
                    .map_err(|_| ProtocolError::Parse(format!("bad error code: {code_field:?}")))?;
                Ok(ResponseFrame {
                    bus_address,
                    status: ResponseStatus::Error(code),
                    payload: String::new(),
                })
            }
            other => Err(ProtocolError::Parse(format!("unknown status: {other:?}"))),
        }
    }
}
