use log::{debug, warn};

use crate::packet::{ETX, PACKET_LEN, STX};
use crate::port::{Connection, Link, TransportError};

/// Device status probe.
pub const OP_STATUS: u8 = 0x01;

/// Responses are full-size frames.
pub const RESPONSE_LEN: usize = PACKET_LEN;

/// The length byte counts the opcode, so at most 254 payload bytes fit.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - 1;

/// `[STX][opcode][len][payload...][ETX]` where `len = 1 + payload.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub opcode: u8,
    pub payload: &'a [u8],
}

impl CommandFrame<'_> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLong(self.payload.len()));
        }
        let mut out = Vec::with_capacity(self.payload.len() + 4);
        out.push(STX);
        out.push(self.opcode);
        out.push(1 + self.payload.len() as u8);
        out.extend_from_slice(self.payload);
        out.push(ETX);
        Ok(out)
    }
}

/// Send one command and, if asked, block for its response frame. Input left
/// over from earlier exchanges is dropped first, so each response starts
/// clean. Transport failures propagate unchanged.
pub fn send_command<L: Link>(
    conn: &mut Connection<L>,
    opcode: u8,
    payload: Option<&[u8]>,
    expect_response: bool,
) -> Result<Option<Vec<u8>>, TransportError> {
    let frame = CommandFrame {
        opcode,
        payload: payload.unwrap_or_default(),
    }
    .to_bytes()?;
    debug!("[cmd] opcode=0x{:02X} len={}", opcode, frame.len());
    conn.discard_input()?;
    conn.send(&frame)?;

    if !expect_response {
        return Ok(None);
    }
    let timeout = conn.response_timeout();
    conn.receive(RESPONSE_LEN, timeout).map(Some)
}

/// Minimal structural check shared by every response: at least three bytes,
/// STX first, ETX last.
pub fn is_framed(resp: &[u8]) -> bool {
    resp.len() >= 3 && resp[0] == STX && resp[resp.len() - 1] == ETX
}

/// Best-effort liveness probe. Every failure reads as "not responding".
pub fn check_device_status<L: Link>(conn: &mut Connection<L>) -> bool {
    match send_command(conn, OP_STATUS, None, true) {
        Ok(Some(resp)) => is_framed(&resp),
        Ok(None) => false,
        Err(e) => {
            warn!("[status] {}: {}", conn.name(), e);
            false
        }
    }
}
