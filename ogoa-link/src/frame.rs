//! Frame encoding for the OGOA link.
//!
//! Frame format:
//! - START (1 byte): 0x27 synchronization byte
//! - SEQ (1 byte): per-sender sequence number, wraps at 256
//! - TYPE (1 byte): frame type tag
//! - LEN (1 byte): payload length (0-251)
//! - PAYLOAD (0-251 bytes): type-specific data
//! - CHECKSUM (1 byte): XOR of START, SEQ, TYPE, LEN and all PAYLOAD bytes

use heapless::Vec;

use crate::error::LinkError;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0x27;

/// Maximum complete frame size on the wire
pub const FRAME_MAX_BYTES: usize = 256;

/// Bytes preceding the payload (START + SEQ + TYPE + LEN)
pub const HEADER_BYTES: usize = 4;

/// Trailing checksum size
pub const CHECKSUM_BYTES: usize = 1;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD: usize = FRAME_MAX_BYTES - HEADER_BYTES - CHECKSUM_BYTES;

/// Acknowledgement frame, empty payload, seq echoes the frame being acked
pub const TYPE_ACK: u8 = 0x67;

/// Liveness probe sent while the peer is silent
pub const TYPE_STATUS_REQUEST: u8 = 0x4B;

/// Reply to a status request; also exits the sender's status loop
pub const TYPE_STATUS_RESPONSE: u8 = 0xB4;

/// Bulk range-sweep sensor data
pub const TYPE_SWEEP_DATA: u8 = 0xAA;

/// XOR of all bytes, the checksum over everything preceding it on the wire
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |crc, &b| crc ^ b)
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Per-sender sequence number
    pub seq: u8,
    /// Frame type tag
    pub frame_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl Frame {
    /// Create a new frame with the given sequence, type and payload
    pub fn new(seq: u8, frame_type: u8, payload: &[u8]) -> Result<Self, LinkError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| LinkError::PayloadTooLarge)?;

        Ok(Self {
            seq,
            frame_type,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(seq: u8, frame_type: u8) -> Self {
        Self {
            seq,
            frame_type,
            payload: Vec::new(),
        }
    }

    /// Payload length as carried in the LEN field
    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    /// True when the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written (`payload length + 5`).
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, LinkError> {
        let total = HEADER_BYTES + self.payload.len() + CHECKSUM_BYTES;
        if buffer.len() < total {
            return Err(LinkError::BadArg);
        }

        buffer[0] = FRAME_START;
        buffer[1] = self.seq;
        buffer[2] = self.frame_type;
        buffer[3] = self.len();
        buffer[HEADER_BYTES..HEADER_BYTES + self.payload.len()].copy_from_slice(&self.payload);
        buffer[total - 1] = xor_checksum(&buffer[..total - 1]);

        Ok(total)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Vec<u8, FRAME_MAX_BYTES> {
        let mut buffer = [0u8; FRAME_MAX_BYTES];
        // The buffer always fits a maximum-size frame.
        let len = self.encode(&mut buffer).unwrap_or(0);
        let mut vec = Vec::new();
        let _ = vec.extend_from_slice(&buffer[..len]);
        vec
    }

    /// One-byte duplicate-detection fingerprint: XOR of SEQ, TYPE, LEN and
    /// all payload bytes. Both peers must agree on it, so it is part of the
    /// wire contract even though it never appears on the wire itself.
    pub fn fingerprint(&self) -> u8 {
        self.payload
            .iter()
            .fold(self.seq ^ self.frame_type ^ self.len(), |fp, &b| fp ^ b)
    }
}
