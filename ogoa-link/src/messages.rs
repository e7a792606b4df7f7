//! Typed application messages carried over the link.
//!
//! The link itself moves opaque `(type, payload)` frames; this module gives
//! the frame types the firmware actually exchanges a typed shape. Unknown
//! tags stay raw [`Frame`]s at the link layer, so this layer is an optional
//! convenience on top of [`crate::link::LinkOps::on_frame`].

use heapless::Vec;

use crate::frame::{Frame, MAX_PAYLOAD, TYPE_STATUS_REQUEST, TYPE_STATUS_RESPONSE, TYPE_SWEEP_DATA};

/// Sweep payload header: start angle + angular step
pub const SWEEP_HEADER_BYTES: usize = 2;

/// Points that fit a maximum-size sweep payload (two bytes per range)
pub const MAX_SWEEP_POINTS: usize = (MAX_PAYLOAD - SWEEP_HEADER_BYTES) / 2;

/// Range value meaning "no return at this angle"
pub const RANGE_NO_RETURN_MM: u16 = 4095;

/// A decoded message failed structural validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Frame type is not one of the typed tags
    UnknownType,
    /// Payload length does not match the type's layout
    BadLength,
}

/// One contiguous arc of a range sweep.
///
/// Payload layout: `[start_theta, delta_theta, range₀_lo, range₀_hi, …]`,
/// angles in degrees, ranges little-endian u16 millimetres. Sample angles
/// wrap at 360, so a chunk starting at 250° with step 4° eventually covers
/// 358, 2, 6, …
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepChunk {
    /// First sampled angle in degrees
    pub start_theta: u8,
    /// Degrees between consecutive samples
    pub delta_theta: u8,
    /// Measured ranges in millimetres
    pub ranges: Vec<u16, MAX_SWEEP_POINTS>,
}

impl SweepChunk {
    /// Create a chunk from a slice of ranges
    pub fn new(start_theta: u8, delta_theta: u8, ranges: &[u16]) -> Result<Self, DecodeError> {
        let mut vec = Vec::new();
        vec.extend_from_slice(ranges)
            .map_err(|_| DecodeError::BadLength)?;
        Ok(Self {
            start_theta,
            delta_theta,
            ranges: vec,
        })
    }

    /// Angle of the sample at `index`, wrapped into 0..360
    pub fn theta_at(&self, index: usize) -> u16 {
        (u16::from(self.start_theta) + index as u16 * u16::from(self.delta_theta)) % 360
    }

    /// Iterate `(angle_degrees, range_mm)` pairs
    pub fn samples(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .map(|(i, &mm)| (self.theta_at(i), mm))
    }
}

/// Messages with a known typed layout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// Liveness probe, empty payload
    StatusRequest,
    /// Probe reply: device mode plus a coarse position
    StatusResponse { mode: u8, x: u8, y: u8 },
    /// Bulk range-sweep data
    Sweep(SweepChunk),
}

impl Message {
    /// The frame type tag this message travels under
    pub fn frame_type(&self) -> u8 {
        match self {
            Message::StatusRequest => TYPE_STATUS_REQUEST,
            Message::StatusResponse { .. } => TYPE_STATUS_RESPONSE,
            Message::Sweep(_) => TYPE_SWEEP_DATA,
        }
    }

    /// Serialise the payload for [`crate::link::Link::send`]
    pub fn encode_payload(&self) -> Vec<u8, MAX_PAYLOAD> {
        let mut payload = Vec::new();
        match self {
            Message::StatusRequest => {}
            Message::StatusResponse { mode, x, y } => {
                let _ = payload.extend_from_slice(&[*mode, *x, *y]);
            }
            Message::Sweep(chunk) => {
                let _ = payload.extend_from_slice(&[chunk.start_theta, chunk.delta_theta]);
                for &mm in &chunk.ranges {
                    let _ = payload.extend_from_slice(&mm.to_le_bytes());
                }
            }
        }
        payload
    }

    /// Parse a typed message from a validated frame
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        match frame.frame_type {
            TYPE_STATUS_REQUEST => {
                if !frame.payload.is_empty() {
                    return Err(DecodeError::BadLength);
                }
                Ok(Message::StatusRequest)
            }
            TYPE_STATUS_RESPONSE => {
                let [mode, x, y] = frame.payload.as_slice() else {
                    return Err(DecodeError::BadLength);
                };
                Ok(Message::StatusResponse {
                    mode: *mode,
                    x: *x,
                    y: *y,
                })
            }
            TYPE_SWEEP_DATA => {
                let payload = frame.payload.as_slice();
                if payload.len() < SWEEP_HEADER_BYTES
                    || (payload.len() - SWEEP_HEADER_BYTES) % 2 != 0
                {
                    return Err(DecodeError::BadLength);
                }
                let mut ranges = Vec::new();
                for pair in payload[SWEEP_HEADER_BYTES..].chunks_exact(2) {
                    let _ = ranges.push(u16::from_le_bytes([pair[0], pair[1]]));
                }
                Ok(Message::Sweep(SweepChunk {
                    start_theta: payload[0],
                    delta_theta: payload[1],
                    ranges,
                }))
            }
            _ => Err(DecodeError::UnknownType),
        }
    }
}
