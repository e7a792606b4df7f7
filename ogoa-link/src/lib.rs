//! OGOA Link Protocol
//!
//! A reliable, framed, byte-stream link for constrained devices exchanging
//! small control and sensor messages over a single-lane serial transport.
//!
//! # Wire Overview
//!
//! All traffic uses a simple binary frame format:
//! ```text
//! ┌───────┬─────┬──────┬─────┬─────────────┬──────────┐
//! │ START │ SEQ │ TYPE │ LEN │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 1B  │ 1B   │ 1B  │ 0–251B      │ 1B       │
//! └───────┴─────┴──────┴─────┴─────────────┴──────────┘
//! ```
//!
//! Every non-ack frame is acknowledged by echoing its sequence number in an
//! empty frame of type 0x67. The sender keeps one frame in flight, retries
//! it once after 100 ms of silence, and after a second unanswered timeout
//! falls back to probing the peer with periodic status requests until a
//! status response shows the peer is alive again.
//!
//! The engine owns no I/O and no clock: the host pushes received bytes in,
//! pulls transmitted bytes out through the [`link::LinkOps`] hooks, and
//! supplies a monotonic millisecond timestamp to every call.

#![no_std]
#![deny(unsafe_code)]

pub mod error;
pub mod frame;
pub mod link;
pub mod messages;

pub use error::LinkError;
pub use frame::{
    xor_checksum, Frame, FRAME_MAX_BYTES, FRAME_START, MAX_PAYLOAD, TYPE_ACK, TYPE_STATUS_REQUEST,
    TYPE_STATUS_RESPONSE, TYPE_SWEEP_DATA,
};
pub use link::{Link, LinkOps, ACK_TIMEOUT_MS, STATUS_LOOP_INTERVAL_MS};
pub use messages::{DecodeError, Message, SweepChunk, MAX_SWEEP_POINTS, RANGE_NO_RETURN_MM};
