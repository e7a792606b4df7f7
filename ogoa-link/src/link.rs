//! The link engine: receive parsing, acknowledgement emission, duplicate
//! suppression, and the transmit reliability state machine.
//!
//! The engine is strictly single-threaded and cooperative. The host feeds it
//! received bytes through [`Link::process_byte`], drives timeouts through
//! [`Link::tick`] (at least twice per ack timeout, 20 Hz recommended), and
//! submits outbound frames through [`Link::send`]. Each call runs to
//! completion; the hooks must not call back into the engine, which the
//! `&mut self` receiver already rules out for safe code.
//!
//! Reliability model: exactly one frame may be unacknowledged at a time. A
//! frame that is not acked within [`ACK_TIMEOUT_MS`] is retransmitted once;
//! if the retry also goes unanswered, the engine abandons it and drops into
//! a status loop, probing the peer with empty status-request frames every
//! [`STATUS_LOOP_INTERVAL_MS`] until any status response arrives. Normal
//! sending resumes at that point.

use heapless::Vec;

use crate::error::LinkError;
use crate::frame::{
    xor_checksum, Frame, FRAME_MAX_BYTES, FRAME_START, HEADER_BYTES, MAX_PAYLOAD, TYPE_ACK,
    TYPE_STATUS_REQUEST, TYPE_STATUS_RESPONSE,
};

/// How long to wait for an ack before the single retransmission
pub const ACK_TIMEOUT_MS: u32 = 100;

/// Cadence of status-request probes after the retry has failed
pub const STATUS_LOOP_INTERVAL_MS: u32 = 250;

/// Host-side operations consumed by the engine.
///
/// Implementations are stored by value inside the [`Link`]; the implementer
/// picks its own handle type (UART half, channel sender, test recorder).
/// None of the methods may call back into the owning link.
pub trait LinkOps {
    /// Write bytes to the transport, returning the count actually written.
    /// Anything other than `bytes.len()` is treated as a transmit failure.
    fn tx(&mut self, bytes: &[u8]) -> usize;

    /// Called at most once per validated, deduplicated, non-ack frame.
    fn on_frame(&mut self, frame: &Frame);

    /// Called on checksum mismatch, over-length reception, or a transmit
    /// failure during retry or ack emission.
    fn on_error(&mut self, error: LinkError);
}

/// Receive parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Discarding bytes until a start byte appears
    WaitingForStart,
    /// Got START, waiting for SEQ
    WaitingForSeq,
    /// Got SEQ, waiting for TYPE
    WaitingForType,
    /// Got TYPE, waiting for LEN
    WaitingForLength,
    /// Accumulating payload bytes
    ReadingPayload,
    /// Waiting for the trailing checksum
    WaitingForChecksum,
}

/// Identity of the most recently delivered non-ack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NonAckRecord {
    seq: u8,
    frame_type: u8,
    len: u8,
    fingerprint: u8,
}

impl NonAckRecord {
    fn of(frame: &Frame) -> Self {
        Self {
            seq: frame.seq,
            frame_type: frame.frame_type,
            len: frame.len(),
            fingerprint: frame.fingerprint(),
        }
    }
}

/// One protocol endpoint: the complete link state for a single transport.
pub struct Link<O: LinkOps> {
    ops: O,

    next_seq: u8,

    tx_frame: Vec<u8, FRAME_MAX_BYTES>,
    tx_pending_seq: u8,
    waiting_ack: bool,
    retried_once: bool,
    status_loop: bool,
    tx_last_action_ms: u32,

    rx_state: RxState,
    rx_buf: Vec<u8, FRAME_MAX_BYTES>,
    rx_expected_len: u8,

    last_non_ack: Option<NonAckRecord>,
}

impl<O: LinkOps> Link<O> {
    /// Create a link with the given host operations installed.
    pub fn new(ops: O) -> Self {
        Self {
            ops,
            next_seq: 0,
            tx_frame: Vec::new(),
            tx_pending_seq: 0,
            waiting_ack: false,
            retried_once: false,
            status_loop: false,
            tx_last_action_ms: 0,
            rx_state: RxState::WaitingForStart,
            rx_buf: Vec::new(),
            rx_expected_len: 0,
            last_non_ack: None,
        }
    }

    /// Borrow the installed host operations.
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Mutably borrow the installed host operations.
    pub fn ops_mut(&mut self) -> &mut O {
        &mut self.ops
    }

    /// Consume the link and return the host operations.
    pub fn into_ops(self) -> O {
        self.ops
    }

    /// True while a sent frame awaits its acknowledgement.
    pub fn waiting_ack(&self) -> bool {
        self.waiting_ack
    }

    /// True while the engine is probing a silent peer with status requests.
    /// A set flag also means the last sent frame was abandoned after its
    /// single retry went unanswered.
    pub fn status_loop_active(&self) -> bool {
        self.status_loop
    }

    /// Sequence number the next outbound frame will carry.
    pub fn next_seq(&self) -> u8 {
        self.next_seq
    }

    /// Build and transmit a frame, then hold it for retransmission until the
    /// matching ack arrives.
    ///
    /// Refused with [`LinkError::PayloadTooLarge`] when the payload exceeds
    /// [`MAX_PAYLOAD`] bytes, and with [`LinkError::TxFailed`] when a frame
    /// is already in flight, the status loop is active, or the transport
    /// does not accept every byte. No state changes on refusal.
    pub fn send(&mut self, frame_type: u8, payload: &[u8], now_ms: u32) -> Result<(), LinkError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::PayloadTooLarge);
        }
        if self.waiting_ack || self.status_loop {
            return Err(LinkError::TxFailed);
        }

        let seq = self.next_seq;
        let bytes = Frame::new(seq, frame_type, payload)?.encode_to_vec();
        if !send_raw(&mut self.ops, &bytes) {
            return Err(LinkError::TxFailed);
        }

        self.tx_frame = bytes;
        self.tx_pending_seq = seq;
        self.waiting_ack = frame_type != TYPE_ACK;
        self.retried_once = false;
        self.tx_last_action_ms = now_ms;
        self.next_seq = self.next_seq.wrapping_add(1);

        Ok(())
    }

    /// Drive timeouts. Two sub-machines run, ack waiting first, and at most
    /// one meaningfully advances per call.
    ///
    /// `now_ms` is the host's monotonic millisecond clock; all arithmetic
    /// wraps, so one u32 clock wrap per session is tolerated.
    pub fn tick(&mut self, now_ms: u32) {
        if self.waiting_ack {
            let elapsed = now_ms.wrapping_sub(self.tx_last_action_ms);
            if elapsed < ACK_TIMEOUT_MS {
                return;
            }

            if !self.retried_once {
                if send_raw(&mut self.ops, &self.tx_frame) {
                    self.retried_once = true;
                    self.tx_last_action_ms = now_ms;
                } else {
                    self.ops.on_error(LinkError::TxFailed);
                }
                return;
            }

            // Retry went unanswered: abandon the frame and start probing.
            self.waiting_ack = false;
            self.status_loop = true;
            self.tx_last_action_ms = now_ms;
        }

        if self.status_loop
            && now_ms.wrapping_sub(self.tx_last_action_ms) >= STATUS_LOOP_INTERVAL_MS
        {
            let seq = self.next_seq;
            let probe = Frame::empty(seq, TYPE_STATUS_REQUEST).encode_to_vec();
            if send_raw(&mut self.ops, &probe) {
                self.tx_frame = probe;
                self.tx_pending_seq = seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                self.tx_last_action_ms = now_ms;
            } else {
                self.ops.on_error(LinkError::TxFailed);
            }
        }
    }

    /// Feed one received byte to the parser.
    ///
    /// A completed, checksum-valid non-ack frame is acknowledged and, unless
    /// it duplicates the previously delivered frame, handed to
    /// [`LinkOps::on_frame`]. Valid acks resolve the pending transmission.
    pub fn process_byte(&mut self, byte: u8, now_ms: u32) {
        match self.rx_state {
            RxState::WaitingForStart => {
                if byte == FRAME_START {
                    self.rx_buf.clear();
                    let _ = self.rx_buf.push(byte);
                    self.rx_state = RxState::WaitingForSeq;
                }
            }
            RxState::WaitingForSeq => {
                let _ = self.rx_buf.push(byte);
                self.rx_state = RxState::WaitingForType;
            }
            RxState::WaitingForType => {
                let _ = self.rx_buf.push(byte);
                self.rx_state = RxState::WaitingForLength;
            }
            RxState::WaitingForLength => {
                let _ = self.rx_buf.push(byte);
                self.rx_expected_len = byte;
                if usize::from(byte) > MAX_PAYLOAD {
                    self.reset_rx();
                    self.ops.on_error(LinkError::PayloadTooLarge);
                } else if byte == 0 {
                    self.rx_state = RxState::WaitingForChecksum;
                } else {
                    self.rx_state = RxState::ReadingPayload;
                }
            }
            RxState::ReadingPayload => {
                let _ = self.rx_buf.push(byte);
                if self.rx_buf.len() == HEADER_BYTES + usize::from(self.rx_expected_len) {
                    self.rx_state = RxState::WaitingForChecksum;
                }
            }
            RxState::WaitingForChecksum => {
                if xor_checksum(&self.rx_buf) == byte {
                    self.accept_frame(now_ms);
                } else {
                    self.ops.on_error(LinkError::Checksum);
                }
                self.reset_rx();
            }
        }
    }

    /// Feed a received byte slice to the parser, in order.
    pub fn process_bytes(&mut self, bytes: &[u8], now_ms: u32) {
        for &byte in bytes {
            self.process_byte(byte, now_ms);
        }
    }

    fn reset_rx(&mut self) {
        self.rx_state = RxState::WaitingForStart;
        self.rx_buf.clear();
        self.rx_expected_len = 0;
    }

    /// Handle a framing- and checksum-valid frame sitting in the rx buffer.
    fn accept_frame(&mut self, now_ms: u32) {
        let seq = self.rx_buf[1];
        let frame_type = self.rx_buf[2];
        let len = self.rx_buf[3];

        if frame_type == TYPE_ACK {
            // An ack with a payload is malformed and dropped outright.
            if len == 0 && self.waiting_ack && seq == self.tx_pending_seq {
                self.waiting_ack = false;
                self.retried_once = false;
            }
            return;
        }

        let payload = &self.rx_buf[HEADER_BYTES..HEADER_BYTES + usize::from(len)];
        // Length was validated during parsing.
        let Ok(frame) = Frame::new(seq, frame_type, payload) else {
            return;
        };

        // The peer retries on a lost ack, so the ack goes out before the
        // duplicate check: duplicates are re-acked, just not re-delivered.
        let ack = Frame::empty(seq, TYPE_ACK).encode_to_vec();
        if !send_raw(&mut self.ops, &ack) {
            self.ops.on_error(LinkError::TxFailed);
            return;
        }

        let record = NonAckRecord::of(&frame);
        if self.last_non_ack != Some(record) {
            self.last_non_ack = Some(record);
            self.ops.on_frame(&frame);
        }

        if self.status_loop && frame_type == TYPE_STATUS_RESPONSE {
            self.status_loop = false;
        }
        self.tx_last_action_ms = now_ms;
    }
}

/// True when the transport accepted every byte.
fn send_raw<O: LinkOps>(ops: &mut O, bytes: &[u8]) -> bool {
    ops.tx(bytes) == bytes.len()
}
