//! Scripted link endpoints for the simulation.
//!
//! Two roles mirror the real deployment: a [`SourcePeer`] that streams sweep
//! data and probes liveness (the sensor host), and a [`PanelPeer`] that
//! consumes sweeps and answers status requests (the display device). Both
//! drive a real [`Link`]; the hooks only record what happened, and every
//! engine call is made from `step`, never from inside a callback.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use ogoa_link::{Frame, Link, LinkError, LinkOps, Message, SweepChunk};

use crate::wire::Endpoint;

/// Hook implementation shared by both roles: transmit onto the wire, decode
/// and record deliveries, record errors.
struct WireOps {
    endpoint: Endpoint,
    label: &'static str,
    messages: Vec<Message>,
    errors: Vec<LinkError>,
}

impl WireOps {
    fn new(endpoint: Endpoint, label: &'static str) -> Self {
        Self {
            endpoint,
            label,
            messages: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl LinkOps for WireOps {
    fn tx(&mut self, bytes: &[u8]) -> usize {
        trace!("[{}] tx {} bytes", self.label, bytes.len());
        self.endpoint.send(bytes);
        bytes.len()
    }

    fn on_frame(&mut self, frame: &Frame) {
        match Message::from_frame(frame) {
            Ok(message) => {
                debug!(
                    "[{}] rx type=0x{:02X} seq={}",
                    self.label, frame.frame_type, frame.seq
                );
                self.messages.push(message);
            }
            Err(err) => warn!(
                "[{}] undecodable frame type=0x{:02X} seq={}: {:?}",
                self.label, frame.frame_type, frame.seq, err
            ),
        }
    }

    fn on_error(&mut self, error: LinkError) {
        debug!("[{}] link error {:?}", self.label, error);
        self.errors.push(error);
    }
}

/// The sensor-host role: queues outbound messages and sends them one at a
/// time, respecting the link's one-in-flight rule. Also answers the peer's
/// status requests, so two probing endpoints always find each other again.
pub struct SourcePeer {
    link: Link<WireOps>,
    outbox: VecDeque<Message>,
    pending_status: usize,
    sent: u64,
    responses: u64,
}

impl SourcePeer {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            link: Link::new(WireOps::new(endpoint, "source")),
            outbox: VecDeque::new(),
            pending_status: 0,
            sent: 0,
            responses: 0,
        }
    }

    /// Queue a message for transmission.
    pub fn queue(&mut self, message: Message) {
        self.outbox.push_back(message);
    }

    /// Pump reception, timeouts, and the outbox. Status replies take
    /// priority over queued traffic.
    pub fn step(&mut self, now_ms: u32) {
        let rx = self.link.ops().endpoint.take_rx();
        self.link.process_bytes(&rx, now_ms);
        self.link.tick(now_ms);

        for message in self.link.ops_mut().messages.drain(..) {
            match message {
                Message::StatusRequest => self.pending_status += 1,
                Message::StatusResponse { .. } => self.responses += 1,
                Message::Sweep(_) => {}
            }
        }

        if self.link.waiting_ack() || self.link.status_loop_active() {
            return;
        }

        if self.pending_status > 0 {
            let reply = Message::StatusResponse {
                mode: 1,
                x: 42,
                y: 84,
            };
            let payload = reply.encode_payload();
            if self.link.send(reply.frame_type(), &payload, now_ms).is_ok() {
                self.pending_status -= 1;
            }
            return;
        }

        if let Some(message) = self.outbox.front() {
            let payload = message.encode_payload();
            match self.link.send(message.frame_type(), &payload, now_ms) {
                Ok(()) => {
                    self.outbox.pop_front();
                    self.sent += 1;
                }
                Err(err) => warn!("[source] send refused: {:?}", err),
            }
        }
    }

    /// Status responses the peer has delivered so far.
    pub fn responses(&self) -> u64 {
        self.responses
    }

    pub fn errors(&self) -> &[LinkError] {
        &self.link.ops().errors
    }

    /// Queued messages successfully handed to the transport.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Messages still waiting for a free link.
    pub fn backlog(&self) -> usize {
        self.outbox.len()
    }

    pub fn status_loop_active(&self) -> bool {
        self.link.status_loop_active()
    }
}

/// The display-device role: collects sweeps and answers status requests.
pub struct PanelPeer {
    link: Link<WireOps>,
    /// Status requests seen but not yet answered.
    pending_status: usize,
    sweeps: Vec<SweepChunk>,
    /// Reported back in every status response.
    pub mode: u8,
}

impl PanelPeer {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            link: Link::new(WireOps::new(endpoint, "panel")),
            pending_status: 0,
            sweeps: Vec::new(),
            mode: 1,
        }
    }

    /// Pump reception and timeouts, then answer at most one outstanding
    /// status request if the link is free.
    pub fn step(&mut self, now_ms: u32) {
        let rx = self.link.ops().endpoint.take_rx();
        self.link.process_bytes(&rx, now_ms);
        self.link.tick(now_ms);

        // Deliveries land in the ops record; sort them into role state.
        for message in self.link.ops_mut().messages.drain(..) {
            match message {
                Message::StatusRequest => self.pending_status += 1,
                Message::Sweep(chunk) => self.sweeps.push(chunk),
                Message::StatusResponse { .. } => {}
            }
        }

        if self.pending_status > 0 && !self.link.waiting_ack() && !self.link.status_loop_active() {
            let reply = Message::StatusResponse {
                mode: self.mode,
                x: 42,
                y: 84,
            };
            let payload = reply.encode_payload();
            if self.link.send(reply.frame_type(), &payload, now_ms).is_ok() {
                self.pending_status -= 1;
            }
        }
    }

    /// Every sweep chunk delivered so far.
    pub fn sweeps(&self) -> &[SweepChunk] {
        &self.sweeps
    }

    pub fn errors(&self) -> &[LinkError] {
        &self.link.ops().errors
    }

    pub fn pending_status(&self) -> usize {
        self.pending_status
    }
}
