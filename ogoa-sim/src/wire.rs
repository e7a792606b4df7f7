//! Deterministic in-memory serial wire with fault injection.
//!
//! Real serial links corrupt and lose bytes. To exercise the link's
//! reliability machinery without hardware, [`SimWire`] carries bytes between
//! two endpoints through plain queues and applies a configurable per-byte
//! fault model driven by a seeded RNG, so every failure is reproducible.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-byte fault probabilities, all in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultModel {
    /// Probability that a byte is delivered with a random bit flipped.
    pub corrupt_rate: f64,
    /// Probability that a byte is silently lost.
    pub drop_rate: f64,
}

/// Which end of the wire an endpoint sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// The two directional byte queues plus the fault model.
pub struct SimWire {
    a_to_b: VecDeque<u8>,
    b_to_a: VecDeque<u8>,
    model: FaultModel,
    rng: StdRng,
    /// Bytes corrupted in transit so far.
    pub corrupted: u64,
    /// Bytes dropped in transit so far.
    pub dropped: u64,
}

impl SimWire {
    pub fn new(seed: u64, model: FaultModel) -> Self {
        let model = FaultModel {
            corrupt_rate: model.corrupt_rate.clamp(0.0, 1.0),
            drop_rate: model.drop_rate.clamp(0.0, 1.0),
        };
        Self {
            a_to_b: VecDeque::new(),
            b_to_a: VecDeque::new(),
            model,
            rng: StdRng::seed_from_u64(seed),
            corrupted: 0,
            dropped: 0,
        }
    }

    /// A fault-free wire.
    pub fn clean(seed: u64) -> Self {
        Self::new(seed, FaultModel::default())
    }

    /// Write bytes from `side` toward the opposite endpoint.
    pub fn send(&mut self, side: Side, bytes: &[u8]) {
        for &byte in bytes {
            if self.model.drop_rate > 0.0 && self.rng.random_bool(self.model.drop_rate) {
                self.dropped += 1;
                continue;
            }
            let byte = if self.model.corrupt_rate > 0.0
                && self.rng.random_bool(self.model.corrupt_rate)
            {
                self.corrupted += 1;
                byte ^ (1u8 << self.rng.random_range(0u8..8))
            } else {
                byte
            };
            match side {
                Side::A => self.a_to_b.push_back(byte),
                Side::B => self.b_to_a.push_back(byte),
            }
        }
    }

    /// Take every byte currently queued toward `side`.
    pub fn drain(&mut self, side: Side) -> Vec<u8> {
        let queue = match side {
            Side::A => &mut self.b_to_a,
            Side::B => &mut self.a_to_b,
        };
        queue.drain(..).collect()
    }
}

/// One endpoint's handle to the shared wire.
#[derive(Clone)]
pub struct Endpoint {
    wire: Rc<RefCell<SimWire>>,
    side: Side,
}

impl Endpoint {
    /// Split a wire into its two endpoints.
    pub fn pair(wire: SimWire) -> (Endpoint, Endpoint) {
        let wire = Rc::new(RefCell::new(wire));
        (
            Endpoint {
                wire: Rc::clone(&wire),
                side: Side::A,
            },
            Endpoint {
                wire,
                side: Side::B,
            },
        )
    }

    /// Write toward the opposite endpoint.
    pub fn send(&self, bytes: &[u8]) {
        self.wire.borrow_mut().send(self.side, bytes);
    }

    /// Take every byte waiting for this endpoint.
    pub fn take_rx(&self) -> Vec<u8> {
        self.wire.borrow_mut().drain(self.side)
    }

    /// Fault counters `(corrupted, dropped)` for the whole wire.
    pub fn fault_counts(&self) -> (u64, u64) {
        let wire = self.wire.borrow();
        (wire.corrupted, wire.dropped)
    }
}
