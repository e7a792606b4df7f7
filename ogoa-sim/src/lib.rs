//! Hardware-free exercise rig for the OGOA link.
//!
//! Wires two real link engines back to back over an in-memory serial wire
//! with reproducible fault injection, feeds one side synthetic range sweeps
//! from a corridor model, and lets the other side play the display device.
//! Useful for smoke-testing protocol changes and for watching the retry and
//! status-loop machinery under byte loss without touching a serial port.

pub mod peer;
pub mod session;
pub mod sweep;
pub mod wire;

pub use peer::{PanelPeer, SourcePeer};
pub use session::{run, SimConfig, SimReport};
pub use sweep::HallwayModel;
pub use wire::{Endpoint, FaultModel, SimWire};
