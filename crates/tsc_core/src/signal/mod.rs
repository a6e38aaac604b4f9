//! Signal Control
//!
//! - `PhaseTable`: immutable phase configuration with the reserved `Init`
//! - `PhaseController`: timing-constrained phase state machine

mod controller;
mod phase;

pub use controller::{ChangeOutcome, PhaseController, SignalState};
pub use phase::{default_four_way_phases, Phase, PhaseTable};
