//! Simulator Collaborator Contract
//!
//! The decision core never moves vehicles itself. Everything it knows about the
//! network comes through this synchronous request/response contract, and every
//! signal change it makes goes back through it.
//!
//! ## Ownership
//!
//! - `Episode` owns exactly one `Simulator` connection.
//! - `PhaseController` and `LaneMetrics` borrow it per call; nothing reaches
//!   the simulator through global state.
//! - A `SimulatorConnector` produces connections, so a broken one can be
//!   replaced without rebuilding the episode.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut sim = connect_with_retry(&mut connector, Duration::from_secs(1))?;
//! sim.apply_signal_pattern("tl_0", "GGGgrrrrGGGgrrrr")?;
//! sim.advance_ticks(5)?;
//! let halted = sim.query_lane_halted("n_in_0")?;
//! ```

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

// ============================================================================
// SimulatorError
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Connection is closed")]
    Closed,
}

impl SimulatorError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        SimulatorError::Command { command: command.into(), message: message.into() }
    }

    /// Failures that a fresh connection may clear.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimulatorError::Connection(_) => true,
            SimulatorError::Snapshot(_) => true,
            SimulatorError::Closed => true,
            SimulatorError::Command { .. } => false,
        }
    }
}

pub type SimResult<T> = std::result::Result<T, SimulatorError>;

// ============================================================================
// Simulator Trait
// ============================================================================

/// One live connection to the microscopic network simulator.
///
/// All calls block until the simulator answers. Time only moves through
/// `advance_ticks`.
pub trait Simulator {
    /// Opaque saved state. Must stay valid across reconnects.
    type Snapshot: Clone + Debug;

    /// Force the raw signal state string of a controller.
    fn apply_signal_pattern(&mut self, controller_id: &str, pattern: &str) -> SimResult<()>;

    /// Switch the controller to one of its stored programs.
    fn select_program(&mut self, controller_id: &str, program_id: &str) -> SimResult<()>;

    /// Advance the simulation by `ticks` base ticks.
    fn advance_ticks(&mut self, ticks: u32) -> SimResult<()>;

    /// Current simulated time in seconds.
    fn simulated_time(&mut self) -> SimResult<f64>;

    fn query_controller_ids(&mut self) -> SimResult<Vec<String>>;

    /// Lanes controlled by a signal, one entry per controlled link (duplicates allowed).
    fn query_controlled_lanes(&mut self, controller_id: &str) -> SimResult<Vec<String>>;

    /// Vehicles halted on the lane during the last tick.
    fn query_lane_halted(&mut self, lane_id: &str) -> SimResult<u32>;

    /// Summed instantaneous waiting time of the vehicles on the lane.
    fn query_lane_waiting_time(&mut self, lane_id: &str) -> SimResult<f64>;

    /// Accumulated waiting time of every vehicle currently on the lane.
    fn query_present_vehicle_waiting_times(&mut self, lane_id: &str) -> SimResult<Vec<f64>>;

    /// Accumulated waiting time of vehicles that left the network since the previous call.
    fn query_departed_vehicle_waiting_times(&mut self) -> SimResult<Vec<f64>>;

    /// Vehicles still expected: present in the network plus not yet inserted.
    fn query_remaining_demand(&mut self) -> SimResult<u32>;

    /// Vehicles currently in the network.
    fn query_vehicle_count(&mut self) -> SimResult<u32>;

    fn save_snapshot(&mut self) -> SimResult<Self::Snapshot>;

    fn restore_snapshot(&mut self, snapshot: &Self::Snapshot) -> SimResult<()>;

    fn close(&mut self) -> SimResult<()>;
}

/// Factory for simulator connections.
pub trait SimulatorConnector {
    type Simulator: Simulator;

    fn connect(&mut self) -> SimResult<Self::Simulator>;
}

// ============================================================================
// Connection Helpers
// ============================================================================

/// Open a connection, retrying exactly once after `pause`.
pub fn connect_with_retry<C: SimulatorConnector>(
    connector: &mut C,
    pause: Duration,
) -> SimResult<C::Simulator> {
    match connector.connect() {
        Ok(sim) => Ok(sim),
        Err(first) => {
            warn!(error = %first, pause_ms = pause.as_millis() as u64, "simulator connection failed, retrying");
            if !pause.is_zero() {
                thread::sleep(pause);
            }
            connector.connect().map_err(|second| {
                error!(error = %second, "simulator connection failed again, giving up");
                second
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
