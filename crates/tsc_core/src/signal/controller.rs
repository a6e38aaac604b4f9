//! Phase Controller State Machine
//!
//! Owns the signal state of one controller and is the only component allowed
//! to change it or to move simulated time in adaptive mode.
//!
//! ```text
//!   Init ──request──▶ (commit on next tick) ──▶ Steady(p)
//!   Steady(p) ──request(q), can_change──▶ Yellow(p→q) ──yellow_time ticks──▶ Steady(q)
//! ```
//!
//! Safety: the pattern sent to the simulator is always either the signal of
//! a steady phase or the yellow of the phase being vacated. Two different
//! green phases are never shown back to back.

use serde::{Deserialize, Serialize};

use super::phase::PhaseTable;
use crate::error::{CoreError, Result};
use crate::sim::Simulator;

/// Externally visible state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    /// All-red, before the first real transition
    Init,
    /// Holding a phase
    Steady(usize),
    /// Showing the yellow of `from`, `to` committed once it expires
    Yellow { from: usize, to: usize },
}

/// Result of a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOutcome {
    /// Transition scheduled; carries how long the vacated phase was held
    Scheduled { previous_duration: u32 },
    /// Minimum green or yellow not yet served
    TooEarly,
    /// Requested phase is already current
    SamePhase,
}

impl ChangeOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ChangeOutcome::Scheduled { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseController {
    controller_id: String,
    phases: PhaseTable,
    yellow_time: u32,
    min_green_time: u32,
    current_phase: usize,
    pending_phase: usize,
    in_yellow: bool,
    /// Ticks since the last commit or scheduled change
    phase_timer: u32,
}

impl PhaseController {
    /// New controller, starting at `Init`.
    ///
    /// Yellow is held for at least one tick, so a `yellow_time` of 0 acts as 1.
    pub fn new(controller_id: impl Into<String>, phases: PhaseTable, yellow_time: u32, min_green_time: u32) -> Self {
        let init = phases.init_index();
        Self {
            controller_id: controller_id.into(),
            phases,
            yellow_time: yellow_time.max(1),
            min_green_time,
            current_phase: init,
            pending_phase: init,
            in_yellow: false,
            phase_timer: 0,
        }
    }

    /// Request a transition to `new_phase`.
    ///
    /// Too-early and same-phase requests are ordinary outcomes, not errors.
    /// Only an index outside the real phases is rejected.
    pub fn request_change<S: Simulator + ?Sized>(&mut self, sim: &mut S, new_phase: usize) -> Result<ChangeOutcome> {
        if new_phase >= self.phases.real_count() {
            return Err(CoreError::InvalidAction { action: new_phase, action_count: self.phases.real_count() });
        }
        if new_phase == self.current_phase {
            return Ok(ChangeOutcome::SamePhase);
        }

        let from_init = self.phases.is_init(self.current_phase);
        if !from_init && !self.can_change() {
            return Ok(ChangeOutcome::TooEarly);
        }

        if !from_init {
            let yellow = self.phases.phase(self.current_phase).yellow.clone();
            sim.apply_signal_pattern(&self.controller_id, &yellow)?;
            self.in_yellow = true;
        }

        let previous_duration = self.phase_timer;
        self.phase_timer = 0;
        self.pending_phase = new_phase;
        Ok(ChangeOutcome::Scheduled { previous_duration })
    }

    /// Whether a change request would be accepted now.
    pub fn can_change(&self) -> bool {
        !self.in_yellow && self.phase_timer >= self.min_green_time.max(self.yellow_time)
    }

    /// Commit a due transition, then advance the simulator by one tick.
    pub fn tick<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<()> {
        if self.pending_phase != self.current_phase && (!self.in_yellow || self.phase_timer >= self.yellow_time) {
            let signal = self.phases.phase(self.pending_phase).signal.clone();
            sim.apply_signal_pattern(&self.controller_id, &signal)?;
            self.current_phase = self.pending_phase;
            self.in_yellow = false;
            self.phase_timer = 0;
        }

        sim.advance_ticks(1)?;
        self.phase_timer = self.phase_timer.saturating_add(1);
        Ok(())
    }

    /// Back to `Init`. The simulator is not touched.
    pub fn reset(&mut self) {
        let init = self.phases.init_index();
        self.current_phase = init;
        self.pending_phase = init;
        self.in_yellow = false;
        self.phase_timer = 0;
    }

    pub fn state(&self) -> SignalState {
        if self.in_yellow {
            SignalState::Yellow { from: self.current_phase, to: self.pending_phase }
        } else if self.phases.is_init(self.current_phase) {
            SignalState::Init
        } else {
            SignalState::Steady(self.current_phase)
        }
    }

    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    pub fn phases(&self) -> &PhaseTable {
        &self.phases
    }

    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    pub fn pending_phase(&self) -> usize {
        self.pending_phase
    }

    pub fn in_yellow(&self) -> bool {
        self.in_yellow
    }

    pub fn phase_timer(&self) -> u32 {
        self.phase_timer
    }

    pub fn yellow_time(&self) -> u32 {
        self.yellow_time
    }

    pub fn min_green_time(&self) -> u32 {
        self.min_green_time
    }
}

// ============================================================================
// Tests
// ============================================================================
