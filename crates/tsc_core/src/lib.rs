//! # tsc_core - Traffic Signal Decision Core
//!
//! Turns continuous traffic telemetry into a small discrete observation for a
//! learning controller, and turns its decisions into safely sequenced signal
//! phase changes.
//!
//! ## Features
//! - Phase state machine that never shows two conflicting greens back to back
//! - Log-linear discretizer for heavy-tailed lane metrics
//! - Reward strategies expressed as differences of running totals
//! - Warm-up snapshot and restore, so identical resets replay identically
//!
//! The traffic simulator itself is an external collaborator behind the
//! [`sim::Simulator`] trait.

// Learning-loop APIs return several values at once
#![allow(clippy::type_complexity)]

pub mod config;
pub mod discretizer;
pub mod episode;
pub mod error;
pub mod lane;
pub mod reward;
pub mod signal;
pub mod sim;

#[cfg(test)]
mod testkit;

pub use config::{ConfigError, ConfigWarning, EpisodeConfig, ResolvedConfig, RewardConfig};
pub use discretizer::{DiscretizeError, Discretizer};
pub use episode::{run_episodes, Episode, Observation, ObservationSpace, StepInfo, StepOutcome};
pub use error::{CoreError, Result};
pub use lane::{LaneMetrics, MetricKind};
pub use reward::{
    AggregateCounters, EpisodeMetrics, EpisodeSummary, LaneTotals, RewardKind, RewardStrategy, TruncationReason,
};
pub use signal::{ChangeOutcome, Phase, PhaseController, PhaseTable, SignalState};
pub use sim::{connect_with_retry, SimResult, Simulator, SimulatorConnector, SimulatorError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
