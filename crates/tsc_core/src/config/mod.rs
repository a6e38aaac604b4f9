//! # Episode Configuration
//!
//! Every tunable of an episode in one serde structure, with presets and
//! file loading.
//!
//! ## Usage
//! ```rust,ignore
//! use tsc_core::config::EpisodeConfig;
//!
//! let config = EpisodeConfig::load("configs/intersection.yaml")?;
//! let resolved = config.resolve()?;
//! for warning in &resolved.warnings {
//!     eprintln!("{}", warning);
//! }
//! ```
//!
//! Fatal problems (`ConfigError`) are reported before any simulator
//! connection is opened. Recoverable ones fall back to a default and are
//! collected as `ConfigWarning`s.

mod episode_config;
mod reward_config;

pub use episode_config::{EpisodeConfig, ResolvedConfig};
pub use reward_config::RewardConfig;

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{weights} reward weights given for {functions} reward functions")]
    WeightMismatch { functions: usize, weights: usize },
}

/// Configuration problem that was replaced by a default.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    IntervalsClamped { requested: u32, clamped: u32 },
    UnknownMetric { name: String },
    UnknownReward { name: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::IntervalsClamped { requested, clamped } => {
                write!(f, "discrete_intervals {} exceeds max_lane_value, clamped to {}", requested, clamped)
            }
            ConfigWarning::UnknownMetric { name } => {
                write!(f, "unknown lane metric '{}', using 'halted'", name)
            }
            ConfigWarning::UnknownReward { name } => {
                write!(f, "unknown reward function '{}', using 'diff_halted'", name)
            }
        }
    }
}
