//! Reward Strategies
//!
//! Control objectives expressed as differences of running totals.
//!
//! ## Components
//!
//! - `RewardStrategy`: one weighted objective, closed set of variants
//! - `AggregateCounters`: previous-step totals, owned by the episode
//! - `EpisodeMetrics`: per-episode statistics for the learning loop
//!
//! ## Binding
//!
//! A strategy is bound to exactly one episode through `set_env`. Computing a
//! reward before binding, or against another episode's counters, fails with
//! `CoreError::NotBound`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut reward = RewardStrategy::composite(vec![
//!     RewardStrategy::diff_halted(1.0),
//!     RewardStrategy::fairness_delta(0.5),
//! ]);
//! reward.set_env(&counters);
//! let r = reward.compute_reward(&LaneTotals::from_lanes(&lanes), &mut counters)?;
//! ```

mod counters;
mod episode;

pub use counters::{jain_index, AggregateCounters, EpisodeId, LaneTotals};
pub use episode::{ActionStats, EpisodeMetrics, EpisodeSummary, TruncationReason};

use serde::Serialize;

use crate::error::{CoreError, Result};

// ============================================================================
// RewardKind
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Drop in halted vehicles
    DiffHalted,
    /// Drop in summed instantaneous waiting time
    DiffWaitingTime,
    /// Drop in summed accumulated waiting time
    DiffCumulativeWaitingTime,
    /// Change in Jain's index over per-vehicle waits
    FairnessDelta,
    /// Jain's index itself
    FairnessIndex,
    /// Weighted sum of children
    Composite(Vec<RewardStrategy>),
}

// ============================================================================
// RewardStrategy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardStrategy {
    kind: RewardKind,
    weight: f64,
    #[serde(skip)]
    binding: Option<EpisodeId>,
}

impl RewardStrategy {
    pub fn new(kind: RewardKind, weight: f64) -> Self {
        Self { kind, weight, binding: None }
    }

    pub fn diff_halted(weight: f64) -> Self {
        Self::new(RewardKind::DiffHalted, weight)
    }

    pub fn diff_waiting_time(weight: f64) -> Self {
        Self::new(RewardKind::DiffWaitingTime, weight)
    }

    pub fn diff_cumulative_waiting_time(weight: f64) -> Self {
        Self::new(RewardKind::DiffCumulativeWaitingTime, weight)
    }

    pub fn fairness_delta(weight: f64) -> Self {
        Self::new(RewardKind::FairnessDelta, weight)
    }

    pub fn fairness_index(weight: f64) -> Self {
        Self::new(RewardKind::FairnessIndex, weight)
    }

    /// Sum of children; the composite itself has weight 1.
    pub fn composite(children: Vec<RewardStrategy>) -> Self {
        Self::new(RewardKind::Composite(children), 1.0)
    }

    /// Look up a leaf strategy by its configuration name.
    ///
    /// Accepts both the snake_case names and the camelCase spellings used
    /// by older configuration files.
    pub fn from_name(name: &str, weight: f64) -> Option<Self> {
        let kind = match name {
            "diff_halted" => RewardKind::DiffHalted,
            "diff_waiting_time" | "diff_waitingTime" => RewardKind::DiffWaitingTime,
            "diff_cumulative_waiting_time" | "diff_cumulativeWaitingTime" => RewardKind::DiffCumulativeWaitingTime,
            "fairness_delta" | "diff_jain_index" | "diffNJainIndex" => RewardKind::FairnessDelta,
            "fairness_index" | "jain_index" => RewardKind::FairnessIndex,
            _ => return None,
        };
        Some(Self::new(kind, weight))
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            RewardKind::DiffHalted => "diff_halted",
            RewardKind::DiffWaitingTime => "diff_waiting_time",
            RewardKind::DiffCumulativeWaitingTime => "diff_cumulative_waiting_time",
            RewardKind::FairnessDelta => "fairness_delta",
            RewardKind::FairnessIndex => "fairness_index",
            RewardKind::Composite(_) => "composite",
        }
    }

    pub fn kind(&self) -> &RewardKind {
        &self.kind
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Bind this strategy (and every child) to the episode owning `counters`.
    pub fn set_env(&mut self, counters: &AggregateCounters) {
        self.binding = Some(counters.episode());
        if let RewardKind::Composite(children) = &mut self.kind {
            for child in children {
                child.set_env(counters);
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Weighted reward for the step that produced `current`.
    ///
    /// Advances the previous-step value each variant differences against.
    pub fn compute_reward(&self, current: &LaneTotals, counters: &mut AggregateCounters) -> Result<f64> {
        if self.binding != Some(counters.episode()) {
            return Err(CoreError::NotBound { strategy: self.name().to_string() });
        }

        let raw = match &self.kind {
            RewardKind::DiffHalted => {
                let r = counters.total_halted as f64 - current.total_halted as f64;
                counters.total_halted = current.total_halted;
                r
            }
            RewardKind::DiffWaitingTime => {
                let r = counters.total_waiting_time - current.total_waiting_time;
                counters.total_waiting_time = current.total_waiting_time;
                r
            }
            RewardKind::DiffCumulativeWaitingTime => {
                let r = counters.total_cumulative_waiting_time - current.total_cumulative_waiting_time;
                counters.total_cumulative_waiting_time = current.total_cumulative_waiting_time;
                r
            }
            RewardKind::FairnessDelta => {
                let r = current.fairness_index - counters.fairness_index;
                counters.fairness_index = current.fairness_index;
                r
            }
            RewardKind::FairnessIndex => {
                counters.fairness_index = current.fairness_index;
                current.fairness_index
            }
            RewardKind::Composite(children) => {
                // children may share a field; each sees the pre-step values
                let before = counters.clone();
                let sum = children
                    .iter()
                    .map(|child| child.compute_reward(current, &mut before.clone()))
                    .sum::<Result<f64>>()?;
                counters.sync_to(current);
                sum
            }
        };

        Ok(self.weight * raw)
    }
}

// ============================================================================
// Tests
// ============================================================================
