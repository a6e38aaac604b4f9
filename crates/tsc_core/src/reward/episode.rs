//! EpisodeMetrics - per-episode statistics
//!
//! ## Metrics
//!
//! - step count and cumulative reward
//! - accumulated waits of vehicles that left the network
//! - truncation reason
//! - phase request outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut metrics = EpisodeMetrics::new();
//! metrics.record_step(reward, &info.departed_waiting_times);
//! metrics.set_truncation(TruncationReason::DemandExhausted);
//! let summary = metrics.summary(0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::signal::ChangeOutcome;

// ============================================================================
// TruncationReason
// ============================================================================

/// Why an episode was cut off. Natural termination never happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// No vehicles left in or waiting to enter the network
    DemandExhausted,
    /// Simulated time passed the configured budget
    TimeBudget,
}

// ============================================================================
// EpisodeMetrics
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    pub total_steps: u64,

    pub cumulative_reward: f64,

    /// Accumulated wait of every vehicle that left during the episode
    pub departed_waiting_times: Vec<f64>,

    pub truncation: Option<TruncationReason>,

    pub action_stats: ActionStats,
}

impl EpisodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, reward: f64, departed_waiting_times: &[f64]) {
        self.total_steps += 1;
        self.cumulative_reward += reward;
        self.departed_waiting_times.extend_from_slice(departed_waiting_times);
    }

    pub fn record_action(&mut self, phase: usize, outcome: ChangeOutcome) {
        self.action_stats.record(phase, outcome);
    }

    pub fn set_truncation(&mut self, reason: TruncationReason) {
        self.truncation = Some(reason);
    }

    /// Mean departed wait, 0 when nobody left.
    pub fn mean_departed_wait(&self) -> f64 {
        if self.departed_waiting_times.is_empty() {
            0.0
        } else {
            self.departed_waiting_times.iter().sum::<f64>() / self.departed_waiting_times.len() as f64
        }
    }

    pub fn departed_wait_percentile(&self, pct: f64) -> f64 {
        percentile(&self.departed_waiting_times, pct)
    }

    pub fn summary(&self, episode: usize) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            steps: self.total_steps,
            cumulative_reward: self.cumulative_reward,
            departed_vehicles: self.departed_waiting_times.len(),
            mean_waiting_time: self.mean_departed_wait(),
            p95_waiting_time: self.departed_wait_percentile(95.0),
            truncation: self.truncation,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Result row handed to whoever collects statistics across episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: u64,
    pub cumulative_reward: f64,
    pub departed_vehicles: usize,
    pub mean_waiting_time: f64,
    pub p95_waiting_time: f64,
    pub truncation: Option<TruncationReason>,
}

/// Linear-interpolation percentile; 0 for an empty sample.
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

// ============================================================================
// ActionStats
// ============================================================================

/// Change-request outcomes per requested phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionStats {
    pub requests: BTreeMap<usize, u32>,
    pub scheduled: BTreeMap<usize, u32>,
    pub too_early: u32,
}

impl ActionStats {
    pub fn record(&mut self, phase: usize, outcome: ChangeOutcome) {
        *self.requests.entry(phase).or_insert(0) += 1;
        match outcome {
            ChangeOutcome::Scheduled { .. } => *self.scheduled.entry(phase).or_insert(0) += 1,
            ChangeOutcome::TooEarly => self.too_early += 1,
            ChangeOutcome::SamePhase => {}
        }
    }

    pub fn request_count(&self, phase: usize) -> u32 {
        self.requests.get(&phase).copied().unwrap_or(0)
    }

    pub fn scheduled_count(&self, phase: usize) -> u32 {
        self.scheduled.get(&phase).copied().unwrap_or(0)
    }

    /// Scheduled share of all requests, 0 when none were made.
    pub fn switch_rate(&self) -> f64 {
        let total: u32 = self.requests.values().sum();
        if total == 0 {
            0.0
        } else {
            self.scheduled.values().sum::<u32>() as f64 / total as f64
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
