//! Running totals that reward strategies difference against.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::lane::LaneMetrics;

/// Identity of one `Episode`, used to bind strategies to its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EpisodeId(u64);

impl EpisodeId {
    /// Fresh process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Jain's fairness index `(Σw)² / (n · Σw²)`; `0` when `Σw² == 0`.
pub fn jain_index<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for w in values {
        n += 1;
        sum += w;
        sum_sq += w * w;
    }
    if sum_sq == 0.0 {
        0.0
    } else {
        (sum * sum) / (n as f64 * sum_sq)
    }
}

/// Current totals over all controlled lanes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LaneTotals {
    pub total_halted: u32,
    pub total_waiting_time: f64,
    pub total_cumulative_waiting_time: f64,
    /// Jain index over every present vehicle's accumulated wait
    pub fairness_index: f64,
    /// Vehicles present on the controlled lanes
    pub vehicle_count: usize,
}

impl LaneTotals {
    pub fn from_lanes(lanes: &[LaneMetrics]) -> Self {
        let all_waits = || lanes.iter().flat_map(|l| l.per_vehicle_waiting_times.iter().copied());
        Self {
            total_halted: lanes.iter().map(|l| l.halted_count).sum(),
            total_waiting_time: lanes.iter().map(|l| l.instant_waiting_time).sum(),
            total_cumulative_waiting_time: lanes.iter().map(|l| l.cumulative_waiting_time).sum(),
            fairness_index: jain_index(all_waits()),
            vehicle_count: all_waits().count(),
        }
    }
}

/// Previous-step totals owned by the episode and advanced by strategies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateCounters {
    episode: EpisodeId,
    pub total_halted: u32,
    pub total_waiting_time: f64,
    pub total_cumulative_waiting_time: f64,
    pub fairness_index: f64,
}

impl AggregateCounters {
    pub fn new(episode: EpisodeId) -> Self {
        Self {
            episode,
            total_halted: 0,
            total_waiting_time: 0.0,
            total_cumulative_waiting_time: 0.0,
            fairness_index: 0.0,
        }
    }

    pub fn episode(&self) -> EpisodeId {
        self.episode
    }

    pub fn zero(&mut self) {
        *self = Self::new(self.episode);
    }

    /// Align every previous value with the given totals.
    pub fn sync_to(&mut self, totals: &LaneTotals) {
        self.total_halted = totals.total_halted;
        self.total_waiting_time = totals.total_waiting_time;
        self.total_cumulative_waiting_time = totals.total_cumulative_waiting_time;
        self.fairness_index = totals.fairness_index;
    }
}
