//! Lane Metrics
//!
//! Per-lane telemetry pulled from the simulator once per control step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sim::{SimResult, Simulator};

/// Lane quantity that can be encoded into the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Vehicles halted on the lane
    Halted,
    /// Summed instantaneous waiting time on the lane
    WaitingTime,
    /// Summed accumulated waiting time of vehicles present on the lane
    CumulativeWaitingTime,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Halted => "halted",
            MetricKind::WaitingTime => "waitingTime",
            MetricKind::CumulativeWaitingTime => "cumulativeWaitingTime",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "halted" => Ok(MetricKind::Halted),
            "waitingTime" | "waiting_time" => Ok(MetricKind::WaitingTime),
            "cumulativeWaitingTime" | "cumulative_waiting_time" => Ok(MetricKind::CumulativeWaitingTime),
            other => Err(format!("unknown lane metric '{}'", other)),
        }
    }
}

/// Telemetry of one controlled inbound lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneMetrics {
    pub lane_id: String,
    /// Vehicles halted during the last tick
    pub halted_count: u32,
    /// Summed instantaneous waiting time
    pub instant_waiting_time: f64,
    /// Sum of `per_vehicle_waiting_times`
    pub cumulative_waiting_time: f64,
    /// Accumulated wait of each vehicle currently on the lane (snapshot, not a running sum)
    pub per_vehicle_waiting_times: Vec<f64>,
}

impl LaneMetrics {
    pub fn new(lane_id: impl Into<String>) -> Self {
        Self { lane_id: lane_id.into(), ..Self::default() }
    }

    /// Re-query the lane. The per-vehicle list is replaced, never appended to.
    pub fn refresh<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> SimResult<()> {
        self.halted_count = sim.query_lane_halted(&self.lane_id)?;
        self.instant_waiting_time = sim.query_lane_waiting_time(&self.lane_id)?;
        self.per_vehicle_waiting_times = sim.query_present_vehicle_waiting_times(&self.lane_id)?;
        self.cumulative_waiting_time = self.per_vehicle_waiting_times.iter().sum();
        Ok(())
    }

    /// Zero every field without touching the simulator.
    pub fn reset(&mut self) {
        self.halted_count = 0;
        self.instant_waiting_time = 0.0;
        self.cumulative_waiting_time = 0.0;
        self.per_vehicle_waiting_times.clear();
    }

    pub fn metric(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Halted => self.halted_count as f64,
            MetricKind::WaitingTime => self.instant_waiting_time,
            MetricKind::CumulativeWaitingTime => self.cumulative_waiting_time,
        }
    }
}
