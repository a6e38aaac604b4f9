//! In-crate test doubles for the simulator contract.

use std::collections::BTreeMap;

use crate::sim::{SimResult, Simulator, SimulatorConnector, SimulatorError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneReading {
    pub halted: u32,
    pub waiting_time: f64,
    pub vehicle_waits: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct RecordingSnapshot {
    ticks: u64,
    pattern: Option<String>,
    lanes: BTreeMap<String, LaneReading>,
}

/// Records every signal pattern and which pattern was active on each tick.
/// Lane readings are whatever the test writes into `lanes`.
#[derive(Debug, Clone)]
pub struct RecordingSimulator {
    pub ticks: u64,
    pub pattern: Option<String>,
    pub applied: Vec<String>,
    /// Pattern in force during each advanced tick.
    pub timeline: Vec<Option<String>>,
    pub program: Option<String>,
    pub controlled_lanes: Vec<String>,
    pub lanes: BTreeMap<String, LaneReading>,
    pub departed: Vec<f64>,
    pub remaining_demand: u32,
    pub restore_failures: u32,
    pub closed: bool,
}

impl RecordingSimulator {
    pub fn new() -> Self {
        let controlled_lanes: Vec<String> = ["n_in_0", "n_in_0", "e_in_0", "s_in_0", "w_in_0", "s_out_0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let lanes = ["n_in_0", "e_in_0", "s_in_0", "w_in_0"]
            .iter()
            .map(|id| (id.to_string(), LaneReading::default()))
            .collect();
        Self {
            ticks: 0,
            pattern: None,
            applied: Vec::new(),
            timeline: Vec::new(),
            program: None,
            controlled_lanes,
            lanes,
            departed: Vec::new(),
            remaining_demand: 100,
            restore_failures: 0,
            closed: false,
        }
    }

    pub fn set_lane(&mut self, lane_id: &str, halted: u32, waiting_time: f64, vehicle_waits: Vec<f64>) {
        self.lanes.insert(lane_id.to_string(), LaneReading { halted, waiting_time, vehicle_waits });
    }

    fn lane(&self, lane_id: &str) -> SimResult<&LaneReading> {
        self.lanes
            .get(lane_id)
            .ok_or_else(|| SimulatorError::command("lane", format!("unknown lane {}", lane_id)))
    }

    fn ensure_open(&self) -> SimResult<()> {
        if self.closed {
            Err(SimulatorError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Simulator for RecordingSimulator {
    type Snapshot = RecordingSnapshot;

    fn apply_signal_pattern(&mut self, _controller_id: &str, pattern: &str) -> SimResult<()> {
        self.ensure_open()?;
        self.applied.push(pattern.to_string());
        self.pattern = Some(pattern.to_string());
        Ok(())
    }

    fn select_program(&mut self, _controller_id: &str, program_id: &str) -> SimResult<()> {
        self.ensure_open()?;
        self.program = Some(program_id.to_string());
        Ok(())
    }

    fn advance_ticks(&mut self, ticks: u32) -> SimResult<()> {
        self.ensure_open()?;
        for _ in 0..ticks {
            self.timeline.push(self.pattern.clone());
            self.ticks += 1;
        }
        Ok(())
    }

    fn simulated_time(&mut self) -> SimResult<f64> {
        self.ensure_open()?;
        Ok(self.ticks as f64)
    }

    fn query_controller_ids(&mut self) -> SimResult<Vec<String>> {
        self.ensure_open()?;
        Ok(vec!["tl_0".to_string()])
    }

    fn query_controlled_lanes(&mut self, _controller_id: &str) -> SimResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.controlled_lanes.clone())
    }

    fn query_lane_halted(&mut self, lane_id: &str) -> SimResult<u32> {
        self.ensure_open()?;
        Ok(self.lane(lane_id)?.halted)
    }

    fn query_lane_waiting_time(&mut self, lane_id: &str) -> SimResult<f64> {
        self.ensure_open()?;
        Ok(self.lane(lane_id)?.waiting_time)
    }

    fn query_present_vehicle_waiting_times(&mut self, lane_id: &str) -> SimResult<Vec<f64>> {
        self.ensure_open()?;
        Ok(self.lane(lane_id)?.vehicle_waits.clone())
    }

    fn query_departed_vehicle_waiting_times(&mut self) -> SimResult<Vec<f64>> {
        self.ensure_open()?;
        Ok(std::mem::take(&mut self.departed))
    }

    fn query_remaining_demand(&mut self) -> SimResult<u32> {
        self.ensure_open()?;
        Ok(self.remaining_demand)
    }

    fn query_vehicle_count(&mut self) -> SimResult<u32> {
        self.ensure_open()?;
        Ok(self.lanes.values().map(|l| l.vehicle_waits.len() as u32).sum())
    }

    fn save_snapshot(&mut self) -> SimResult<RecordingSnapshot> {
        self.ensure_open()?;
        Ok(RecordingSnapshot { ticks: self.ticks, pattern: self.pattern.clone(), lanes: self.lanes.clone() })
    }

    fn restore_snapshot(&mut self, snapshot: &RecordingSnapshot) -> SimResult<()> {
        self.ensure_open()?;
        if self.restore_failures > 0 {
            self.restore_failures -= 1;
            return Err(SimulatorError::Snapshot("state file unreadable".to_string()));
        }
        self.ticks = snapshot.ticks;
        self.pattern = snapshot.pattern.clone();
        self.lanes = snapshot.lanes.clone();
        self.departed.clear();
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Hands out `RecordingSimulator`s, failing the first `failures` attempts.
#[derive(Debug, Default)]
pub struct RecordingConnector {
    pub failures: u32,
    pub attempts: u32,
    /// Restore failures injected into the next connection only.
    pub restore_failures: u32,
}

impl RecordingConnector {
    pub fn new(failures: u32) -> Self {
        Self { failures, attempts: 0, restore_failures: 0 }
    }
}

impl SimulatorConnector for RecordingConnector {
    type Simulator = RecordingSimulator;

    fn connect(&mut self) -> SimResult<RecordingSimulator> {
        self.attempts += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SimulatorError::Connection("connection refused".to_string()));
        }
        let mut sim = RecordingSimulator::new();
        sim.restore_failures = std::mem::take(&mut self.restore_failures);
        Ok(sim)
    }
}
