//! Deterministic scripted traffic simulator for integration tests.
//!
//! Four single-lane approaches. Each tick a vehicle may arrive on every lane
//! (seeded ChaCha8), the front vehicle of a lane with green leaves, and every
//! vehicle on a red lane waits one more second.

#![allow(dead_code)]

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use tsc_core::sim::{SimResult, Simulator, SimulatorConnector, SimulatorError};
use tsc_core::{EpisodeConfig, PhaseTable, StepOutcome};

pub const LANES: [(&str, usize); 4] = [("n_in_0", 0), ("e_in_0", 4), ("s_in_0", 8), ("w_in_0", 12)];

const FIXED_GREEN: u64 = 30;
const FIXED_YELLOW: u64 = 4;

#[derive(Debug, Clone, PartialEq)]
struct Vehicle {
    accumulated: f64,
    stopped: f64,
}

/// Everything a snapshot has to carry, including the arrival stream.
#[derive(Debug, Clone)]
pub struct TrafficState {
    rng: ChaCha8Rng,
    tick: u64,
    pattern: String,
    program: Option<String>,
    queues: BTreeMap<String, Vec<Vehicle>>,
    departed: Vec<f64>,
    pending_demand: u32,
}

#[derive(Debug)]
pub struct ScriptedSimulator {
    state: TrafficState,
    arrival_rate: f64,
    pub timeline: Vec<String>,
    pub restore_failures: u32,
    pub closed: bool,
}

impl ScriptedSimulator {
    pub fn new(seed: u64, demand: u32, arrival_rate: f64) -> Self {
        let queues = LANES.iter().map(|(id, _)| (id.to_string(), Vec::new())).collect();
        Self {
            state: TrafficState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                tick: 0,
                pattern: "r".repeat(16),
                program: None,
                queues,
                departed: Vec::new(),
                pending_demand: demand,
            },
            arrival_rate,
            timeline: Vec::new(),
            restore_failures: 0,
            closed: false,
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.state.program.as_deref()
    }

    pub fn present_vehicles(&self) -> usize {
        self.state.queues.values().map(Vec::len).sum()
    }

    fn open(&self) -> SimResult<()> {
        if self.closed {
            Err(SimulatorError::Closed)
        } else {
            Ok(())
        }
    }

    fn queue(&self, lane_id: &str) -> SimResult<&Vec<Vehicle>> {
        self.open()?;
        self.state
            .queues
            .get(lane_id)
            .ok_or_else(|| SimulatorError::command("lane", format!("unknown lane {}", lane_id)))
    }

    fn fixed_program_pattern(tick: u64) -> String {
        let table = PhaseTable::four_way();
        let period = 2 * (FIXED_GREEN + FIXED_YELLOW);
        let t = tick % period;
        let (phase, yellow) = match t {
            t if t < FIXED_GREEN => (0, false),
            t if t < FIXED_GREEN + FIXED_YELLOW => (0, true),
            t if t < 2 * FIXED_GREEN + FIXED_YELLOW => (1, false),
            _ => (1, true),
        };
        let p = &table.real_phases()[phase];
        if yellow {
            p.yellow.clone()
        } else {
            p.signal.clone()
        }
    }

    fn step_once(&mut self) {
        let s = &mut self.state;
        if s.program.as_deref() == Some("2") {
            s.pattern = Self::fixed_program_pattern(s.tick);
        }
        self.timeline.push(s.pattern.clone());

        for (lane_id, link) in LANES {
            let green = matches!(s.pattern.as_bytes().get(link), Some(b'G') | Some(b'g'));
            let queue = s.queues.get_mut(lane_id).expect("scripted lane");

            if s.pending_demand > 0 && s.rng.gen_bool(self.arrival_rate) {
                queue.push(Vehicle { accumulated: 0.0, stopped: 0.0 });
                s.pending_demand -= 1;
            }

            if green {
                if !queue.is_empty() {
                    let leaving = queue.remove(0);
                    s.departed.push(leaving.accumulated);
                }
                for v in queue.iter_mut() {
                    v.stopped = 0.0;
                }
            } else {
                for v in queue.iter_mut() {
                    v.accumulated += 1.0;
                    v.stopped += 1.0;
                }
            }
        }
        s.tick += 1;
    }
}

impl Simulator for ScriptedSimulator {
    type Snapshot = TrafficState;

    fn apply_signal_pattern(&mut self, _controller_id: &str, pattern: &str) -> SimResult<()> {
        self.open()?;
        if pattern.len() != 16 {
            return Err(SimulatorError::command("setRedYellowGreenState", "wrong pattern length"));
        }
        self.state.pattern = pattern.to_string();
        Ok(())
    }

    fn select_program(&mut self, _controller_id: &str, program_id: &str) -> SimResult<()> {
        self.open()?;
        self.state.program = Some(program_id.to_string());
        Ok(())
    }

    fn advance_ticks(&mut self, ticks: u32) -> SimResult<()> {
        self.open()?;
        for _ in 0..ticks {
            self.step_once();
        }
        Ok(())
    }

    fn simulated_time(&mut self) -> SimResult<f64> {
        self.open()?;
        Ok(self.state.tick as f64)
    }

    fn query_controller_ids(&mut self) -> SimResult<Vec<String>> {
        self.open()?;
        Ok(vec!["J1".to_string()])
    }

    fn query_controlled_lanes(&mut self, _controller_id: &str) -> SimResult<Vec<String>> {
        self.open()?;
        Ok(LANES.iter().flat_map(|(id, _)| std::iter::repeat(id.to_string()).take(4)).collect())
    }

    fn query_lane_halted(&mut self, lane_id: &str) -> SimResult<u32> {
        Ok(self.queue(lane_id)?.iter().filter(|v| v.stopped > 0.0).count() as u32)
    }

    fn query_lane_waiting_time(&mut self, lane_id: &str) -> SimResult<f64> {
        Ok(self.queue(lane_id)?.iter().map(|v| v.stopped).sum())
    }

    fn query_present_vehicle_waiting_times(&mut self, lane_id: &str) -> SimResult<Vec<f64>> {
        Ok(self.queue(lane_id)?.iter().map(|v| v.accumulated).collect())
    }

    fn query_departed_vehicle_waiting_times(&mut self) -> SimResult<Vec<f64>> {
        self.open()?;
        Ok(std::mem::take(&mut self.state.departed))
    }

    fn query_remaining_demand(&mut self) -> SimResult<u32> {
        self.open()?;
        Ok(self.state.pending_demand + self.present_vehicles() as u32)
    }

    fn query_vehicle_count(&mut self) -> SimResult<u32> {
        self.open()?;
        Ok(self.present_vehicles() as u32)
    }

    fn save_snapshot(&mut self) -> SimResult<TrafficState> {
        self.open()?;
        Ok(self.state.clone())
    }

    fn restore_snapshot(&mut self, snapshot: &TrafficState) -> SimResult<()> {
        self.open()?;
        if self.restore_failures > 0 {
            self.restore_failures -= 1;
            return Err(SimulatorError::Snapshot("cannot load state".to_string()));
        }
        self.state = snapshot.clone();
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScriptedConnector {
    pub seed: u64,
    pub demand: u32,
    pub arrival_rate: f64,
    pub connect_failures: u32,
    /// Restore failures of the next connection handed out
    pub restore_failures: u32,
    pub attempts: u32,
}

impl ScriptedConnector {
    pub fn new(seed: u64) -> Self {
        Self { seed, demand: 100_000, arrival_rate: 0.2, connect_failures: 0, restore_failures: 0, attempts: 0 }
    }

    pub fn with_demand(mut self, demand: u32) -> Self {
        self.demand = demand;
        self
    }
}

impl SimulatorConnector for ScriptedConnector {
    type Simulator = ScriptedSimulator;

    fn connect(&mut self) -> SimResult<ScriptedSimulator> {
        self.attempts += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(SimulatorError::Connection("port not open".to_string()));
        }
        let mut sim = ScriptedSimulator::new(self.seed, self.demand, self.arrival_rate);
        sim.restore_failures = std::mem::take(&mut self.restore_failures);
        Ok(sim)
    }
}

/// Short episodes that still see real queues.
pub fn test_config() -> EpisodeConfig {
    EpisodeConfig {
        warm_up_time: 60,
        sim_time: 600,
        reconnect_pause_ms: 0,
        lane_metrics: vec!["halted".to_string(), "cumulativeWaitingTime".to_string()],
        max_lane_value: 300.0,
        discrete_intervals: 12,
        ..EpisodeConfig::default()
    }
}

pub fn fingerprint(outcomes: &[StepOutcome]) -> String {
    let mut hasher = Sha256::new();
    for outcome in outcomes {
        let json = serde_json::to_vec(outcome).expect("outcome serializes");
        hasher.update(&json);
    }
    format!("{:x}", hasher.finalize())
}

/// Every pattern is a steady signal or the yellow of the phase most recently
/// vacated, and two different greens are never adjacent.
pub fn assert_safe_timeline(table: &PhaseTable, timeline: &[String]) {
    let steady = |pattern: &str| table.real_phases().iter().position(|p| p.signal == pattern);
    let mut last_steady: Option<usize> = None;
    let mut previous: Option<&str> = None;

    for pattern in timeline {
        match steady(pattern) {
            Some(idx) => {
                if let Some(prev) = last_steady {
                    if prev != idx {
                        let yellow = table.real_phases()[prev].yellow.as_str();
                        assert_eq!(previous, Some(yellow), "green {} directly after green {}", idx, prev);
                    }
                }
                last_steady = Some(idx);
            }
            None => {
                let prev = last_steady.expect("yellow before any green");
                assert_eq!(pattern, &table.real_phases()[prev].yellow, "unexpected pattern");
            }
        }
        previous = Some(pattern);
    }
}
