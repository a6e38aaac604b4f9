//! Episode Orchestration
//!
//! Ties the phase controller, lane metrics, discretizer and reward strategy
//! to one simulator connection. This is the only surface the learning loop
//! talks to.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──▶ connect (retry once) ──▶ discover lanes ──▶ warm_up ──▶ snapshot
//!                                                                  │
//!          ┌──────────────── reset (restore snapshot) ◀────────────┘
//!          ▼
//!        step × n ──▶ truncated ──▶ reset ...
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut episode = Episode::new(EpisodeConfig::default(), connector)?;
//! let (mut obs, _) = episode.reset()?;
//! loop {
//!     let out = episode.step(Some(policy(&obs)))?;
//!     if out.truncated {
//!         break;
//!     }
//!     obs = out.observation;
//! }
//! episode.close()?;
//! ```

mod runner;
mod step;

pub use runner::run_episodes;
pub use step::{Observation, ObservationSpace, StepInfo, StepOutcome};

use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ConfigWarning, EpisodeConfig};
use crate::discretizer::Discretizer;
use crate::error::{CoreError, Result};
use crate::lane::{LaneMetrics, MetricKind};
use crate::reward::{AggregateCounters, EpisodeId, EpisodeMetrics, LaneTotals, RewardStrategy, TruncationReason};
use crate::signal::PhaseController;
use crate::sim::{connect_with_retry, SimResult, Simulator, SimulatorConnector, SimulatorError};

type SnapshotOf<C> = <<C as SimulatorConnector>::Simulator as Simulator>::Snapshot;

pub struct Episode<C: SimulatorConnector> {
    connector: C,
    sim: C::Simulator,
    config: EpisodeConfig,
    controller: PhaseController,
    lanes: Vec<LaneMetrics>,
    metric_kinds: Vec<MetricKind>,
    discretizer: Discretizer,
    reward: RewardStrategy,
    counters: AggregateCounters,
    metrics: EpisodeMetrics,
    warm_up_snapshot: Option<SnapshotOf<C>>,
    warnings: Vec<ConfigWarning>,
    closed: bool,
}

impl<C: SimulatorConnector> Episode<C> {
    /// Validate `config`, connect, warm up and take the reset snapshot.
    ///
    /// Configuration errors are raised before any connection is attempted.
    pub fn new(config: EpisodeConfig, mut connector: C) -> Result<Self> {
        let resolved = config.resolve()?;
        let mut sim = connect_with_retry(&mut connector, config.reconnect_pause())?;

        let controller_id = match &config.controller_id {
            Some(id) => id.clone(),
            None => sim
                .query_controller_ids()?
                .into_iter()
                .next()
                .ok_or_else(|| SimulatorError::command("query_controller_ids", "no signal controllers in network"))?,
        };
        let lane_ids = match &config.lanes {
            Some(lanes) => lanes.clone(),
            None => discover_inbound_lanes(&mut sim, &controller_id)?,
        };
        if lane_ids.is_empty() {
            return Err(CoreError::Config(ConfigError::Validation(format!(
                "controller {} has no inbound lanes",
                controller_id
            ))));
        }

        let counters = AggregateCounters::new(EpisodeId::next());
        let mut reward = resolved.reward;
        reward.set_env(&counters);

        let controller =
            PhaseController::new(controller_id, resolved.phases, config.yellow_time, config.min_green_time);

        info!(
            episode = counters.episode().get(),
            controller = controller.controller_id(),
            lanes = lane_ids.len(),
            reward = reward.name(),
            fixed_program = config.fixed_program,
            "episode connected"
        );

        let warm_up_time = config.warm_up_time;
        let mut episode = Self {
            connector,
            sim,
            config,
            controller,
            lanes: lane_ids.into_iter().map(LaneMetrics::new).collect(),
            metric_kinds: resolved.metrics,
            discretizer: resolved.discretizer,
            reward,
            counters,
            metrics: EpisodeMetrics::new(),
            warm_up_snapshot: None,
            warnings: resolved.warnings,
            closed: false,
        };
        episode.warm_up(warm_up_time)?;
        Ok(episode)
    }

    /// Let traffic settle for `duration` ticks, then snapshot the state.
    ///
    /// Phase 0 is forced for the final tick so every reset starts from the
    /// same signal, and the controller goes back to `Init`.
    fn warm_up(&mut self, duration: u32) -> Result<()> {
        self.ensure_open()?;
        self.sim.advance_ticks(duration.saturating_sub(1))?;
        let first = self.controller.phases().phase(0).signal.clone();
        self.sim.apply_signal_pattern(self.controller.controller_id(), &first)?;
        self.sim.advance_ticks(1)?;

        self.controller.reset();
        self.refresh_lanes()?;
        self.warm_up_snapshot = Some(self.sim.save_snapshot()?);
        self.counters.sync_to(&LaneTotals::from_lanes(&self.lanes));

        self.sim.select_program(self.controller.controller_id(), self.config.program_id())?;
        self.sim.query_departed_vehicle_waiting_times()?;

        let sim_time = self.sim.simulated_time()?;
        info!(duration, sim_time, "warm-up snapshot taken");
        Ok(())
    }

    /// Advance one control step.
    ///
    /// `None` keeps whatever change is already pending. In fixed-program mode
    /// the action is ignored entirely.
    pub fn step(&mut self, action: Option<usize>) -> Result<StepOutcome> {
        self.ensure_open()?;

        if self.config.fixed_program {
            if let Some(action) = action {
                debug!(action, "fixed program mode, action ignored");
            }
            self.sim.advance_ticks(self.config.delta_time)?;
        } else {
            if let Some(action) = action {
                let outcome = self.controller.request_change(&mut self.sim, action)?;
                debug!(action, ?outcome, state = ?self.controller.state(), "phase change requested");
                self.metrics.record_action(action, outcome);
            }
            for _ in 0..self.config.delta_time {
                self.controller.tick(&mut self.sim)?;
            }
        }

        self.refresh_lanes()?;
        let observation = self.observe()?;
        let totals = LaneTotals::from_lanes(&self.lanes);
        let reward = self.reward.compute_reward(&totals, &mut self.counters)?;

        let departed = self.sim.query_departed_vehicle_waiting_times()?;
        let mut info = self.collect_info(&totals, departed)?;
        info.truncation = self.check_truncation(info.sim_time)?;

        self.metrics.record_step(reward, &info.departed_waiting_times);
        if let Some(reason) = info.truncation {
            self.metrics.set_truncation(reason);
            info!(
                ?reason,
                sim_time = info.sim_time,
                steps = self.metrics.total_steps,
                cumulative_reward = self.metrics.cumulative_reward,
                "episode truncated"
            );
        }

        Ok(StepOutcome { observation, reward, terminated: false, truncated: info.truncation.is_some(), info })
    }

    /// Return to the warm-up snapshot without opening a new connection.
    ///
    /// A failed restore is retried once on a fresh connection.
    pub fn reset(&mut self) -> Result<(Observation, StepInfo)> {
        self.ensure_open()?;
        let snapshot = self.warm_up_snapshot.clone().ok_or(CoreError::MissingSnapshot)?;

        self.controller.reset();
        self.lanes.iter_mut().for_each(LaneMetrics::reset);
        self.counters.zero();
        self.metrics.reset();

        self.restore(&snapshot)?;
        self.sim.select_program(self.controller.controller_id(), self.config.program_id())?;
        self.sim.query_departed_vehicle_waiting_times()?;

        self.refresh_lanes()?;
        let totals = LaneTotals::from_lanes(&self.lanes);
        self.counters.sync_to(&totals);

        let observation = self.observe()?;
        let info = self.collect_info(&totals, Vec::new())?;
        debug!(sim_time = info.sim_time, vehicles = totals.vehicle_count, "episode reset");
        Ok((observation, info))
    }

    /// Close the simulator connection. Further calls fail with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sim.close()?;
        info!(episode = self.counters.episode().get(), "episode closed");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of selectable phases.
    pub fn action_count(&self) -> usize {
        self.controller.phases().real_count()
    }

    pub fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::new(
            self.controller.phases().init_index() as u32,
            self.metric_kinds.len() * self.lanes.len(),
            self.discretizer.top_bin(),
        )
    }

    pub fn total_time_steps(&self) -> u32 {
        self.config.total_time_steps()
    }

    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn lanes(&self) -> &[LaneMetrics] {
        &self.lanes
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn counters(&self) -> &AggregateCounters {
        &self.counters
    }

    pub fn metrics(&self) -> &EpisodeMetrics {
        &self.metrics
    }

    pub fn reward(&self) -> &RewardStrategy {
        &self.reward
    }

    pub fn simulator(&self) -> &C::Simulator {
        &self.sim
    }

    pub fn simulator_mut(&mut self) -> &mut C::Simulator {
        &mut self.sim
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(SimulatorError::Closed.into())
        } else {
            Ok(())
        }
    }

    fn refresh_lanes(&mut self) -> Result<()> {
        for lane in &mut self.lanes {
            lane.refresh(&mut self.sim)?;
        }
        Ok(())
    }

    fn observe(&self) -> Result<Observation> {
        let mut values = Vec::with_capacity(1 + self.metric_kinds.len() * self.lanes.len());
        values.push(self.controller.current_phase() as u32);

        for &kind in &self.metric_kinds {
            for lane in &self.lanes {
                let value = lane.metric(kind);
                let bin = self.discretizer.encode(value).map_err(|_| CoreError::DataIntegrity {
                    lane_id: lane.lane_id.clone(),
                    metric: kind,
                    value,
                })?;
                values.push(bin);
            }
        }
        Ok(Observation { values })
    }

    fn collect_info(&mut self, totals: &LaneTotals, departed: Vec<f64>) -> Result<StepInfo> {
        let vehicles = self.sim.query_vehicle_count()?;
        let (mean_waiting_time, mean_acc_waiting_time) = if vehicles == 0 {
            (0.0, 0.0)
        } else {
            (
                totals.total_waiting_time / vehicles as f64,
                totals.total_cumulative_waiting_time / vehicles as f64,
            )
        };
        Ok(StepInfo {
            sim_time: self.sim.simulated_time()?,
            departed_waiting_times: departed,
            mean_waiting_time,
            mean_acc_waiting_time,
            truncation: None,
        })
    }

    fn check_truncation(&mut self, sim_time: f64) -> Result<Option<TruncationReason>> {
        if self.sim.query_remaining_demand()? == 0 {
            Ok(Some(TruncationReason::DemandExhausted))
        } else if sim_time > self.config.sim_time as f64 {
            Ok(Some(TruncationReason::TimeBudget))
        } else {
            Ok(None)
        }
    }

    fn restore(&mut self, snapshot: &SnapshotOf<C>) -> Result<()> {
        let first = match self.sim.restore_snapshot(snapshot) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!(error = %first, "snapshot restore failed, reconnecting");

        if let Err(e) = self.sim.close() {
            debug!(error = %e, "closing broken connection failed");
        }
        self.sim = self.connector.connect()?;
        self.sim.restore_snapshot(snapshot).map_err(|second| {
            error!(error = %second, "snapshot restore failed after reconnect");
            CoreError::from(second)
        })
    }
}

impl<C: SimulatorConnector> Drop for Episode<C> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.sim.close() {
                warn!(error = %e, "closing simulator on drop failed");
            }
        }
    }
}

impl<C: SimulatorConnector> std::fmt::Debug for Episode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Episode")
            .field("episode", &self.counters.episode())
            .field("controller", &self.controller.state())
            .field("lanes", &self.lanes.len())
            .field("reward", &self.reward.name())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Inbound lanes of a controller, in link order without duplicates.
fn discover_inbound_lanes<S: Simulator>(sim: &mut S, controller_id: &str) -> SimResult<Vec<String>> {
    let mut lanes: Vec<String> = Vec::new();
    for lane in sim.query_controlled_lanes(controller_id)? {
        if lane.contains("in") && !lanes.contains(&lane) {
            lanes.push(lane);
        }
    }
    Ok(lanes)
}

// ============================================================================
// Tests
// ============================================================================
