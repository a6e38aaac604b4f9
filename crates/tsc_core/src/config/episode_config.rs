//! Episode configuration, presets and loading.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ConfigError, ConfigWarning, RewardConfig};
use crate::discretizer::Discretizer;
use crate::lane::MetricKind;
use crate::reward::RewardStrategy;
use crate::signal::{default_four_way_phases, Phase, PhaseTable};

/// Everything needed to build an `Episode`.
///
/// Times are in simulator ticks (one tick = one simulated second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Ticks per control step
    pub delta_time: u32,
    pub yellow_time: u32,
    pub min_green_time: u32,
    /// Discretizer bins `I`
    pub discrete_intervals: u32,
    /// Discretizer saturation `M`
    pub max_lane_value: f64,
    /// Observation metrics, in slot order
    pub lane_metrics: Vec<String>,
    pub reward: RewardConfig,
    /// Let the simulator's stored program drive the signal
    pub fixed_program: bool,
    /// Simulated seconds after which the episode is truncated
    pub sim_time: u32,
    pub warm_up_time: u32,
    /// Pause before the single connection retry
    pub reconnect_pause_ms: u64,
    pub adaptive_program: String,
    pub fixed_program_id: String,
    /// First controller reported by the simulator when unset
    pub controller_id: Option<String>,
    /// Discovered from the controller's inbound lanes when unset
    pub lanes: Option<Vec<String>>,
    pub phases: Vec<Phase>,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            delta_time: 5,
            yellow_time: 4,
            min_green_time: 5,
            discrete_intervals: 6,
            max_lane_value: 60.0,
            lane_metrics: vec![MetricKind::Halted.name().to_string()],
            reward: RewardConfig::default(),
            fixed_program: false,
            sim_time: 43_800,
            warm_up_time: 600,
            reconnect_pause_ms: 1000,
            adaptive_program: "0".to_string(),
            fixed_program_id: "2".to_string(),
            controller_id: None,
            lanes: None,
            phases: default_four_way_phases(),
        }
    }
}

impl EpisodeConfig {
    /// Accumulated waiting time as both observation and objective.
    pub fn waiting_time() -> Self {
        Self {
            lane_metrics: vec![
                MetricKind::Halted.name().to_string(),
                MetricKind::CumulativeWaitingTime.name().to_string(),
            ],
            max_lane_value: 600.0,
            discrete_intervals: 20,
            reward: RewardConfig::single("diff_cumulative_waiting_time"),
            ..Self::default()
        }
    }

    /// Waiting time plus a bonus for spreading waits evenly over vehicles.
    pub fn fairness() -> Self {
        Self {
            reward: RewardConfig::weighted(&[("diff_cumulative_waiting_time", 1.0), ("fairness_delta", 10.0)]),
            ..Self::waiting_time()
        }
    }

    /// Stored signal program drives the intersection; actions are ignored.
    pub fn fixed_baseline() -> Self {
        Self { fixed_program: true, ..Self::default() }
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EpisodeConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EpisodeConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks that do not need any component to be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delta_time == 0 {
            return Err(ConfigError::Validation("delta_time must be at least 1 tick".to_string()));
        }
        if self.yellow_time == 0 {
            return Err(ConfigError::Validation("yellow_time must be at least 1 tick".to_string()));
        }
        if self.yellow_time >= self.delta_time {
            return Err(ConfigError::Validation(format!(
                "yellow_time ({}) must be shorter than delta_time ({})",
                self.yellow_time, self.delta_time
            )));
        }
        if self.discrete_intervals < 2 {
            return Err(ConfigError::Validation(format!(
                "discrete_intervals must be at least 2, got {}",
                self.discrete_intervals
            )));
        }
        if !self.max_lane_value.is_finite() || self.max_lane_value <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "max_lane_value must be positive, got {}",
                self.max_lane_value
            )));
        }
        if self.lane_metrics.is_empty() {
            return Err(ConfigError::Validation("at least one lane metric is required".to_string()));
        }
        if self.warm_up_time == 0 {
            return Err(ConfigError::Validation("warm_up_time must be at least 1 tick".to_string()));
        }
        if self.phases.is_empty() {
            return Err(ConfigError::Validation("phase table must contain at least one phase".to_string()));
        }
        if let Some(lanes) = &self.lanes {
            if lanes.is_empty() {
                return Err(ConfigError::Validation("explicit lane list must not be empty".to_string()));
            }
        }
        self.reward.validate()
    }

    /// Validate and build every configured component.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.validate()?;
        let mut warnings = Vec::new();

        let mut metrics = Vec::with_capacity(self.lane_metrics.len());
        for name in &self.lane_metrics {
            match name.parse::<MetricKind>() {
                Ok(kind) => metrics.push(kind),
                Err(_) => {
                    warn!(metric = %name, "unknown lane metric, falling back to halted");
                    warnings.push(ConfigWarning::UnknownMetric { name: name.clone() });
                    metrics.push(MetricKind::Halted);
                }
            }
        }

        let discretizer = Discretizer::new(self.discrete_intervals, self.max_lane_value)?;
        warnings.extend(discretizer.clamp_warning());

        let reward = self.reward.build(&mut warnings)?;
        let phases = PhaseTable::new(self.phases.clone())?;

        Ok(ResolvedConfig { metrics, discretizer, reward, phases, warnings })
    }

    pub fn reconnect_pause(&self) -> Duration {
        Duration::from_millis(self.reconnect_pause_ms)
    }

    /// Program id to select after connecting or restoring.
    pub fn program_id(&self) -> &str {
        if self.fixed_program {
            &self.fixed_program_id
        } else {
            &self.adaptive_program
        }
    }

    /// Control steps that fit in the time budget.
    pub fn total_time_steps(&self) -> u32 {
        self.sim_time / self.delta_time.max(1)
    }
}

/// A validated configuration with its built components.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub metrics: Vec<MetricKind>,
    pub discretizer: Discretizer,
    pub reward: RewardStrategy,
    pub phases: PhaseTable,
    pub warnings: Vec<ConfigWarning>,
}

// ============================================================================
// Tests
// ============================================================================
