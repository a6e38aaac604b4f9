//! Reward selection by name.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ConfigError, ConfigWarning};
use crate::reward::RewardStrategy;

/// Named reward functions with optional weights.
///
/// An empty `weights` list means every function has weight 1. More than one
/// function builds a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub functions: Vec<String>,
    pub weights: Vec<f64>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { functions: vec!["diff_halted".to_string()], weights: Vec::new() }
    }
}

impl RewardConfig {
    pub fn single(name: &str) -> Self {
        Self { functions: vec![name.to_string()], weights: Vec::new() }
    }

    pub fn weighted(pairs: &[(&str, f64)]) -> Self {
        Self {
            functions: pairs.iter().map(|(name, _)| name.to_string()).collect(),
            weights: pairs.iter().map(|(_, w)| *w).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.functions.is_empty() {
            return Err(ConfigError::Validation("at least one reward function is required".to_string()));
        }
        if !self.weights.is_empty() && self.weights.len() != self.functions.len() {
            return Err(ConfigError::WeightMismatch { functions: self.functions.len(), weights: self.weights.len() });
        }
        if let Some(w) = self.weights.iter().find(|w| !w.is_finite()) {
            return Err(ConfigError::Validation(format!("reward weights must be finite, got {}", w)));
        }
        Ok(())
    }

    /// Build the strategy. Unknown names fall back to `diff_halted`.
    pub fn build(&self, warnings: &mut Vec<ConfigWarning>) -> Result<RewardStrategy, ConfigError> {
        self.validate()?;

        let mut strategies = Vec::with_capacity(self.functions.len());
        for (idx, name) in self.functions.iter().enumerate() {
            let weight = self.weights.get(idx).copied().unwrap_or(1.0);
            let strategy = match RewardStrategy::from_name(name, weight) {
                Some(s) => s,
                None => {
                    warn!(reward = %name, "unknown reward function, falling back to diff_halted");
                    warnings.push(ConfigWarning::UnknownReward { name: name.clone() });
                    RewardStrategy::diff_halted(weight)
                }
            };
            strategies.push(strategy);
        }

        if strategies.len() == 1 {
            Ok(strategies.remove(0))
        } else {
            Ok(RewardStrategy::composite(strategies))
        }
    }
}
