use thiserror::Error;

use crate::config::ConfigError;
use crate::discretizer::DiscretizeError;
use crate::lane::MetricKind;
use crate::sim::SimulatorError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulator error: {0}")]
    Simulator(#[from] SimulatorError),

    #[error("Discretization error: {0}")]
    Discretize(#[from] DiscretizeError),

    #[error("Reward strategy '{strategy}' is not bound to this episode")]
    NotBound { strategy: String },

    #[error("Invalid action {action}: expected a phase index below {action_count}")]
    InvalidAction { action: usize, action_count: usize },

    #[error("Simulator reported {metric} = {value} on lane {lane_id}, which is not a valid measurement")]
    DataIntegrity {
        lane_id: String,
        metric: MetricKind,
        value: f64,
    },

    #[error("No warm-up snapshot has been taken")]
    MissingSnapshot,
}

impl CoreError {
    /// Whether the episode can keep running after this error.
    ///
    /// Simulator failures leave the connection in an unknown state, and data
    /// integrity violations mean the collaborator broke its contract.
    pub fn is_fatal(&self) -> bool {
        match self {
            CoreError::InvalidAction { .. } => false,
            CoreError::NotBound { .. } => false,
            CoreError::Config(_) => true,
            CoreError::Simulator(_) => true,
            CoreError::Discretize(_) => true,
            CoreError::DataIntegrity { .. } => true,
            CoreError::MissingSnapshot => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
