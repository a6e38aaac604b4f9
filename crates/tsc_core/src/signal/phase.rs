//! Phase Table
//!
//! Immutable list of controllable phases plus the reserved all-red `Init`
//! phase, which always sits last.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One right-of-way combination and the guard pattern shown when leaving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phase {
    /// Steady signal state string, one character per controlled link
    pub signal: String,
    /// Yellow transition shown while vacating this phase
    pub yellow: String,
}

impl Phase {
    pub fn new(signal: impl Into<String>, yellow: impl Into<String>) -> Self {
        Self { signal: signal.into(), yellow: yellow.into() }
    }

    /// All-red pattern over `links` links.
    pub fn all_red(links: usize) -> Self {
        let red = "r".repeat(links);
        Self { signal: red.clone(), yellow: red }
    }
}

/// Phases indexed `0..N-1`; index `N-1` is the reserved `Init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTable {
    phases: Vec<Phase>,
    init_index: usize,
}

impl PhaseTable {
    /// Build a table from the real phases; `Init` is appended.
    pub fn new(real_phases: Vec<Phase>) -> Result<Self, ConfigError> {
        let first = real_phases
            .first()
            .ok_or_else(|| ConfigError::Validation("phase table must contain at least one phase".to_string()))?;
        let links = first.signal.chars().count();
        if links == 0 {
            return Err(ConfigError::Validation("phase signal patterns must not be empty".to_string()));
        }

        for (idx, phase) in real_phases.iter().enumerate() {
            let signal_len = phase.signal.chars().count();
            let yellow_len = phase.yellow.chars().count();
            if signal_len != links || yellow_len != links {
                return Err(ConfigError::Validation(format!(
                    "phase {} has patterns of length {}/{}, expected {}",
                    idx, signal_len, yellow_len, links
                )));
            }
        }

        let mut phases = real_phases;
        phases.push(Phase::all_red(links));
        let init_index = phases.len() - 1;
        Ok(Self { phases, init_index })
    }

    /// Single four-approach intersection, 16 controlled links.
    pub fn four_way() -> Self {
        let mut phases = default_four_way_phases();
        phases.push(Phase::all_red(16));
        Self { init_index: phases.len() - 1, phases }
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// Panics if `index` is outside the table; current and pending indices never are.
    pub fn phase(&self, index: usize) -> &Phase {
        &self.phases[index]
    }

    pub fn init_index(&self) -> usize {
        self.init_index
    }

    pub fn is_init(&self, index: usize) -> bool {
        index == self.init_index
    }

    /// Number of selectable phases (the action space size).
    pub fn real_count(&self) -> usize {
        self.init_index
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn real_phases(&self) -> &[Phase] {
        &self.phases[..self.init_index]
    }

    pub fn link_count(&self) -> usize {
        self.phases[self.init_index].signal.chars().count()
    }
}

/// Real phases of the four-approach intersection, in action order.
pub fn default_four_way_phases() -> Vec<Phase> {
    vec![
        Phase::new("GGGgrrrrGGGgrrrr", "yyyyrrrryyyyrrrr"), // N-S both, with left turn
        Phase::new("rrrrGGGgrrrrGGGg", "rrrryyyyrrrryyyy"), // E-W both, with left turn
        Phase::new("rrrrrrrrGGGGrrrr", "rrrrrrrryyyyrrrr"), // S only
        Phase::new("GGGGrrrrrrrrrrrr", "yyyyrrrrrrrrrrrr"), // N only
        Phase::new("rrrrrrrrrrrrGGGG", "rrrrrrrrrrrryyyy"), // W only
        Phase::new("rrrrGGGGrrrrrrrr", "rrrryyyyrrrrrrrr"), // E only
        Phase::new("GGGrrrrrGGGrrrrr", "yyyrrrrryyyrrrrr"), // N-S, no left turn
        Phase::new("rrrrGGGrrrrrGGGr", "rrrryyyrrrrryyyr"), // E-W, no left turn
    ]
}
