//! Values handed to the learning loop.

use serde::{Deserialize, Serialize};

use crate::reward::TruncationReason;

/// `[phase, metric₁ per lane…, metric₂ per lane…]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub values: Vec<u32>,
}

impl Observation {
    /// Current phase slot; equals the action count while at `Init`.
    pub fn phase(&self) -> u32 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Encoded metric slots, after the phase slot.
    pub fn bins(&self) -> &[u32] {
        self.values.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Inclusive per-slot bounds of an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub low: Vec<u32>,
    pub high: Vec<u32>,
}

impl ObservationSpace {
    /// Phase slot `[0, phase_max]`, then `slots` metric slots in `[0, top_bin]`.
    pub fn new(phase_max: u32, slots: usize, top_bin: u32) -> Self {
        let mut high = Vec::with_capacity(slots + 1);
        high.push(phase_max);
        high.extend(std::iter::repeat(top_bin).take(slots));
        Self { low: vec![0; slots + 1], high }
    }

    pub fn len(&self) -> usize {
        self.high.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty()
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        observation.len() == self.len()
            && observation
                .values
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| lo <= v && v <= hi)
    }
}

/// Diagnostics attached to every step and reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Simulated seconds
    pub sim_time: f64,
    /// Accumulated wait of each vehicle that left since the previous step
    pub departed_waiting_times: Vec<f64>,
    /// Instantaneous waiting time per vehicle in the network
    pub mean_waiting_time: f64,
    /// Accumulated waiting time per vehicle in the network
    pub mean_acc_waiting_time: f64,
    pub truncation: Option<TruncationReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    /// Always false; episodes only end by truncation
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_bounds() {
        let space = ObservationSpace::new(8, 4, 5);
        assert_eq!(space.len(), 5);
        assert_eq!(space.low, vec![0; 5]);
        assert_eq!(space.high, vec![8, 5, 5, 5, 5]);

        assert!(space.contains(&Observation { values: vec![8, 0, 5, 1, 2] }));
        assert!(!space.contains(&Observation { values: vec![9, 0, 0, 0, 0] }));
        assert!(!space.contains(&Observation { values: vec![0, 6, 0, 0, 0] }));
        assert!(!space.contains(&Observation { values: vec![0, 0, 0] }));
    }

    #[test]
    fn test_observation_slots() {
        let obs = Observation { values: vec![3, 1, 2] };
        assert_eq!(obs.phase(), 3);
        assert_eq!(obs.bins(), &[1, 2]);
    }
}
