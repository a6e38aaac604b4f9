//! Multi-episode driver, used for fixed-program baselines and evaluation.

use tracing::info;

use super::{Episode, Observation};
use crate::error::Result;
use crate::reward::EpisodeSummary;
use crate::sim::SimulatorConnector;

/// Run `episodes` episodes, each from a fresh reset until truncation.
///
/// Every episode is capped at `total_time_steps() + 1` steps in case the
/// simulator never reports truncation.
pub fn run_episodes<C, P>(episode: &mut Episode<C>, episodes: usize, mut policy: P) -> Result<Vec<EpisodeSummary>>
where
    C: SimulatorConnector,
    P: FnMut(&Observation) -> Option<usize>,
{
    let mut summaries = Vec::with_capacity(episodes);
    let max_steps = episode.total_time_steps() as u64 + 1;

    for idx in 0..episodes {
        let (mut observation, _) = episode.reset()?;
        for _ in 0..max_steps {
            let outcome = episode.step(policy(&observation))?;
            observation = outcome.observation;
            if outcome.terminated || outcome.truncated {
                break;
            }
        }

        let summary = episode.metrics().summary(idx);
        info!(
            episode = idx,
            steps = summary.steps,
            cumulative_reward = summary.cumulative_reward,
            mean_waiting_time = summary.mean_waiting_time,
            p95_waiting_time = summary.p95_waiting_time,
            "episode finished"
        );
        summaries.push(summary);
    }

    Ok(summaries)
}
