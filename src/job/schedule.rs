//! Per-iteration schedule derived from a record
//!
//! The consumer's outer loop reads a handful of keys to decide how much
//! data to collect, when to rebuild models and when to checkpoint. This
//! module computes those decisions up front so they can be inspected.

use serde::Serialize;

use super::record::{JobRecord, StartState};

/// How much real-environment data an iteration collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", content = "amount", rename_all = "snake_case")]
pub enum SampleBudget {
    Samples(usize),
    Paths(usize),
}

impl SampleBudget {
    pub fn amount(&self) -> usize {
        match self {
            SampleBudget::Samples(n) | SampleBudget::Paths(n) => *n,
        }
    }
}

/// Offset between model seeds of consecutive refreshes
pub const MODEL_REFRESH_SEED_STRIDE: i64 = 123;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationPlan {
    pub index: usize,
    pub budget: SampleBudget,
    /// Base seed of the real-environment rollouts
    pub sampling_seed: i64,
    /// Dynamics models are freshly initialised before fitting
    pub fresh_models: bool,
    /// Seeds of the models fitted this iteration, one per model
    pub model_seeds: Vec<i64>,
    /// Policy is re-initialised before the NPG updates
    pub policy_reset: bool,
    /// Agent and policy are saved at the end of the iteration
    pub checkpoint: bool,
    pub eval_rollouts: usize,
}

/// Where the start states of one policy update come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartStateSplit {
    pub from_initial: usize,
    pub from_buffer: usize,
}

impl StartStateSplit {
    pub fn total(&self) -> usize {
        self.from_initial + self.from_buffer
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSchedule {
    pub iterations: Vec<IterationPlan>,
    pub inner_steps: Option<usize>,
    pub start_states: Option<StartStateSplit>,
    /// Transitions kept in the path buffer; older paths are dropped first
    pub buffer_limit: Option<usize>,
}

impl RunSchedule {
    pub fn from_record(record: &JobRecord) -> Self {
        let g = &record.general;
        let policy_reset = record.npg.as_ref().map_or(false, |npg| npg.refresh_policy);
        let iterations = (0..g.num_iter)
            .map(|index| IterationPlan {
                index,
                budget: iteration_budget(record, index),
                sampling_seed: g.seed.saturating_add(index as i64),
                fresh_models: index == 0 || record.dynamics.refresh_fit,
                model_seeds: model_seeds(record, index),
                policy_reset,
                checkpoint: is_checkpoint(index, g.save_freq),
                eval_rollouts: g.eval_rollouts,
            })
            .collect();

        let start_states = record
            .npg
            .as_ref()
            .map(|npg| start_state_split(npg.update_paths, npg.start_state, npg.buffer_frac));

        Self {
            iterations,
            inner_steps: record.npg.as_ref().map(|npg| npg.inner_steps),
            start_states,
            buffer_limit: g.buffer_size,
        }
    }

    /// Iterations that end with an intermediate checkpoint
    pub fn checkpoints(&self) -> Vec<usize> {
        self.iterations
            .iter()
            .filter(|it| it.checkpoint)
            .map(|it| it.index)
            .collect()
    }

    /// Total data collected over the run, in the budget's unit
    pub fn total_budget(&self) -> usize {
        self.iterations.iter().map(|it| it.budget.amount()).sum()
    }
}

/// Sample budgets win over path counts when both are configured
pub fn iteration_budget(record: &JobRecord, index: usize) -> SampleBudget {
    let g = &record.general;
    match (g.init_samples, g.iter_samples) {
        (Some(init), Some(iter)) => SampleBudget::Samples(if index == 0 { init } else { iter }),
        _ => SampleBudget::Paths(if index == 0 {
            record.initial.n_init_paths
        } else {
            g.paths_per_iter
        }),
    }
}

/// Seeds of the dynamics models fitted in iteration `index`
///
/// Models are built once with `seed + i`. With `refresh_fit` every model is
/// rebuilt each iteration with the shared seed `seed + 123 * index`.
pub fn model_seeds(record: &JobRecord, index: usize) -> Vec<i64> {
    let seed = record.general.seed;
    let n = record.general.num_models;
    if record.dynamics.refresh_fit {
        let shared = seed.saturating_add(MODEL_REFRESH_SEED_STRIDE.saturating_mul(index as i64));
        vec![shared; n]
    } else {
        (0..n).map(|i| seed.saturating_add(i as i64)).collect()
    }
}

/// Number of oldest paths dropped so the buffer holds at most `limit` transitions
///
/// `transitions` lists each buffered path's transition count, oldest first.
pub fn paths_to_drop(transitions: &[usize], limit: usize) -> usize {
    let mut total: usize = transitions.iter().sum();
    let mut dropped = 0;
    while total > limit && dropped < transitions.len() {
        total -= transitions[dropped];
        dropped += 1;
    }
    dropped
}

/// Intermediate saves happen after every `save_freq`-th iteration, never the first
pub fn is_checkpoint(index: usize, save_freq: usize) -> bool {
    save_freq > 0 && index > 0 && index % save_freq == 0
}

/// Split `update_paths` between initial states and buffer states
///
/// With `buffer_frac` f the consumer draws `floor(u(1-f)) + 1` initial and
/// `floor(uf) + 1` buffer states; without it the paths are halved.
pub fn start_state_split(
    update_paths: usize,
    start_state: StartState,
    buffer_frac: Option<f64>,
) -> StartStateSplit {
    match start_state {
        StartState::Init => StartStateSplit {
            from_initial: update_paths,
            from_buffer: 0,
        },
        StartState::Buffer => match buffer_frac {
            Some(frac) => {
                let u = update_paths as f64;
                StartStateSplit {
                    from_initial: (u * (1.0 - frac)).floor() as usize + 1,
                    from_buffer: (u * frac).floor() as usize + 1,
                }
            }
            None => StartStateSplit {
                from_initial: update_paths / 2,
                from_buffer: update_paths / 2,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{resolve, DefaultSettings};
    use crate::literal::{Mapping, Value};
    use crate::presets;

    fn preset_mapping(name: &str) -> Mapping {
        presets::preset(name).unwrap().mapping().unwrap()
    }

    fn schedule_of(mapping: Mapping) -> RunSchedule {
        resolve(mapping, &DefaultSettings::default()).unwrap().schedule()
    }

    #[test]
    fn test_sampling_seed_advances_per_iteration() {
        let schedule = schedule_of(preset_mapping("point_mass_npg"));
        let seeds: Vec<i64> = schedule.iterations.iter().take(3).map(|it| it.sampling_seed).collect();
        assert_eq!(seeds, vec![123, 124, 125]);
    }

    #[test]
    fn test_model_seeds_without_refresh() {
        let schedule = schedule_of(preset_mapping("point_mass_npg"));
        assert_eq!(schedule.iterations[0].model_seeds, vec![123, 124, 125, 126]);
        assert_eq!(schedule.iterations[7].model_seeds, vec![123, 124, 125, 126]);
        assert!(!schedule.iterations[7].fresh_models);
    }

    #[test]
    fn test_model_seeds_with_refresh() {
        let schedule = schedule_of(preset_mapping("point_mass_mpc"));
        assert_eq!(schedule.iterations[0].model_seeds, vec![123; 4]);
        assert_eq!(schedule.iterations[2].model_seeds, vec![123 + 246; 4]);
        assert!(schedule.iterations[2].fresh_models);
    }

    #[test]
    fn test_policy_reset_and_buffer_limit() {
        let schedule = schedule_of(preset_mapping("point_mass_npg"));
        assert!(schedule.iterations.iter().all(|it| !it.policy_reset));
        assert_eq!(schedule.buffer_limit, None);

        let mut mapping = preset_mapping("point_mass_npg");
        mapping.insert("refresh_policy", Value::Bool(true));
        mapping.insert("buffer_size", Value::Int(5000));
        let schedule = schedule_of(mapping);
        assert!(schedule.iterations.iter().all(|it| it.policy_reset));
        assert_eq!(schedule.buffer_limit, Some(5000));
    }

    #[test]
    fn test_paths_to_drop() {
        assert_eq!(paths_to_drop(&[100, 100, 100], 300), 0);
        assert_eq!(paths_to_drop(&[100, 100, 100], 250), 1);
        assert_eq!(paths_to_drop(&[50, 100, 100], 150), 2);
        assert_eq!(paths_to_drop(&[100, 100], 0), 2);
        assert_eq!(paths_to_drop(&[], 10), 0);
    }

    #[test]
    fn test_checkpoint_rule() {
        let hits: Vec<usize> = (0..25).filter(|&i| is_checkpoint(i, 10)).collect();
        assert_eq!(hits, vec![10, 20]);
        assert!(!is_checkpoint(0, 1));
        assert!(is_checkpoint(1, 1));
    }

    #[test]
    fn test_split_init() {
        let split = start_state_split(250, StartState::Init, Some(0.3));
        assert_eq!(split.from_initial, 250);
        assert_eq!(split.from_buffer, 0);
    }

    #[test]
    fn test_split_buffer_frac() {
        let split = start_state_split(100, StartState::Buffer, Some(0.25));
        assert_eq!(split.from_initial, 76);
        assert_eq!(split.from_buffer, 26);
        assert_eq!(split.total(), 102);
    }

    #[test]
    fn test_split_buffer_halves() {
        let split = start_state_split(101, StartState::Buffer, None);
        assert_eq!(split.from_initial, 50);
        assert_eq!(split.from_buffer, 50);
    }
}
