//! Gaussian MLP policy
//!
//! Mean from an `FcNetwork`, state-independent `log_std`. Keeps a second
//! "old" parameter set so likelihood ratios and KL between the pre- and
//! post-update policies can be computed.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use super::network::FcNetwork;
use crate::errors::{ConfigError, Result};
use crate::job::JobRecord;

/// Guards the KL denominator against a zero std
pub const KL_EPSILON: f64 = 1e-8;

/// Output-layer scale at init, keeps initial means near zero
pub const OUTPUT_INIT_SCALE: f64 = 1e-2;

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub hidden_sizes: Vec<usize>,
    pub init_log_std: f64,
    pub min_log_std: f64,
    pub seed: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![64, 64],
            init_log_std: 0.0,
            min_log_std: -3.0,
            seed: None,
        }
    }
}

impl PolicyConfig {
    /// Policy settings of a record's NPG block
    pub fn from_record(record: &JobRecord) -> Result<Self> {
        let npg = record.npg.as_ref().ok_or_else(|| {
            ConfigError::Policy("record has no NPG params block to size the policy".to_string())
        })?;
        let seed = u64::try_from(record.general.seed)
            .map_err(|_| ConfigError::invalid("seed", "must be non-negative"))?;
        Ok(Self {
            hidden_sizes: npg.policy_size.clone(),
            init_log_std: record.initial.init_log_std,
            min_log_std: npg.min_log_std,
            seed: Some(seed),
        })
    }
}

/// One sampled action with the distribution it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSample {
    pub action: Vec<f64>,
    pub mean: Vec<f64>,
    pub log_std: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianMlp {
    obs_dim: usize,
    act_dim: usize,
    min_log_std: f64,
    model: FcNetwork,
    log_std: Vec<f64>,
    old_model: FcNetwork,
    old_log_std: Vec<f64>,
    rng: StdRng,
}

impl GaussianMlp {
    pub fn new(obs_dim: usize, act_dim: usize, config: &PolicyConfig) -> Result<Self> {
        if obs_dim == 0 || act_dim == 0 {
            return Err(ConfigError::Policy(format!(
                "observation and action dimensions must be positive, got {} and {}",
                obs_dim, act_dim
            )));
        }
        if config.hidden_sizes.iter().any(|&h| h == 0) {
            return Err(ConfigError::Policy(format!(
                "hidden sizes must be positive, got {:?}",
                config.hidden_sizes
            )));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut model = FcNetwork::new(obs_dim, act_dim, &config.hidden_sizes, &mut rng);
        model.scale_output_layer(OUTPUT_INIT_SCALE);
        let log_std = vec![config.init_log_std; act_dim];

        Ok(Self {
            obs_dim,
            act_dim,
            min_log_std: config.min_log_std,
            old_model: model.clone(),
            old_log_std: log_std.clone(),
            model,
            log_std,
            rng,
        })
    }

    pub fn from_record(record: &JobRecord, obs_dim: usize, act_dim: usize) -> Result<Self> {
        Self::new(obs_dim, act_dim, &PolicyConfig::from_record(record)?)
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    pub fn log_std(&self) -> &[f64] {
        &self.log_std
    }

    pub fn model(&self) -> &FcNetwork {
        &self.model
    }

    /// Trainable parameter count: network plus one log_std per action
    pub fn param_count(&self) -> usize {
        self.model.param_count() + self.act_dim
    }

    /// Flat parameter vector, network first then log_std
    pub fn param_values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.param_count());
        self.model.write_params(&mut values);
        values.extend_from_slice(&self.log_std);
        values
    }

    /// Load a flat parameter vector into the current and/or old set.
    /// log_std is clamped at `min_log_std`.
    pub fn set_param_values(&mut self, values: &[f64], set_new: bool, set_old: bool) -> Result<()> {
        if values.len() != self.param_count() {
            return Err(ConfigError::Policy(format!(
                "expected {} parameters, got {}",
                self.param_count(),
                values.len()
            )));
        }
        let min = self.min_log_std;
        let clamp = |s: &[f64]| s.iter().map(|v| v.max(min)).collect::<Vec<_>>();

        if set_new {
            let used = self.model.read_params(values);
            self.log_std = clamp(&values[used..]);
        }
        if set_old {
            let used = self.old_model.read_params(values);
            self.old_log_std = clamp(&values[used..]);
        }
        Ok(())
    }

    /// Copy current parameters into the old set
    pub fn sync_old(&mut self) {
        self.old_model = self.model.clone();
        self.old_log_std = self.log_std.clone();
    }

    fn check_obs(&self, observation: &[f64]) -> Result<()> {
        if observation.len() != self.obs_dim {
            return Err(ConfigError::Policy(format!(
                "observation has {} entries, policy expects {}",
                observation.len(),
                self.obs_dim
            )));
        }
        Ok(())
    }

    fn check_batch(&self, observations: &[Vec<f64>], actions: &[Vec<f64>]) -> Result<()> {
        if observations.len() != actions.len() {
            return Err(ConfigError::Policy(format!(
                "{} observations but {} actions",
                observations.len(),
                actions.len()
            )));
        }
        for (obs, act) in observations.iter().zip(actions) {
            self.check_obs(obs)?;
            if act.len() != self.act_dim {
                return Err(ConfigError::Policy(format!(
                    "action has {} entries, policy expects {}",
                    act.len(),
                    self.act_dim
                )));
            }
        }
        Ok(())
    }

    pub fn mean_action(&self, observation: &[f64]) -> Result<Vec<f64>> {
        self.check_obs(observation)?;
        Ok(self.model.forward(observation))
    }

    /// mean + exp(log_std) * N(0, 1)
    pub fn get_action(&mut self, observation: &[f64]) -> Result<ActionSample> {
        let mean = self.mean_action(observation)?;
        let action = mean
            .iter()
            .zip(&self.log_std)
            .map(|(m, ls)| {
                let z: f64 = StandardNormal.sample(&mut self.rng);
                m + ls.exp() * z
            })
            .collect();
        Ok(ActionSample {
            action,
            mean,
            log_std: self.log_std.clone(),
        })
    }

    pub fn log_likelihood(&self, observations: &[Vec<f64>], actions: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.check_batch(observations, actions)?;
        Ok(batch_log_likelihood(&self.model, &self.log_std, observations, actions))
    }

    pub fn old_log_likelihood(
        &self,
        observations: &[Vec<f64>],
        actions: &[Vec<f64>],
    ) -> Result<Vec<f64>> {
        self.check_batch(observations, actions)?;
        Ok(batch_log_likelihood(&self.old_model, &self.old_log_std, observations, actions))
    }

    /// exp(LL_new - LL_old) per sample
    pub fn likelihood_ratio(&self, observations: &[Vec<f64>], actions: &[Vec<f64>]) -> Result<Vec<f64>> {
        let new = self.log_likelihood(observations, actions)?;
        let old = self.old_log_likelihood(observations, actions)?;
        Ok(new.iter().zip(&old).map(|(n, o)| (n - o).exp()).collect())
    }

    /// Mean KL(old ‖ new) over the observations
    pub fn mean_kl(&self, observations: &[Vec<f64>]) -> Result<f64> {
        if observations.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for obs in observations {
            self.check_obs(obs)?;
            let old_mean = self.old_model.forward(obs);
            let new_mean = self.model.forward(obs);
            total += (0..self.act_dim)
                .map(|j| {
                    let old_std = self.old_log_std[j].exp();
                    let new_std = self.log_std[j].exp();
                    let nr = (old_mean[j] - new_mean[j]).powi(2) + old_std.powi(2) - new_std.powi(2);
                    let dr = 2.0 * new_std.powi(2) + KL_EPSILON;
                    nr / dr + self.log_std[j] - self.old_log_std[j]
                })
                .sum::<f64>();
        }
        Ok(total / observations.len() as f64)
    }
}

fn batch_log_likelihood(
    model: &FcNetwork,
    log_std: &[f64],
    observations: &[Vec<f64>],
    actions: &[Vec<f64>],
) -> Vec<f64> {
    let m = log_std.len() as f64;
    let log_std_sum: f64 = log_std.iter().sum();
    let norm = 0.5 * m * (2.0 * std::f64::consts::PI).ln();

    observations
        .iter()
        .zip(actions)
        .map(|(obs, act)| {
            let mean = model.forward(obs);
            let sq: f64 = act
                .iter()
                .zip(&mean)
                .zip(log_std)
                .map(|((a, mu), ls)| ((a - mu) / ls.exp()).powi(2))
                .sum();
            -0.5 * sq - log_std_sum - norm
        })
        .collect()
}
