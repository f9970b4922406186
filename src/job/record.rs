//! Typed job record
//!
//! Groups the flat keys into the sections of the text form and checks each
//! value's kind. Range checks live in `validation`; extraction only rejects
//! values that cannot be represented at all.

use std::fmt;
use std::str::FromStr;

use super::keys::{self, Requirement};
use crate::errors::{ConfigError, Result};
use crate::literal::{Mapping, Value};

/// Compute device the consumer runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(Option<u32>),
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(None)),
            other => match other.strip_prefix("cuda:").map(str::parse::<u32>) {
                Some(Ok(index)) => Ok(Device::Cuda(Some(index))),
                _ => Err(ConfigError::invalid(
                    "device",
                    format!("'{}' is not one of cpu, cuda, cuda:N", other),
                )),
            },
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(None) => write!(f, "cuda"),
            Device::Cuda(Some(i)) => write!(f, "cuda:{}", i),
        }
    }
}

/// Hidden-layer nonlinearity of the dynamics network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Tanh,
    Gelu,
    Sigmoid,
    Elu,
}

impl FromStr for Activation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "gelu" => Ok(Activation::Gelu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "elu" => Ok(Activation::Elu),
            _ => Err(ConfigError::invalid(
                "activation",
                format!("unknown activation '{}'", s),
            )),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Gelu => "gelu",
            Activation::Sigmoid => "sigmoid",
            Activation::Elu => "elu",
        };
        write!(f, "{}", name)
    }
}

/// Where policy-update rollouts start from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    /// Initial states of collected paths only
    Init,
    /// Mix of initial states and states drawn from the data buffer
    Buffer,
}

impl FromStr for StartState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "init" => Ok(StartState::Init),
            "buffer" => Ok(StartState::Buffer),
            other => Err(ConfigError::invalid(
                "start_state",
                format!("'{}' is not one of init, buffer", other),
            )),
        }
    }
}

impl fmt::Display for StartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartState::Init => write!(f, "init"),
            StartState::Buffer => write!(f, "buffer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralParams {
    pub env_name: String,
    pub seed: i64,
    pub debug_mode: bool,
    pub num_iter: usize,
    pub paths_per_iter: usize,
    pub eval_rollouts: usize,
    pub num_models: usize,
    pub save_freq: usize,
    pub device: Device,
    pub init_samples: Option<usize>,
    pub iter_samples: Option<usize>,
    pub buffer_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsParams {
    pub hidden_size: Vec<usize>,
    pub activation: Activation,
    pub fit_lr: f64,
    pub fit_wd: f64,
    pub fit_mb_size: usize,
    pub fit_epochs: usize,
    pub max_paths: usize,
    pub refresh_fit: bool,
    pub learn_reward: bool,
    pub replay_buffer_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialData {
    pub init_log_std: f64,
    pub n_init_paths: usize,
    pub use_demos: bool,
    pub demo_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpgParams {
    pub policy_size: Vec<usize>,
    pub inner_steps: usize,
    pub step_size: f64,
    pub update_paths: usize,
    pub hvp_frac: f64,
    pub min_log_std: f64,
    pub start_state: StartState,
    pub buffer_frac: Option<f64>,
    pub horizon: Option<usize>,
    pub refresh_policy: bool,
    pub init_policy: Option<String>,
}

/// Named smoothing coefficients for planned action sequences
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefs {
    pub coefs: Vec<(String, f64)>,
}

impl FilterCoefs {
    pub fn total(&self) -> f64 {
        self.coefs.iter().map(|(_, c)| c).sum()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.coefs.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.coefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MpcParams {
    pub noisy_mpc: bool,
    pub noise_level: f64,
    pub filter_coefs: FilterCoefs,
    pub plan_paths: usize,
    pub plan_horizon: usize,
    pub kappa: f64,
    pub omega: f64,
}

/// A fully typed record
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub general: GeneralParams,
    pub dynamics: DynamicsParams,
    pub initial: InitialData,
    pub npg: Option<NpgParams>,
    pub mpc: Option<MpcParams>,
}

impl JobRecord {
    /// Extract a typed record from a resolved mapping (defaults applied)
    pub fn from_mapping(mapping: &Mapping) -> Result<Self> {
        let f = Fields { mapping };

        let general = GeneralParams {
            env_name: f.string("env_name")?,
            seed: f.int("seed")?,
            debug_mode: f.boolean("debug_mode")?,
            num_iter: f.count("num_iter")?,
            paths_per_iter: f.count("paths_per_iter")?,
            eval_rollouts: f.count("eval_rollouts")?,
            num_models: f.count("num_models")?,
            save_freq: f.count("save_freq")?,
            device: f.string("device")?.parse()?,
            init_samples: f.opt_count("init_samples")?,
            iter_samples: f.opt_count("iter_samples")?,
            buffer_size: f.opt_count("buffer_size")?,
        };

        let dynamics = DynamicsParams {
            hidden_size: f.sizes("hidden_size")?,
            activation: f.string("activation")?.parse()?,
            fit_lr: f.float("fit_lr")?,
            fit_wd: f.float("fit_wd")?,
            fit_mb_size: f.count("fit_mb_size")?,
            fit_epochs: f.count("fit_epochs")?,
            max_paths: f.count("max_paths")?,
            refresh_fit: f.boolean("refresh_fit")?,
            learn_reward: f.boolean("learn_reward")?,
            replay_buffer_size: f.count("replay_buffer_size")?,
        };

        let initial = InitialData {
            init_log_std: f.float("init_log_std")?,
            n_init_paths: f.count("n_init_paths")?,
            use_demos: f.boolean("use_demos")?,
            demo_file: f.opt_string("demo_file")?,
        };
        // demo_file is required even when it is None
        f.require("demo_file")?;

        let npg = if f.block_present(keys::NPG) {
            Some(NpgParams {
                policy_size: f.sizes("policy_size")?,
                inner_steps: f.count("inner_steps")?,
                step_size: f.float("step_size")?,
                update_paths: f.count("update_paths")?,
                hvp_frac: f.float("hvp_frac")?,
                min_log_std: f.float("min_log_std")?,
                start_state: f.string("start_state")?.parse()?,
                buffer_frac: f.opt_float("buffer_frac")?,
                horizon: f.opt_count("horizon")?,
                refresh_policy: f.opt_boolean("refresh_policy")?.unwrap_or(false),
                init_policy: f.opt_string("init_policy")?,
            })
        } else {
            None
        };

        let mpc = if f.block_present(keys::MPC) {
            Some(MpcParams {
                noisy_mpc: f.boolean("noisy_mpc")?,
                noise_level: f.float("noise_level")?,
                filter_coefs: f.coefs("filter_coefs")?,
                plan_paths: f.count("plan_paths")?,
                plan_horizon: f.count("plan_horizon")?,
                kappa: f.float("kappa")?,
                omega: f.float("omega")?,
            })
        } else {
            None
        };

        if npg.is_none() && mpc.is_none() {
            return Err(ConfigError::MissingField(format!(
                "record needs a '{}' or '{}' block",
                keys::NPG,
                keys::MPC
            )));
        }

        Ok(Self {
            general,
            dynamics,
            initial,
            npg,
            mpc,
        })
    }

    /// Sum of MPC filter coefficients, if the record plans with MPC
    pub fn filter_total(&self) -> Option<f64> {
        self.mpc.as_ref().map(|m| m.filter_coefs.total())
    }

    /// Short label for the policy-improvement mode
    pub fn mode(&self) -> &'static str {
        match (&self.npg, &self.mpc) {
            (Some(_), Some(_)) => "npg+mpc",
            (Some(_), None) => "npg",
            (None, Some(_)) => "mpc",
            (None, None) => "none",
        }
    }
}

/// Typed accessors over a mapping
struct Fields<'a> {
    mapping: &'a Mapping,
}

impl<'a> Fields<'a> {
    fn require(&self, key: &str) -> Result<&'a Value> {
        self.mapping
            .get(key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))
    }

    /// Absent keys and explicit `None` both read as absent
    fn optional(&self, key: &str) -> Option<&'a Value> {
        self.mapping.get(key).filter(|v| !v.is_none())
    }

    fn block_present(&self, section: &str) -> bool {
        keys::required_in(section).any(|k| self.mapping.contains_key(k.name))
    }

    fn string(&self, key: &str) -> Result<String> {
        let value = self.require(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::type_mismatch(key, "str", value.type_name()))
    }

    fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| ConfigError::type_mismatch(key, "str or None", value.type_name())),
        }
    }

    fn boolean(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| ConfigError::type_mismatch(key, "bool", value.type_name()))
    }

    fn opt_boolean(&self, key: &str) -> Result<Option<bool>> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| ConfigError::type_mismatch(key, "bool", value.type_name())),
        }
    }

    fn int(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value
            .as_i64()
            .ok_or_else(|| ConfigError::type_mismatch(key, "int", value.type_name()))
    }

    fn count(&self, key: &str) -> Result<usize> {
        let raw = self.int(key)?;
        to_count(key, raw)
    }

    fn opt_count(&self, key: &str) -> Result<Option<usize>> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => {
                let raw = value
                    .as_i64()
                    .ok_or_else(|| ConfigError::type_mismatch(key, "int", value.type_name()))?;
                to_count(key, raw).map(Some)
            }
        }
    }

    fn float(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| ConfigError::type_mismatch(key, "float", value.type_name()))
    }

    fn opt_float(&self, key: &str) -> Result<Option<f64>> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| ConfigError::type_mismatch(key, "float", value.type_name())),
        }
    }

    fn sizes(&self, key: &str) -> Result<Vec<usize>> {
        let value = self.require(key)?;
        let items = value
            .as_sequence()
            .ok_or_else(|| ConfigError::type_mismatch(key, "tuple of ints", value.type_name()))?;
        items
            .iter()
            .map(|item| {
                let raw = item.as_i64().ok_or_else(|| {
                    ConfigError::type_mismatch(key, "tuple of ints", item.type_name())
                })?;
                to_count(key, raw)
            })
            .collect()
    }

    fn coefs(&self, key: &str) -> Result<FilterCoefs> {
        let value = self.require(key)?;
        let inner = value
            .as_mapping()
            .ok_or_else(|| ConfigError::type_mismatch(key, "dict", value.type_name()))?;
        let coefs = inner
            .iter()
            .map(|(name, v)| {
                v.as_f64()
                    .map(|c| (name.to_string(), c))
                    .ok_or_else(|| {
                        ConfigError::type_mismatch(&format!("{}.{}", key, name), "float", v.type_name())
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FilterCoefs { coefs })
    }
}

fn to_count(key: &str, raw: i64) -> Result<usize> {
    usize::try_from(raw).map_err(|_| ConfigError::invalid(key, format!("{} is negative", raw)))
}

/// Keys the catalog marks as required for the base sections
pub fn missing_required(mapping: &Mapping) -> Vec<&'static str> {
    keys::KEYS
        .iter()
        .filter(|k| k.requirement == Requirement::Required)
        .filter(|k| !keys::OPTIONAL_BLOCKS.contains(&k.section))
        .filter(|k| !mapping.contains_key(k.name))
        .map(|k| k.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::defaults::{apply_defaults, DefaultSettings};
    use crate::literal::parse;

    const BASE: &str = "{
        'env_name': 'mjrl_point_mass-v0', 'seed': 123, 'debug_mode': False,
        'num_iter': 5, 'paths_per_iter': 10, 'num_models': 2,
        'hidden_size': (64, 64), 'activation': 'relu', 'fit_lr': 1e-3, 'fit_wd': 0,
        'fit_mb_size': 16, 'fit_epochs': 5, 'max_paths': 100, 'refresh_fit': False,
        'init_log_std': -0.5, 'n_init_paths': 10, 'use_demos': False, 'demo_file': None,
        'policy_size': (32, 32), 'inner_steps': 5, 'step_size': 0.05, 'update_paths': 50,
    }";

    fn resolved(text: &str) -> Mapping {
        let mut m = parse(text).unwrap();
        apply_defaults(&mut m, &DefaultSettings::default());
        m
    }

    #[test]
    fn test_extract_npg_record() {
        let record = JobRecord::from_mapping(&resolved(BASE)).unwrap();
        assert_eq!(record.general.env_name, "mjrl_point_mass-v0");
        assert_eq!(record.general.device, Device::Cpu);
        assert_eq!(record.dynamics.hidden_size, vec![64, 64]);
        assert_eq!(record.dynamics.fit_wd, 0.0);
        assert_eq!(record.initial.demo_file, None);
        let npg = record.npg.as_ref().unwrap();
        assert_eq!(npg.start_state, StartState::Init);
        assert_eq!(npg.hvp_frac, 1.0);
        assert!(!npg.refresh_policy);
        assert!(record.mpc.is_none());
        assert_eq!(record.mode(), "npg");
    }

    #[test]
    fn test_missing_field() {
        let text = BASE.replace("'num_models': 2,", "");
        let err = JobRecord::from_mapping(&resolved(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref k) if k == "num_models"));
    }

    #[test]
    fn test_float_where_int_expected() {
        let text = BASE.replace("'num_iter': 5", "'num_iter': 5.0");
        let err = JobRecord::from_mapping(&resolved(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { ref field, .. } if field == "num_iter"));
    }

    #[test]
    fn test_negative_count() {
        let text = BASE.replace("'fit_epochs': 5", "'fit_epochs': -1");
        let err = JobRecord::from_mapping(&resolved(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "fit_epochs"));
    }

    #[test]
    fn test_incomplete_block() {
        let text = BASE.replace("'update_paths': 50,", "'update_paths': 50, 'kappa': 5.0,");
        let err = JobRecord::from_mapping(&resolved(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref k) if k == "noisy_mpc"));
    }

    #[test]
    fn test_no_planning_block() {
        let text = BASE
            .replace("'policy_size': (32, 32), 'inner_steps': 5, 'step_size': 0.05, 'update_paths': 50,", "");
        let err = JobRecord::from_mapping(&resolved(&text)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_bad_start_state() {
        let text = BASE.replace("'update_paths': 50,", "'update_paths': 50, 'start_state': 'random',");
        assert!(JobRecord::from_mapping(&resolved(&text)).is_err());
    }

    #[test]
    fn test_device_parsing() {
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Cuda(Some(1)));
        assert_eq!(Device::Cuda(Some(1)).to_string(), "cuda:1");
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn test_filter_coefs() {
        let text = BASE.replace(
            "'update_paths': 50,",
            "'update_paths': 50, 'noisy_mpc': False, 'noise_level': 0.1, \
             'filter_coefs': {'f1': 0.5, 'f2': 1, 'f3': 0.0}, 'plan_paths': 100, \
             'plan_horizon': 16, 'kappa': 5.0, 'omega': 0.0,",
        );
        let record = JobRecord::from_mapping(&resolved(&text)).unwrap();
        assert_eq!(record.mode(), "npg+mpc");
        assert_eq!(record.filter_total(), Some(1.5));
        assert_eq!(record.mpc.unwrap().filter_coefs.get("f2"), Some(1.0));
    }

    #[test]
    fn test_missing_required() {
        let m = parse("{'env_name': 'x', 'policy_size': (1,)}").unwrap();
        let missing = missing_required(&m);
        assert!(missing.contains(&"seed"));
        assert!(!missing.contains(&"env_name"));
        assert!(!missing.contains(&"inner_steps"));
    }
}
