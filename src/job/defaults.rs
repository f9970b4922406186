//! Base cases for missing keys
//!
//! The consumer fills a fixed set of keys when a record leaves them out.
//! Only absent keys are touched; explicit values always win.

use serde::{Deserialize, Serialize};

use super::keys;
use crate::literal::{Mapping, Value};

/// Values inserted for absent keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    pub eval_rollouts: usize,
    pub save_freq: usize,
    pub device: String,
    pub hvp_frac: f64,
    pub start_state: String,
    pub learn_reward: bool,
    pub replay_buffer_size: usize,
    pub min_log_std: f64,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            eval_rollouts: 0,
            save_freq: 10,
            device: "cpu".to_string(),
            hvp_frac: 1.0,
            start_state: "init".to_string(),
            learn_reward: true,
            replay_buffer_size: 1_000_000,
            min_log_std: -3.0,
        }
    }
}

impl DefaultSettings {
    /// The base cases as (key, value) pairs in insertion order
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("eval_rollouts", Value::Int(self.eval_rollouts as i64)),
            ("save_freq", Value::Int(self.save_freq as i64)),
            ("device", Value::Str(self.device.clone())),
            ("hvp_frac", Value::Float(self.hvp_frac)),
            ("start_state", Value::Str(self.start_state.clone())),
            ("learn_reward", Value::Bool(self.learn_reward)),
            ("replay_buffer_size", Value::Int(self.replay_buffer_size as i64)),
            ("min_log_std", Value::Float(self.min_log_std)),
        ]
    }
}

/// Fill absent base-case keys, returning the keys that were filled
pub fn apply_defaults(mapping: &mut Mapping, defaults: &DefaultSettings) -> Vec<String> {
    let mut filled = Vec::new();
    for (key, value) in defaults.entries() {
        if mapping.contains_key(key) {
            continue;
        }
        let section = keys::lookup(key).map(|k| k.section).unwrap_or(keys::GENERAL);
        mapping.insert_in_section(key, value, section);
        filled.push(key.to_string());
    }
    filled
}
