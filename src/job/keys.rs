//! Catalog of documented record keys
//!
//! Every key the consumer reads, the section heading it belongs under, and
//! whether a record must carry it.

/// Section headings as they appear in the text form
pub const GENERAL: &str = "general inputs";
pub const DYNAMICS: &str = "dynamics learning";
pub const INITIAL: &str = "initial data";
pub const NPG: &str = "NPG params";
pub const MPC: &str = "model predictive control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Must be present in the record
    Required,
    /// Filled in from the base cases when absent
    Defaulted,
    /// May be absent
    Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub name: &'static str,
    pub section: &'static str,
    pub requirement: Requirement,
}

const fn key(name: &'static str, section: &'static str, requirement: Requirement) -> KeySpec {
    KeySpec {
        name,
        section,
        requirement,
    }
}

use Requirement::{Defaulted, Optional, Required};

pub const KEYS: &[KeySpec] = &[
    key("env_name", GENERAL, Required),
    key("seed", GENERAL, Required),
    key("debug_mode", GENERAL, Required),
    key("num_iter", GENERAL, Required),
    key("paths_per_iter", GENERAL, Required),
    key("eval_rollouts", GENERAL, Defaulted),
    key("num_models", GENERAL, Required),
    key("save_freq", GENERAL, Defaulted),
    key("device", GENERAL, Defaulted),
    key("init_samples", GENERAL, Optional),
    key("iter_samples", GENERAL, Optional),
    key("buffer_size", GENERAL, Optional),
    key("hidden_size", DYNAMICS, Required),
    key("activation", DYNAMICS, Required),
    key("fit_lr", DYNAMICS, Required),
    key("fit_wd", DYNAMICS, Required),
    key("fit_mb_size", DYNAMICS, Required),
    key("fit_epochs", DYNAMICS, Required),
    key("max_paths", DYNAMICS, Required),
    key("refresh_fit", DYNAMICS, Required),
    key("learn_reward", DYNAMICS, Defaulted),
    key("replay_buffer_size", DYNAMICS, Defaulted),
    key("init_log_std", INITIAL, Required),
    key("n_init_paths", INITIAL, Required),
    key("use_demos", INITIAL, Required),
    key("demo_file", INITIAL, Required),
    key("policy_size", NPG, Required),
    key("inner_steps", NPG, Required),
    key("step_size", NPG, Required),
    key("update_paths", NPG, Required),
    key("hvp_frac", NPG, Defaulted),
    key("min_log_std", NPG, Defaulted),
    key("start_state", NPG, Defaulted),
    key("buffer_frac", NPG, Optional),
    key("horizon", NPG, Optional),
    key("refresh_policy", NPG, Optional),
    key("init_policy", NPG, Optional),
    key("noisy_mpc", MPC, Required),
    key("noise_level", MPC, Required),
    key("filter_coefs", MPC, Required),
    key("plan_paths", MPC, Required),
    key("plan_horizon", MPC, Required),
    key("kappa", MPC, Required),
    key("omega", MPC, Required),
];

/// Look up a documented key
pub fn lookup(name: &str) -> Option<&'static KeySpec> {
    KEYS.iter().find(|k| k.name == name)
}

/// Required keys of one section
pub fn required_in(section: &str) -> impl Iterator<Item = &'static KeySpec> + '_ {
    KEYS.iter()
        .filter(move |k| k.section == section && k.requirement == Required)
}

/// Sections that form optional blocks; each present block must be complete
pub const OPTIONAL_BLOCKS: &[&str] = &[NPG, MPC];
