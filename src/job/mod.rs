//! Job records
//!
//! Loading a record goes: text → `Mapping` → defaults → `JobRecord`.
//! Validation and scheduling operate on the typed record.

pub mod defaults;
pub mod keys;
pub mod record;
pub mod schedule;
pub mod validation;

use std::path::Path;

pub use defaults::{apply_defaults, DefaultSettings};
pub use record::{
    missing_required, Activation, Device, DynamicsParams, FilterCoefs, GeneralParams,
    InitialData, JobRecord, MpcParams, NpgParams, StartState,
};
pub use schedule::{IterationPlan, RunSchedule, SampleBudget, StartStateSplit};
pub use validation::{validate, Finding, Severity, ValidationReport, ValidationSettings};

use crate::errors::{ConfigError, Result};
use crate::literal::{self, Mapping};
use crate::presets;

/// Prefix that selects a built-in preset instead of a file
pub const PRESET_PREFIX: &str = "preset:";

/// A record with defaults applied and its typed view
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    /// The record as the consumer sees it, defaults included
    pub mapping: Mapping,
    pub record: JobRecord,
    /// Keys filled from the base cases
    pub filled: Vec<String>,
}

impl ResolvedJob {
    pub fn validate(&self, settings: &ValidationSettings) -> ValidationReport {
        validate(&self.record, &self.mapping, settings)
    }

    pub fn schedule(&self) -> RunSchedule {
        RunSchedule::from_record(&self.record)
    }

    /// The mapping after the consumer moves `seed` to `base_seed`
    pub fn run_mapping(&self) -> Mapping {
        let mut mapping = self.mapping.clone();
        mapping.rename("seed", "base_seed");
        mapping
    }
}

/// Apply defaults and extract the typed record
pub fn resolve(mut mapping: Mapping, defaults: &DefaultSettings) -> Result<ResolvedJob> {
    let filled = apply_defaults(&mut mapping, defaults);
    let record = JobRecord::from_mapping(&mapping)?;
    Ok(ResolvedJob {
        mapping,
        record,
        filled,
    })
}

/// Parse record text; JSON when `json` is set, the literal form otherwise
pub fn parse_text(text: &str, json: bool) -> Result<Mapping> {
    if json {
        literal::parse_json(text)
    } else {
        literal::parse(text)
    }
}

/// Read a record from a file path or a `preset:<name>` source
pub fn read_source(source: &str) -> Result<Mapping> {
    if let Some(name) = source.strip_prefix(PRESET_PREFIX) {
        return presets::preset(name)
            .ok_or_else(|| ConfigError::Generic(format!("unknown preset '{}'", name)))?
            .mapping();
    }
    read_file(Path::new(source))
}

/// Read a record file; `.json` files are read as JSON
pub fn read_file(path: &Path) -> Result<Mapping> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    parse_text(&text, is_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Value;

    #[test]
    fn test_parse_json_record() {
        let m = parse_text(r#"{"seed": 7, "hidden_size": [32, 32]}"#, true).unwrap();
        assert_eq!(m.get("seed"), Some(&Value::Int(7)));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["seed", "hidden_size"]);
    }

    #[test]
    fn test_parse_json_rejects_duplicate_seed() {
        let err = parse_text(r#"{"seed": 1, "num_iter": 5, "seed": 2}"#, true).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKey { ref key, .. } if key == "seed"));
    }

    #[test]
    fn test_missing_required_after_defaults() {
        let mut m = parse_text("{'env_name': 'x', 'seed': 1, 'policy_size': (8,)}", false).unwrap();
        assert!(matches!(
            resolve(m.clone(), &DefaultSettings::default()),
            Err(ConfigError::MissingField(_))
        ));

        apply_defaults(&mut m, &DefaultSettings::default());
        let missing = missing_required(&m);
        assert!(missing.contains(&"num_iter"));
        assert!(missing.contains(&"fit_lr"));
        assert!(!missing.contains(&"seed"));
        assert!(!missing.contains(&"save_freq"));
    }

    #[test]
    fn test_parse_json_rejects_array() {
        let err = parse_text("[1, 2]", true).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(read_source("preset:nope").is_err());
    }

    #[test]
    fn test_run_mapping_renames_seed() {
        let job = resolve(
            read_source("preset:point_mass_npg").unwrap(),
            &DefaultSettings::default(),
        )
        .unwrap();
        let run = job.run_mapping();
        assert!(!run.contains_key("seed"));
        assert_eq!(run.get("base_seed"), job.mapping.get("seed"));
        assert!(job.mapping.contains_key("seed"));
    }
}
