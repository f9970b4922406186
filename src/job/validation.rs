//! Record validation
//!
//! Range and cross-field checks over a typed record. Every check is counted;
//! failures become findings with a severity so callers can decide whether
//! warnings block a run.

use serde::{Deserialize, Serialize};

use super::keys;
use super::record::JobRecord;
use crate::errors::{ConfigError, Result};
use crate::literal::Mapping;

/// Tolerance for the filter-coefficient total
pub const FILTER_TOTAL_TOLERANCE: f64 = 1e-9;

/// Validation knobs read from settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Treat unrecognised keys as errors
    pub strict_keys: bool,
    /// Required sum of the MPC filter coefficients
    pub expected_filter_total: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub field: String,
    pub severity: Severity,
    pub message: String,
}

/// Outcome of validating one record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub checks_run: usize,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Checks that passed outright
    pub fn checks_passed(&self) -> usize {
        self.checks_run.saturating_sub(self.findings.len())
    }

    /// First error as a `ConfigError`
    pub fn into_result(self) -> Result<()> {
        match self.findings.into_iter().find(|f| f.severity == Severity::Error) {
            Some(finding) => Err(ConfigError::InvalidValue {
                field: finding.field,
                reason: finding.message,
            }),
            None => Ok(()),
        }
    }
}

struct Checker {
    report: ValidationReport,
}

impl Checker {
    fn require(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        self.record(ok, Severity::Error, field, message);
    }

    fn warn(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        self.record(ok, Severity::Warning, field, message);
    }

    fn record(&mut self, ok: bool, severity: Severity, field: &str, message: impl Into<String>) {
        self.report.checks_run += 1;
        if !ok {
            self.report.findings.push(Finding {
                field: field.to_string(),
                severity,
                message: message.into(),
            });
        }
    }

    fn at_least_one(&mut self, value: usize, field: &str) {
        self.require(value >= 1, field, format!("must be at least 1, got {}", value));
    }

    fn positive(&mut self, value: f64, field: &str) {
        self.require(value > 0.0, field, format!("must be greater than 0, got {}", value));
    }

    fn finite(&mut self, value: f64, field: &str) {
        self.require(value.is_finite(), field, format!("must be finite, got {}", value));
    }

    fn sizes(&mut self, sizes: &[usize], field: &str) {
        self.require(!sizes.is_empty(), field, "must list at least one layer");
        self.require(
            sizes.iter().all(|&s| s > 0),
            field,
            format!("layer sizes must be positive, got {:?}", sizes),
        );
    }
}

/// Validate a typed record against its resolved mapping
pub fn validate(record: &JobRecord, mapping: &Mapping, settings: &ValidationSettings) -> ValidationReport {
    let mut c = Checker {
        report: ValidationReport::default(),
    };

    for key in mapping.keys() {
        let known = keys::lookup(key).is_some() || key == "base_seed";
        let message = "not a recognised record key";
        if settings.strict_keys {
            c.require(known, key, message);
        } else {
            c.warn(known, key, message);
        }
    }

    let g = &record.general;
    c.require(!g.env_name.trim().is_empty(), "env_name", "must not be empty");
    c.require(
        (0..=u32::MAX as i64).contains(&g.seed),
        "seed",
        format!("must be between 0 and 2^32 - 1, got {}", g.seed),
    );
    c.at_least_one(g.num_iter, "num_iter");
    c.at_least_one(g.paths_per_iter, "paths_per_iter");
    c.at_least_one(g.num_models, "num_models");
    c.at_least_one(g.save_freq, "save_freq");
    if let Some(n) = g.init_samples {
        c.at_least_one(n, "init_samples");
    }
    if let Some(n) = g.iter_samples {
        c.at_least_one(n, "iter_samples");
    }
    c.require(
        g.init_samples.is_some() == g.iter_samples.is_some(),
        "init_samples",
        "init_samples and iter_samples must be set together",
    );

    let d = &record.dynamics;
    c.sizes(&d.hidden_size, "hidden_size");
    c.finite(d.fit_lr, "fit_lr");
    c.positive(d.fit_lr, "fit_lr");
    c.finite(d.fit_wd, "fit_wd");
    c.require(d.fit_wd >= 0.0, "fit_wd", format!("must be non-negative, got {}", d.fit_wd));
    c.at_least_one(d.fit_mb_size, "fit_mb_size");
    c.at_least_one(d.fit_epochs, "fit_epochs");
    c.at_least_one(d.max_paths, "max_paths");
    c.at_least_one(d.replay_buffer_size, "replay_buffer_size");

    let i = &record.initial;
    c.finite(i.init_log_std, "init_log_std");
    c.require(
        i.use_demos || i.n_init_paths >= 1,
        "n_init_paths",
        "must be at least 1 when demos are not used",
    );
    c.require(
        !i.use_demos || i.demo_file.is_some(),
        "demo_file",
        "use_demos is True but no demo_file is given",
    );
    c.warn(
        i.use_demos || i.demo_file.is_none(),
        "demo_file",
        "is set but use_demos is False, so it will be ignored",
    );

    if let Some(npg) = &record.npg {
        c.sizes(&npg.policy_size, "policy_size");
        c.at_least_one(npg.inner_steps, "inner_steps");
        c.finite(npg.step_size, "step_size");
        c.positive(npg.step_size, "step_size");
        c.at_least_one(npg.update_paths, "update_paths");
        c.require(
            npg.hvp_frac > 0.0 && npg.hvp_frac <= 1.0,
            "hvp_frac",
            format!("must be in (0, 1], got {}", npg.hvp_frac),
        );
        c.finite(npg.min_log_std, "min_log_std");
        if let Some(frac) = npg.buffer_frac {
            c.require(
                (0.0..=1.0).contains(&frac),
                "buffer_frac",
                format!("must be in [0, 1], got {}", frac),
            );
        }
        if let Some(h) = npg.horizon {
            c.at_least_one(h, "horizon");
        }
        c.warn(
            i.init_log_std >= npg.min_log_std,
            "init_log_std",
            format!(
                "{} is below min_log_std {}; log_std jumps to the floor at the first update",
                i.init_log_std, npg.min_log_std
            ),
        );
    }

    if let Some(mpc) = &record.mpc {
        c.finite(mpc.noise_level, "noise_level");
        c.require(
            mpc.noise_level >= 0.0,
            "noise_level",
            format!("must be non-negative, got {}", mpc.noise_level),
        );
        c.require(!mpc.filter_coefs.is_empty(), "filter_coefs", "must not be empty");
        for (name, coef) in &mpc.filter_coefs.coefs {
            c.finite(*coef, &format!("filter_coefs.{}", name));
        }
        if let Some(expected) = settings.expected_filter_total {
            let total = mpc.filter_coefs.total();
            c.require(
                (total - expected).abs() <= FILTER_TOTAL_TOLERANCE,
                "filter_coefs",
                format!("coefficients sum to {}, expected {}", total, expected),
            );
        }
        c.at_least_one(mpc.plan_paths, "plan_paths");
        c.at_least_one(mpc.plan_horizon, "plan_horizon");
        c.finite(mpc.kappa, "kappa");
        c.positive(mpc.kappa, "kappa");
        c.finite(mpc.omega, "omega");
    }

    c.report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::resolve;
    use crate::job::defaults::DefaultSettings;
    use crate::literal::parse;

    const BASE: &str = "{
        'env_name': 'mjrl_point_mass-v0', 'seed': 123, 'debug_mode': False,
        'num_iter': 5, 'paths_per_iter': 10, 'num_models': 2,
        'hidden_size': (64, 64), 'activation': 'relu', 'fit_lr': 1e-3, 'fit_wd': 0.0,
        'fit_mb_size': 16, 'fit_epochs': 5, 'max_paths': 100, 'refresh_fit': False,
        'init_log_std': -0.5, 'n_init_paths': 10, 'use_demos': False, 'demo_file': None,
        'noisy_mpc': False, 'noise_level': 0.1, 'filter_coefs': {'f1': 0.5, 'f2': 1.0},
        'plan_paths': 100, 'plan_horizon': 16, 'kappa': 5.0, 'omega': 0.0,
    }";

    const NPG_BLOCK: &str = "'omega': 0.0, 'policy_size': (32, 32), 'inner_steps': 5, \
                             'step_size': 0.05, 'update_paths': 50,";

    fn with_npg(extra: &str) -> String {
        BASE.replace("'omega': 0.0,", &format!("{} {}", NPG_BLOCK, extra))
    }

    fn report_for(text: &str, settings: &ValidationSettings) -> ValidationReport {
        let job = resolve(parse(text).unwrap(), &DefaultSettings::default()).unwrap();
        validate(&job.record, &job.mapping, settings)
    }

    #[test]
    fn test_clean_record() {
        let report = report_for(BASE, &ValidationSettings::default());
        assert!(report.is_valid(), "{:?}", report.findings);
        assert_eq!(report.warnings().count(), 0);
        assert_eq!(report.checks_passed(), report.checks_run);
    }

    #[test]
    fn test_zero_learning_rate() {
        let report = report_for(&BASE.replace("1e-3", "0.0"), &ValidationSettings::default());
        assert!(!report.is_valid());
        assert!(report.errors().any(|f| f.field == "fit_lr"));
    }

    #[test]
    fn test_zero_iterations() {
        let report = report_for(
            &BASE.replace("'num_iter': 5", "'num_iter': 0"),
            &ValidationSettings::default(),
        );
        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("num_iter"));
    }

    #[test]
    fn test_unknown_key_severity() {
        let text = BASE.replace("'omega': 0.0,", "'omega': 0.0, 'gamma': 0.99,");
        let lenient = report_for(&text, &ValidationSettings::default());
        assert!(lenient.is_valid());
        assert!(lenient.warnings().any(|f| f.field == "gamma"));

        let strict = ValidationSettings {
            strict_keys: true,
            ..Default::default()
        };
        assert!(!report_for(&text, &strict).is_valid());
    }

    #[test]
    fn test_expected_filter_total() {
        let matching = ValidationSettings {
            expected_filter_total: Some(1.5),
            ..Default::default()
        };
        assert!(report_for(BASE, &matching).is_valid());

        let other = ValidationSettings {
            expected_filter_total: Some(1.0),
            ..Default::default()
        };
        let report = report_for(BASE, &other);
        assert!(report.errors().any(|f| f.field == "filter_coefs"));
    }

    #[test]
    fn test_demo_rules() {
        let text = BASE.replace("'use_demos': False", "'use_demos': True");
        assert!(report_for(&text, &ValidationSettings::default())
            .errors()
            .any(|f| f.field == "demo_file"));

        let text = BASE.replace("'demo_file': None", "'demo_file': 'demos.pickle'");
        let report = report_for(&text, &ValidationSettings::default());
        assert!(report.is_valid());
        assert!(report.warnings().any(|f| f.field == "demo_file"));
    }

    #[test]
    fn test_seed_range() {
        let report = report_for(
            &BASE.replace("'seed': 123", "'seed': -1"),
            &ValidationSettings::default(),
        );
        assert!(report.errors().any(|f| f.field == "seed"));
    }

    #[test]
    fn test_non_finite_kappa() {
        let report = report_for(
            &BASE.replace("'kappa': 5.0", "'kappa': float('inf')"),
            &ValidationSettings::default(),
        );
        assert!(report.errors().any(|f| f.field == "kappa"));
    }

    #[test]
    fn test_npg_block_clean() {
        let report = report_for(&with_npg(""), &ValidationSettings::default());
        assert!(report.is_valid(), "{:?}", report.findings);
        assert_eq!(report.warnings().count(), 0);
    }

    #[test]
    fn test_hvp_frac_range() {
        for bad in ["0.0", "1.5", "-0.2"] {
            let report = report_for(
                &with_npg(&format!("'hvp_frac': {},", bad)),
                &ValidationSettings::default(),
            );
            assert!(report.errors().any(|f| f.field == "hvp_frac"), "hvp_frac {}", bad);
        }
        let report = report_for(&with_npg("'hvp_frac': 0.5,"), &ValidationSettings::default());
        assert!(report.is_valid());
    }

    #[test]
    fn test_buffer_frac_range() {
        let report = report_for(
            &with_npg("'start_state': 'buffer', 'buffer_frac': 1.2,"),
            &ValidationSettings::default(),
        );
        assert!(report.errors().any(|f| f.field == "buffer_frac"));

        let report = report_for(
            &with_npg("'start_state': 'buffer', 'buffer_frac': 0.0,"),
            &ValidationSettings::default(),
        );
        assert!(report.is_valid(), "{:?}", report.findings);
    }

    #[test]
    fn test_init_log_std_below_floor_warns() {
        let report = report_for(&with_npg("'min_log_std': -0.1,"), &ValidationSettings::default());
        assert!(report.is_valid());
        let warning = report
            .warnings()
            .find(|f| f.field == "init_log_std")
            .unwrap();
        assert!(warning.message.contains("-0.1"));
        assert!(!warning.message.contains("clamped"));
    }
}
