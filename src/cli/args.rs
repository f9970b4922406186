//! Command-line argument parsing for mbrl-jobs
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mbrl-jobs - Parse, validate and export model-based RL job records
#[derive(Parser, Debug)]
#[command(name = "mbrl-jobs")]
#[command(version)]
#[command(about = "Parse, validate and export model-based RL job records", long_about = None)]
pub struct Args {
    /// Settings file path (defaults to ~/.mbrl-jobs/config.toml)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only errors and requested output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate one or more records
    Check {
        /// Record files (`.json` or literal text) or `preset:<name>`
        #[arg(required = true, value_name = "RECORD")]
        records: Vec<String>,

        /// Treat warnings as errors
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print a record
    Show {
        #[arg(value_name = "RECORD")]
        record: String,

        /// Print JSON instead of the literal form
        #[arg(long)]
        json: bool,

        /// Print the record as the consumer sees it (`seed` renamed to `base_seed`)
        #[arg(long)]
        run: bool,

        /// Do not fill in base-case defaults
        #[arg(long)]
        no_defaults: bool,
    },

    /// Create the output directory and write the resolved record
    Prepare {
        /// Record to prepare
        #[arg(short, long, value_name = "RECORD")]
        config: String,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the per-iteration schedule a record implies
    Plan {
        #[arg(value_name = "RECORD")]
        record: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compare two records key by key
    Diff {
        #[arg(value_name = "LEFT")]
        left: String,

        #[arg(value_name = "RIGHT")]
        right: String,
    },

    /// List built-in presets, or print one
    Presets {
        /// Preset to print
        name: Option<String>,
    },

    /// Build the record's policy and report its shape
    Policy {
        #[arg(value_name = "RECORD")]
        record: String,

        /// Observation dimension
        #[arg(long)]
        obs_dim: usize,

        /// Action dimension
        #[arg(long)]
        act_dim: usize,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose > 0 {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

impl Verbosity {
    /// Check if should show summaries and progress lines
    pub fn show_summary(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show tagged diagnostics
    pub fn show_diagnostics(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let args = Args::parse_from(["mbrl-jobs", "check", "a.txt", "preset:point_mass_npg"]);
        match args.command {
            Commands::Check { records, deny_warnings } => {
                assert_eq!(records, vec!["a.txt", "preset:point_mass_npg"]);
                assert!(!deny_warnings);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_prepare() {
        let args = Args::parse_from(["mbrl-jobs", "prepare", "--config", "job.txt", "--output", "out"]);
        assert!(matches!(args.command, Commands::Prepare { .. }));
    }

    #[test]
    fn test_verbosity() {
        let args = Args::parse_from(["mbrl-jobs", "-v", "presets"]);
        assert_eq!(args.verbosity(), Verbosity::Verbose);
        assert!(args.verbosity().show_diagnostics());

        let args = Args::parse_from(["mbrl-jobs", "presets", "--quiet"]);
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert!(!args.verbosity().show_summary());

        let args = Args::parse_from(["mbrl-jobs", "presets"]);
        assert_eq!(args.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_policy_requires_dims() {
        assert!(Args::try_parse_from(["mbrl-jobs", "policy", "job.txt"]).is_err());
        assert!(Args::try_parse_from([
            "mbrl-jobs", "policy", "job.txt", "--obs-dim", "4", "--act-dim", "2"
        ])
        .is_ok());
    }
}
