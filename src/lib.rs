//! mbrl-jobs - Job records for model-based RL experiments
//!
//! Parses the literal-mapping configuration records used to drive
//! dynamics-model fitting, natural policy gradient and MPC runs, applies the
//! consumer's base-case defaults, validates them and exports the resolved
//! job data.
//!
//! # Architecture
//!
//! - `literal`: value model, lexer, parser and renderer for the text form
//! - `job`: typed record, defaults, validation and run schedule
//! - `policy`: Gaussian MLP policy sized by the record
//! - `workspace`: output directory and `job_data.json` export

pub mod errors;
pub mod literal;
pub mod job;
pub mod presets;
pub mod diff;
pub mod workspace;
pub mod policy;
pub mod cli;

// Re-export commonly used types
pub use errors::{ConfigError, Result};
pub use job::{JobRecord, ResolvedJob};
pub use literal::{Mapping, Value};
