//! Run output directory
//!
//! Creates the output directory a run writes into and stores the resolved
//! record there as `job_data.json`, defaults included.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::job::{ResolvedJob, RunSchedule};
use crate::literal::Mapping;

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// File name of the exported record inside the output directory
    pub job_data_file: String,
    /// Spaces per JSON indentation level
    pub json_indent: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            job_data_file: "job_data.json".to_string(),
            json_indent: 4,
        }
    }
}

/// Output directory of one run
pub struct Workspace {
    dir: PathBuf,
    settings: ExportSettings,
}

impl Workspace {
    /// Open the output directory, creating it if needed
    pub fn create(dir: impl AsRef<Path>, settings: ExportSettings, verbose: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create output directory")?;
            if verbose {
                eprintln!("[WORKSPACE] Created {}", dir.display());
            }
        } else if !dir.is_dir() {
            anyhow::bail!("Output path {} exists and is not a directory", dir.display());
        }

        Ok(Self { dir, settings })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn job_data_path(&self) -> PathBuf {
        self.dir.join(&self.settings.job_data_file)
    }

    /// Write the record as pretty JSON
    pub fn write_job_data(&self, mapping: &Mapping) -> Result<PathBuf> {
        let json = to_json_string(mapping, self.settings.json_indent)?;
        let path = self.job_data_path();
        fs::write(&path, json).context("Failed to write job data file")?;
        Ok(path)
    }

    /// Read back a previously written record
    pub fn read_job_data(&self) -> Result<Mapping> {
        let text = fs::read_to_string(self.job_data_path()).context("Failed to read job data file")?;
        let mapping = crate::job::parse_text(&text, true).context("Failed to parse job data file")?;
        Ok(mapping)
    }

    /// Files the consumer will save over the run, in order
    pub fn checkpoint_files(&self, schedule: &RunSchedule) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for index in schedule.checkpoints() {
            files.push(self.dir.join(format!("agent_{}.pickle", index)));
            files.push(self.dir.join(format!("policy_{}.pickle", index)));
        }
        files.push(self.dir.join("agent_final.pickle"));
        files.push(self.dir.join("policy_final.pickle"));
        files
    }
}

/// Serialize a record with a fixed indentation width
pub fn to_json_string(mapping: &Mapping, indent: usize) -> Result<String> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    mapping
        .to_json()
        .serialize(&mut ser)
        .context("Failed to serialize job data")?;
    String::from_utf8(buf).context("Job data is not valid UTF-8")
}

/// Create the output directory and export the resolved record
pub fn prepare(
    out_dir: impl AsRef<Path>,
    job: &ResolvedJob,
    settings: ExportSettings,
    verbose: bool,
) -> Result<(Workspace, PathBuf)> {
    let workspace = Workspace::create(out_dir, settings, verbose)?;
    let path = workspace.write_job_data(&job.mapping)?;
    if verbose {
        eprintln!(
            "[WORKSPACE] Wrote {} keys to {}",
            job.mapping.len(),
            path.display()
        );
    }
    Ok((workspace, path))
}
