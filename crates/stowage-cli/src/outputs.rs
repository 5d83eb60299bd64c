//! Step outputs and state shared between the restore and save steps.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use stowage_cache::RestoreOutcome;
use tracing::debug;

pub const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";
pub const STATE_FILE_VAR: &str = "GITHUB_STATE";
pub const CACHE_HIT_STATE: &str = "cache-hit";

const DELIMITER: &str = "STOWAGE_EOF";

/// An append-only `name=value` command file, or stdout when none is configured.
#[derive(Debug, Clone, Default)]
pub struct CommandFile {
    path: Option<PathBuf>,
}

impl CommandFile {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// The file named by environment variable `var`, if set and non-empty.
    pub fn from_env(var: &str) -> Self {
        Self::new(
            std::env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    fn format(name: &str, value: &str) -> String {
        if value.contains('\n') {
            format!("{name}<<{DELIMITER}\n{value}\n{DELIMITER}\n")
        } else {
            format!("{name}={value}\n")
        }
    }

    pub fn write(&self, name: &str, value: &str) -> io::Result<()> {
        let line = Self::format(name, value);
        match &self.path {
            Some(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?
                .write_all(line.as_bytes()),
            None => io::stdout().lock().write_all(line.as_bytes()),
        }
    }
}

/// Publish `cache-hit`, `cache-primary-key` and `cache-matched-key`.
pub fn write_restore_outputs(file: &CommandFile, outcome: &RestoreOutcome) -> io::Result<()> {
    file.write("cache-hit", if outcome.cache_hit { "true" } else { "false" })?;
    file.write("cache-primary-key", &outcome.primary_key)?;
    file.write("cache-matched-key", outcome.matched_key_output())
}

/// Record `name=value` for later steps of the job; a no-op outside a runner.
pub fn save_state(name: &str, value: &str) -> io::Result<()> {
    let file = CommandFile::from_env(STATE_FILE_VAR);
    if file.path.is_none() {
        debug!("{} is not set, not saving state {}", STATE_FILE_VAR, name);
        return Ok(());
    }
    file.write(name, value)
}

/// Value saved by an earlier step of the same job, exposed as `STATE_<name>`.
pub fn read_state(name: &str) -> Option<String> {
    std::env::var(format!("STATE_{name}")).ok()
}
