use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compare::tool::DiffToolKind;
use crate::foundation::error::{TilecheckError, TilecheckResult};

/// Environment switch selecting [`HarnessMode::RecordBaseline`].
pub const ENV_UPDATE: &str = "UPDATE";
/// Environment override for [`HarnessConfig::results_dir`].
pub const ENV_RESULTS_DIR: &str = "TILECHECK_RESULTS_DIR";
/// Environment override for [`HarnessConfig::diff_tool`].
pub const ENV_DIFF_TOOL: &str = "TILECHECK_DIFF_TOOL";
/// Environment override for [`HarnessConfig::tolerance`].
pub const ENV_TOLERANCE: &str = "TILECHECK_TOLERANCE";

/// Whether a run checks against baselines or rewrites them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessMode {
    /// Compare each candidate with its stored baseline.
    #[default]
    Verify,
    /// Store each candidate as the new baseline; never compare.
    RecordBaseline,
}

/// Settings shared by every scenario of a harness run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory receiving `<scenario>-{expected,actual,diff}.png`.
    pub results_dir: PathBuf,
    /// Verify or record.
    pub mode: HarnessMode,
    /// Largest normalized difference that still passes.
    pub tolerance: f64,
    /// Comparison tool.
    pub diff_tool: DiffToolKind,
    /// Per-tile wait, in milliseconds.
    pub tile_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("test/results"),
            mode: HarnessMode::Verify,
            tolerance: 0.001,
            diff_tool: DiffToolKind::Builtin,
            tile_timeout_ms: 10_000,
        }
    }
}

impl HarnessConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> TilecheckResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| TilecheckError::serde(format!("parse harness config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TilecheckResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TilecheckError::validation(format!("open harness config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Apply overrides from the process environment.
    pub fn with_process_env(self) -> TilecheckResult<Self> {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// `UPDATE` set to anything but empty, `0`, or `false` selects record mode.
    pub fn with_env<F>(mut self, lookup: F) -> TilecheckResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_UPDATE) {
            let v = v.trim();
            if !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false") {
                self.mode = HarnessMode::RecordBaseline;
            }
        }
        if let Some(dir) = lookup(ENV_RESULTS_DIR).filter(|d| !d.trim().is_empty()) {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(tool) = lookup(ENV_DIFF_TOOL) {
            self.diff_tool = tool.parse()?;
        }
        if let Some(t) = lookup(ENV_TOLERANCE) {
            self.tolerance = t.trim().parse().map_err(|e| {
                TilecheckError::validation(format!("{ENV_TOLERANCE}='{t}' is not a number: {e}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject negative or non-finite tolerances and a zero tile timeout.
    pub fn validate(&self) -> TilecheckResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(TilecheckError::validation(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.tile_timeout_ms == 0 {
            return Err(TilecheckError::validation("tile_timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Per-tile wait.
    pub fn tile_timeout(&self) -> Duration {
        Duration::from_millis(self.tile_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/harness/config.rs"]
mod tests;
