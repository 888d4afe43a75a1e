//! Baseline comparison with a guaranteed diff artifact.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::compare::metric::{ToolVerdict, interpret_tool_output};
use crate::compare::tool::{BuiltinMae, DiffTool, DiffToolKind, ImageMagickCompare};
use crate::render::frame::{FrameRGBA, ensure_parent_dir, write_png};

/// Outcome of one image comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Normalized difference, or `+∞` when the metric could not be computed. Serialized as
    /// `null` when infinite.
    pub difference: f64,
    /// Tool report or failure text.
    pub diagnostic_text: String,
    /// Tolerance the difference is judged against.
    pub tolerance: f64,
}

impl ComparisonResult {
    fn failed(diagnostic_text: impl Into<String>, tolerance: f64) -> Self {
        Self {
            difference: f64::INFINITY,
            diagnostic_text: diagnostic_text.into(),
            tolerance,
        }
    }

    /// `difference ≤ tolerance`. An infinite difference never passes.
    pub fn passed(&self) -> bool {
        self.difference.is_finite() && self.difference <= self.tolerance
    }
}

/// Compares a candidate image with a baseline through a [`DiffTool`].
#[derive(Clone)]
pub struct ImageComparator {
    tool: Arc<dyn DiffTool>,
}

impl std::fmt::Debug for ImageComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageComparator")
            .field("tool", &self.tool.name())
            .finish()
    }
}

impl Default for ImageComparator {
    fn default() -> Self {
        Self::for_kind(DiffToolKind::default())
    }
}

impl ImageComparator {
    /// Compare with `tool`.
    pub fn new(tool: Arc<dyn DiffTool>) -> Self {
        Self { tool }
    }

    /// Compare with the built-in tool of the given kind.
    pub fn for_kind(kind: DiffToolKind) -> Self {
        match kind {
            DiffToolKind::Builtin => Self::new(Arc::new(BuiltinMae)),
            DiffToolKind::ImageMagick => Self::new(Arc::new(ImageMagickCompare::default())),
        }
    }

    /// Name of the underlying tool.
    pub fn tool_name(&self) -> &str {
        self.tool.name()
    }

    /// Compare `candidate` with `baseline`, writing a diff image to `diff`.
    ///
    /// Never fails: every problem becomes an infinite difference with an explanatory text. The
    /// diff artifact exists afterwards even when the comparison could not run.
    #[tracing::instrument(skip(self), fields(tool = self.tool.name()))]
    pub async fn compare(
        &self,
        candidate: &Path,
        baseline: &Path,
        diff: &Path,
        tolerance: f64,
    ) -> ComparisonResult {
        if let Err(e) = remove_stale_diff(candidate, baseline, diff).await {
            warn!(path = %diff.display(), "could not remove previous diff image: {e}");
        }
        let result = self.run_tool(candidate, baseline, diff, tolerance).await;
        if let Err(e) = ensure_diff_artifact(candidate, diff).await {
            warn!(path = %diff.display(), "could not write placeholder diff image: {e}");
        }
        debug!(
            difference = result.difference,
            passed = result.passed(),
            "comparison finished"
        );
        result
    }

    async fn run_tool(
        &self,
        candidate: &Path,
        baseline: &Path,
        diff: &Path,
        tolerance: f64,
    ) -> ComparisonResult {
        if !tokio::fs::try_exists(baseline).await.unwrap_or(false) {
            return ComparisonResult::failed(
                format!("baseline not found: {}", baseline.display()),
                tolerance,
            );
        }
        if let Err(e) = ensure_parent_dir(diff) {
            return ComparisonResult::failed(e.to_string(), tolerance);
        }
        let output = match self.tool.run(candidate, baseline, diff).await {
            Ok(o) => o,
            Err(e) => return ComparisonResult::failed(e.to_string(), tolerance),
        };
        match interpret_tool_output(&output) {
            ToolVerdict::Metric(difference) => ComparisonResult {
                difference,
                diagnostic_text: output.stderr.trim().to_owned(),
                tolerance,
            },
            ToolVerdict::HardFailure(text) | ToolVerdict::Unparseable(text) => {
                ComparisonResult::failed(text, tolerance)
            }
        }
    }
}

async fn remove_stale_diff(candidate: &Path, baseline: &Path, diff: &Path) -> std::io::Result<()> {
    if diff == candidate || diff == baseline {
        return Ok(());
    }
    match tokio::fs::remove_file(diff).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn ensure_diff_artifact(candidate: &Path, diff: &Path) -> crate::TilecheckResult<()> {
    if tokio::fs::try_exists(diff).await.unwrap_or(false) {
        return Ok(());
    }
    ensure_parent_dir(diff)?;
    if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
        use anyhow::Context as _;
        tokio::fs::copy(candidate, diff)
            .await
            .with_context(|| format!("copy '{}' to '{}'", candidate.display(), diff.display()))?;
        return Ok(());
    }
    write_png(&FrameRGBA::new(1, 1), diff)
}

#[cfg(test)]
#[path = "../../tests/unit/compare/comparator.rs"]
mod tests;
