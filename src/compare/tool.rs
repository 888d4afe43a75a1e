use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::compare::metric::HARD_FAILURE_EXIT;
use crate::foundation::error::{TilecheckError, TilecheckResult};
use crate::render::frame::ensure_parent_dir;

/// Exit status and error stream of one comparison tool run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Everything written to the error stream.
    pub stderr: String,
}

/// Computes a mean-absolute-error metric between two images and writes a diff image.
///
/// Implementations follow the `compare -metric MAE` contract: the report
/// `<raw> (<normalized>)` goes to the error stream, exit `0` means similar, `1` dissimilar,
/// `2` hard failure.
#[async_trait]
pub trait DiffTool: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Compare `candidate` with `baseline`, writing the diff image to `diff`.
    ///
    /// `Err` means the tool could not be run at all.
    async fn run(&self, candidate: &Path, baseline: &Path, diff: &Path)
    -> TilecheckResult<ToolOutput>;
}

/// Which [`DiffTool`] to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffToolKind {
    /// [`BuiltinMae`].
    #[default]
    Builtin,
    /// [`ImageMagickCompare`].
    ImageMagick,
}

impl std::str::FromStr for DiffToolKind {
    type Err = TilecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "imagemagick" | "compare" => Ok(Self::ImageMagick),
            other => Err(TilecheckError::validation(format!(
                "unknown diff tool '{other}' (expected 'builtin' or 'imagemagick')"
            ))),
        }
    }
}

/// Runs ImageMagick's `compare` as a subprocess.
#[derive(Clone, Debug)]
pub struct ImageMagickCompare {
    program: PathBuf,
}

impl Default for ImageMagickCompare {
    fn default() -> Self {
        Self::new("compare")
    }
}

impl ImageMagickCompare {
    /// Use `program` instead of `compare` from `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Return `true` when the program can be invoked.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DiffTool for ImageMagickCompare {
    fn name(&self) -> &str {
        "imagemagick"
    }

    async fn run(
        &self,
        candidate: &Path,
        baseline: &Path,
        diff: &Path,
    ) -> TilecheckResult<ToolOutput> {
        let output = tokio::process::Command::new(&self.program)
            .arg("-metric")
            .arg("MAE")
            .arg(candidate)
            .arg(baseline)
            .arg(diff)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TilecheckError::comparison(format!(
                    "failed to spawn '{}' (is ImageMagick installed and on PATH?): {e}",
                    self.program.display()
                ))
            })?;
        Ok(ToolOutput {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// In-process implementation of the `compare -metric MAE` contract.
///
/// The normalized metric is the mean absolute difference over all RGBA channels, in `[0, 1]`;
/// the raw metric is the same value scaled to 16-bit quantum range. Differing pixels are painted
/// red in the diff image over a washed-out copy of the candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinMae;

const DIFF_HIGHLIGHT: [u8; 4] = [241, 0, 30, 255];

impl BuiltinMae {
    fn compare_blocking(candidate: &Path, baseline: &Path, diff: &Path) -> ToolOutput {
        match Self::measure(candidate, baseline, diff) {
            Ok(normalized) => {
                let raw = normalized * 65535.0;
                ToolOutput {
                    exit_code: Some(if normalized == 0.0 { 0 } else { 1 }),
                    stderr: format!("{raw} ({normalized})"),
                }
            }
            Err(msg) => ToolOutput {
                exit_code: Some(HARD_FAILURE_EXIT),
                stderr: format!("compare: {msg}"),
            },
        }
    }

    fn measure(candidate: &Path, baseline: &Path, diff: &Path) -> Result<f64, String> {
        let open = |p: &Path| {
            image::open(p)
                .map(|img| img.to_rgba8())
                .map_err(|e| format!("unable to open image '{}': {e}", p.display()))
        };
        let a = open(candidate)?;
        let b = open(baseline)?;
        if a.dimensions() != b.dimensions() {
            return Err(format!(
                "image widths or heights differ ({}x{} vs {}x{})",
                a.width(),
                a.height(),
                b.width(),
                b.height()
            ));
        }

        let mut total: u64 = 0;
        let mut out = Vec::with_capacity(a.as_raw().len());
        for (pa, pb) in a.as_raw().chunks_exact(4).zip(b.as_raw().chunks_exact(4)) {
            let mut px_diff = 0u64;
            for c in 0..4 {
                px_diff += u64::from(pa[c].abs_diff(pb[c]));
            }
            total += px_diff;
            if px_diff == 0 {
                for c in pa.iter().take(3) {
                    out.push(255 - (255 - *c) / 4);
                }
                out.push(255);
            } else {
                out.extend_from_slice(&DIFF_HIGHLIGHT);
            }
        }

        ensure_parent_dir(diff).map_err(|e| e.to_string())?;
        image::save_buffer_with_format(
            diff,
            &out,
            a.width(),
            a.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| format!("unable to write diff image '{}': {e}", diff.display()))?;

        let samples = u64::from(a.width()) * u64::from(a.height()) * 4;
        if samples == 0 {
            return Ok(0.0);
        }
        Ok(total as f64 / (samples as f64 * 255.0))
    }
}

#[async_trait]
impl DiffTool for BuiltinMae {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn run(
        &self,
        candidate: &Path,
        baseline: &Path,
        diff: &Path,
    ) -> TilecheckResult<ToolOutput> {
        let (candidate, baseline, diff) = (
            candidate.to_path_buf(),
            baseline.to_path_buf(),
            diff.to_path_buf(),
        );
        tokio::task::spawn_blocking(move || Self::compare_blocking(&candidate, &baseline, &diff))
            .await
            .map_err(|e| TilecheckError::comparison(format!("builtin comparison panicked: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compare/tool.rs"]
mod tests;
