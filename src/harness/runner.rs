//! Scenario execution: render, then record a baseline or compare against it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::compare::comparator::{ComparisonResult, ImageComparator};
use crate::diagnostics::{Diagnostic, DiagnosticChannel};
use crate::foundation::error::TilecheckResult;
use crate::harness::config::{HarnessConfig, HarnessMode};
use crate::harness::scenario::{Scenario, SceneSource};
use crate::render::frame::{encode_png, ensure_parent_dir};
use crate::render::pipeline::{RenderOptions, RenderPipeline};
use crate::resource::encoding::EncodingPolicy;
use crate::resource::provider::ResourceProvider;
use crate::resource::transport::Transport;

/// Image paths of one scenario below the results directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioArtifacts {
    /// Baseline, `<name>-expected.png`.
    pub expected: PathBuf,
    /// Candidate, `<name>-actual.png`.
    pub actual: PathBuf,
    /// Diff image, `<name>-diff.png`.
    pub diff: PathBuf,
}

/// Outcome of one [`Scenario`].
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Mode the scenario ran in.
    pub mode: HarnessMode,
    /// Every diagnostic observed during the render, in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// Comparison outcome; `None` in record mode or when nothing was rendered.
    pub comparison: Option<ComparisonResult>,
    /// Human-readable failure reasons.
    pub failures: Vec<String>,
    /// Artifact locations.
    pub artifacts: ScenarioArtifacts,
}

impl ScenarioReport {
    /// `true` when no check failed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives [`Scenario`]s end to end: render, persist, compare, assert.
pub struct VerificationHarness {
    config: HarnessConfig,
    transport: Arc<dyn Transport>,
    comparator: ImageComparator,
}

impl std::fmt::Debug for VerificationHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationHarness")
            .field("config", &self.config)
            .field("comparator", &self.comparator)
            .finish_non_exhaustive()
    }
}

impl VerificationHarness {
    /// Harness fetching every resource through `transport`.
    pub fn new(config: HarnessConfig, transport: Arc<dyn Transport>) -> Self {
        let comparator = ImageComparator::for_kind(config.diff_tool);
        Self {
            config,
            transport,
            comparator,
        }
    }

    /// Replace the comparator chosen from the config.
    pub fn with_comparator(mut self, comparator: ImageComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Artifact paths for scenario `name`.
    pub fn artifact_paths(&self, name: &str) -> ScenarioArtifacts {
        let dir = &self.config.results_dir;
        ScenarioArtifacts {
            expected: dir.join(format!("{name}-expected.png")),
            actual: dir.join(format!("{name}-actual.png")),
            diff: dir.join(format!("{name}-diff.png")),
        }
    }

    /// Run one scenario.
    ///
    /// Render and comparison problems become report failures. Only IO errors while persisting
    /// artifacts are returned as `Err`.
    #[tracing::instrument(skip(self, scenario), fields(scenario = %scenario.name, mode = ?self.config.mode))]
    pub async fn run(&self, scenario: &Scenario) -> TilecheckResult<ScenarioReport> {
        let diagnostics = DiagnosticChannel::new();
        let (_subscription, log) = diagnostics.collect();
        let artifacts = self.artifact_paths(&scenario.name);
        let mut failures = Vec::new();
        let mut comparison = None;

        let provider = ResourceProvider::new(
            Arc::clone(&self.transport),
            EncodingPolicy {
                tiles: scenario.tile_encoding,
            },
        );
        let mut pipeline = RenderPipeline::new(provider);
        let opts = RenderOptions {
            tile_timeout: self.config.tile_timeout(),
            ..scenario.render.clone()
        };

        match self.render_png(&mut pipeline, scenario, &opts, &diagnostics).await {
            Ok(png) => match self.config.mode {
                HarnessMode::RecordBaseline => {
                    write_artifact(&artifacts.expected, &png).await?;
                    info!(path = %artifacts.expected.display(), "baseline recorded");
                }
                HarnessMode::Verify => {
                    write_artifact(&artifacts.actual, &png).await?;
                    let result = self
                        .comparator
                        .compare(
                            &artifacts.actual,
                            &artifacts.expected,
                            &artifacts.diff,
                            self.config.tolerance,
                        )
                        .await;
                    if !result.passed() {
                        failures.push(format!(
                            "image difference {} exceeds tolerance {}: {}",
                            result.difference, result.tolerance, result.diagnostic_text
                        ));
                    }
                    comparison = Some(result);
                }
            },
            Err(e) => failures.push(format!("render failed: {e}")),
        }

        diagnostics.flush().await;
        let observed = log.snapshot();
        failures.extend(scenario.expect.check(&observed));
        diagnostics.unsubscribe_all();

        if failures.is_empty() {
            info!("scenario passed");
        } else {
            warn!(failures = failures.len(), "scenario failed");
        }
        Ok(ScenarioReport {
            name: scenario.name.clone(),
            mode: self.config.mode,
            diagnostics: observed,
            comparison,
            failures,
            artifacts,
        })
    }

    /// Run `scenarios` one after another.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> TilecheckResult<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run(scenario).await?);
        }
        Ok(reports)
    }

    async fn render_png(
        &self,
        pipeline: &mut RenderPipeline,
        scenario: &Scenario,
        opts: &RenderOptions,
        diagnostics: &DiagnosticChannel,
    ) -> TilecheckResult<Vec<u8>> {
        match &scenario.scene {
            SceneSource::Inline(json) => pipeline.load_scene(json)?,
            SceneSource::Url(url) => pipeline.load_scene_url(url).await?,
        }
        let frame = pipeline.render(opts, diagnostics).await?;
        encode_png(&frame)
    }
}

async fn write_artifact(path: &Path, png: &[u8]) -> TilecheckResult<()> {
    use anyhow::Context as _;
    ensure_parent_dir(path)?;
    tokio::fs::write(path, png)
        .await
        .with_context(|| format!("write artifact '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/harness/runner.rs"]
mod tests;
