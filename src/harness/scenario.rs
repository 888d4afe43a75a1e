use serde::Serialize;

use crate::diagnostics::{Diagnostic, EventClass, Severity};
use crate::harness::fixtures::STYLE_URL;
use crate::render::pipeline::RenderOptions;
use crate::resource::encoding::TileEncoding;

/// Where a scenario's scene document comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneSource {
    /// JSON text, loaded without a request.
    Inline(String),
    /// Fetched through the provider as a required resource.
    Url(String),
}

/// One diagnostic signature to look for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticMatcher {
    /// Required class.
    pub class: EventClass,
    /// Required severity.
    pub severity: Severity,
    /// Substring the text must contain.
    pub text_contains: String,
    /// Exact number of matching diagnostics.
    pub count: usize,
}

impl DiagnosticMatcher {
    /// Return `true` when `d` has this signature.
    pub fn matches(&self, d: &Diagnostic) -> bool {
        d.class == self.class && d.severity == self.severity && d.text.contains(&self.text_contains)
    }
}

/// What a scenario expects on the diagnostic channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticExpectation {
    /// No `ERROR` diagnostics at all.
    NoErrors,
    /// Exactly `count` diagnostics matching the signature, and no other `ERROR`s.
    Exactly(DiagnosticMatcher),
}

impl DiagnosticExpectation {
    /// Failure messages for `observed`; empty when the expectation holds.
    pub fn check(&self, observed: &[Diagnostic]) -> Vec<String> {
        let mut failures = Vec::new();
        match self {
            Self::NoErrors => {
                for d in observed.iter().filter(|d| d.severity == Severity::Error) {
                    failures.push(format!("unexpected diagnostic: {d}"));
                }
            }
            Self::Exactly(m) => {
                let hits = observed.iter().filter(|d| m.matches(d)).count();
                if hits != m.count {
                    failures.push(format!(
                        "expected {} {} {} diagnostic(s) containing '{}', observed {hits}",
                        m.count, m.severity, m.class, m.text_contains
                    ));
                }
                for d in observed
                    .iter()
                    .filter(|d| d.severity == Severity::Error && !m.matches(d))
                {
                    failures.push(format!("unexpected diagnostic: {d}"));
                }
            }
        }
        failures
    }
}

/// One render-and-compare case.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Artifact prefix, e.g. `gz-success`.
    pub name: String,
    /// Human-readable title.
    pub description: String,
    /// Scene document.
    pub scene: SceneSource,
    /// How the provider treats compressed tiles.
    pub tile_encoding: TileEncoding,
    /// Diagnostics the render must produce.
    pub expect: DiagnosticExpectation,
    /// Render options; the harness config supplies the tile timeout.
    pub render: RenderOptions,
}

impl Scenario {
    /// Scenario rendering `scene` with default options and no expected errors.
    pub fn new(name: impl Into<String>, scene: SceneSource) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            scene,
            tile_encoding: TileEncoding::Decompress,
            expect: DiagnosticExpectation::NoErrors,
            render: RenderOptions::default(),
        }
    }
}

/// The two gzip scenarios against the fixture set.
///
/// `gz-success` inflates tiles and expects a clean render. `gz-fail` hands the compressed tile
/// to the decoder and expects exactly one `ParseTile` error plus a blank tile.
pub fn gzip_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            description: "unpacked gzip".to_owned(),
            ..Scenario::new("gz-success", SceneSource::Url(STYLE_URL.to_owned()))
        },
        Scenario {
            description: "unhandled gzip".to_owned(),
            tile_encoding: TileEncoding::Passthrough,
            expect: DiagnosticExpectation::Exactly(DiagnosticMatcher {
                class: EventClass::ParseTile,
                severity: Severity::Error,
                text_contains: "failed: pbf unknown field type exception".to_owned(),
                count: 1,
            }),
            ..Scenario::new("gz-fail", SceneSource::Url(STYLE_URL.to_owned()))
        },
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/harness/scenario.rs"]
mod tests;
