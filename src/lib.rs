//! tilecheck loads vector map scenes through an async resource provider, renders them to RGBA
//! frames, and verifies the frames against golden images.
//!
//! The public API is built around four collaborators:
//!
//! - a [`ResourceProvider`] that turns [`Request`]s into single-delivery [`ResponseHandle`]s
//! - a [`DiagnosticChannel`] that carries non-fatal decode and transfer problems
//! - a [`RenderPipeline`] that renders a scene document into a [`FrameRGBA`]
//! - an [`ImageComparator`] that scores a candidate image against a baseline
//!
//! [`VerificationHarness`] wires them together for golden-image scenarios.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Image comparison against baselines.
pub mod compare;
/// Structured diagnostics.
pub mod diagnostics;
/// Golden-image verification harness.
pub mod harness;
/// Frames and the render pipeline.
pub mod render;
/// Requests, transports, and the resource provider.
pub mod resource;
/// Scene documents.
pub mod scene;
/// Vector tiles.
pub mod tile;

pub use crate::foundation::core::{LngLat, MAX_LAT, MAX_ZOOM, Rgba8Premul, TileId};
pub use crate::foundation::error::{TilecheckError, TilecheckResult};

pub use crate::compare::comparator::{ComparisonResult, ImageComparator};
pub use crate::compare::tool::{BuiltinMae, DiffTool, DiffToolKind, ImageMagickCompare};
pub use crate::diagnostics::{Diagnostic, DiagnosticChannel, DiagnosticLog, EventClass, Severity};
pub use crate::harness::config::{HarnessConfig, HarnessMode};
pub use crate::harness::runner::{ScenarioReport, VerificationHarness};
pub use crate::harness::scenario::{Scenario, SceneSource, gzip_scenarios};
pub use crate::render::frame::{FrameRGBA, encode_png};
pub use crate::render::pipeline::{
    MAX_FRAME_DIMENSION, PipelineState, RenderOptions, RenderPipeline,
};
pub use crate::resource::encoding::{EncodingPolicy, TileEncoding};
pub use crate::resource::provider::{Delivery, ResourceProvider, ResponseHandle};
pub use crate::resource::request::{Request, ResourceError, ResourceKind, Response};
#[cfg(feature = "http")]
pub use crate::resource::transport::HttpTransport;
pub use crate::resource::transport::{DirTransport, StaticTransport, Transport};
pub use crate::scene::style::SceneDocument;
