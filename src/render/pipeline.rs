//! Scene-to-frame rendering.
//!
//! [`RenderPipeline`] owns a [`ResourceProvider`] and one loaded scene. `render` resolves
//! TileJSON sources, fetches the covering tiles concurrently with a bounded wait, and composites
//! background and fill layers. Tile-level problems become diagnostics; only scene-level failures
//! are errors.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, DiagnosticChannel, EventClass};
use crate::foundation::core::{LngLat, TileId};
use crate::foundation::error::{TilecheckError, TilecheckResult};
use crate::render::frame::FrameRGBA;
use crate::render::raster::{ClipRect, fill_even_odd};
use crate::resource::provider::{Delivery, ResourceProvider};
use crate::resource::request::{Request, ResourceError, ResourceKind};
use crate::scene::style::{LayerDef, SceneDocument, SourceDef, TileJson};
use crate::tile::coverage::{Coverage, covering_tiles};
use crate::tile::vector::{GeomType, VectorTile};

/// How long a required resource (scene document, TileJSON) may take.
pub const REQUIRED_RESOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest accepted render width or height, in pixels.
pub const MAX_FRAME_DIMENSION: u32 = 16_384;

/// Lifecycle of a [`RenderPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No scene loaded yet.
    Idle,
    /// A scene is loaded and ready to render.
    SceneLoaded,
    /// A render is in progress.
    Rendering,
    /// The last render produced a frame.
    FrameReady,
    /// A fatal error occurred; load a scene to recover.
    Failed,
}

/// Options for one [`RenderPipeline::render`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Overrides the scene's center.
    pub center: Option<LngLat>,
    /// Overrides the scene's zoom.
    pub zoom: Option<f64>,
    /// Longest wait for any single tile.
    pub tile_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            center: None,
            zoom: None,
            tile_timeout: Duration::from_secs(10),
        }
    }
}

struct ResolvedSource {
    name: String,
    template: String,
    minzoom: u8,
    maxzoom: u8,
}

struct SourceTiles {
    coverage: Coverage,
    tiles: HashMap<TileId, VectorTile>,
}

/// Loads a scene, fetches what it needs through a [`ResourceProvider`], and rasterizes it.
///
/// Transport failures on required resources are fatal. Failures on individual tiles, including
/// decode errors and timeouts, are reported on the [`DiagnosticChannel`] passed to
/// [`render`](Self::render) and leave the affected tile blank.
#[derive(Debug)]
pub struct RenderPipeline {
    provider: ResourceProvider,
    scene: Option<SceneDocument>,
    state: PipelineState,
}

impl RenderPipeline {
    /// Create an idle pipeline fetching through `provider`.
    pub fn new(provider: ResourceProvider) -> Self {
        Self {
            provider,
            scene: None,
            state: PipelineState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Loaded scene, if any.
    pub fn scene(&self) -> Option<&SceneDocument> {
        self.scene.as_ref()
    }

    /// Provider used for all requests.
    pub fn provider(&self) -> &ResourceProvider {
        &self.provider
    }

    /// Parse and store a scene document. Issues no requests.
    pub fn load_scene(&mut self, json: &str) -> TilecheckResult<()> {
        match SceneDocument::from_json(json) {
            Ok(doc) => {
                self.load_scene_document(doc);
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    /// Store an already parsed scene document.
    pub fn load_scene_document(&mut self, doc: SceneDocument) {
        for layer in &doc.layers {
            if matches!(layer, LayerDef::Unsupported) {
                warn!("scene contains a layer type that is not rendered; skipping it");
            }
        }
        debug!(
            sources = doc.sources.len(),
            layers = doc.layers.len(),
            "scene loaded"
        );
        self.scene = Some(doc);
        self.state = PipelineState::SceneLoaded;
    }

    /// Fetch the scene document at `url` as a required resource, then load it.
    pub async fn load_scene_url(&mut self, url: &str) -> TilecheckResult<()> {
        let result = async {
            let bytes = self.fetch_required(url, ResourceKind::Style).await?;
            let json = std::str::from_utf8(&bytes).map_err(|e| {
                TilecheckError::validation(format!("scene document '{url}' is not UTF-8: {e}"))
            })?;
            SceneDocument::from_json(json)
        }
        .await;
        match result {
            Ok(doc) => {
                self.load_scene_document(doc);
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    /// Render the loaded scene.
    ///
    /// Every diagnostic emitted while rendering has reached `diagnostics`' handlers by the time
    /// this returns.
    #[tracing::instrument(skip(self, opts, diagnostics), fields(width = opts.width, height = opts.height))]
    pub async fn render(
        &mut self,
        opts: &RenderOptions,
        diagnostics: &DiagnosticChannel,
    ) -> TilecheckResult<FrameRGBA> {
        if !matches!(
            self.state,
            PipelineState::SceneLoaded | PipelineState::FrameReady
        ) {
            return Err(TilecheckError::validation(format!(
                "cannot render in state {:?}",
                self.state
            )));
        }
        let Some(scene) = self.scene.clone() else {
            return Err(TilecheckError::validation("no scene loaded"));
        };
        if opts.width == 0 || opts.height == 0 {
            return Err(TilecheckError::validation(format!(
                "render size must be non-zero, got {}x{}",
                opts.width, opts.height
            )));
        }
        if opts.width > MAX_FRAME_DIMENSION || opts.height > MAX_FRAME_DIMENSION {
            return Err(TilecheckError::validation(format!(
                "render size {}x{} exceeds the {MAX_FRAME_DIMENSION} pixel limit",
                opts.width, opts.height
            )));
        }

        self.state = PipelineState::Rendering;
        let result = self.render_scene(&scene, opts, diagnostics).await;
        diagnostics.flush().await;
        self.state = match result {
            Ok(_) => PipelineState::FrameReady,
            Err(_) => PipelineState::Failed,
        };
        result
    }

    async fn render_scene(
        &self,
        scene: &SceneDocument,
        opts: &RenderOptions,
        diagnostics: &DiagnosticChannel,
    ) -> TilecheckResult<FrameRGBA> {
        let center = opts.center.unwrap_or(scene.center);
        let zoom = opts.zoom.unwrap_or(scene.zoom);

        let mut sources: HashMap<String, SourceTiles> = HashMap::new();
        for resolved in self.resolve_sources(scene, diagnostics).await? {
            let coverage = covering_tiles(
                center,
                zoom,
                opts.width,
                opts.height,
                resolved.minzoom,
                resolved.maxzoom,
            );
            let tiles = self
                .fetch_tiles(&resolved, &coverage, opts.tile_timeout, diagnostics)
                .await;
            sources.insert(resolved.name, SourceTiles { coverage, tiles });
        }

        let mut frame = FrameRGBA::new(opts.width, opts.height);
        for layer in &scene.layers {
            match layer {
                LayerDef::Background { paint, .. } => {
                    frame.fill_all(paint.color.to_rgba8_premul().with_opacity(paint.opacity));
                }
                LayerDef::Fill {
                    source,
                    source_layer,
                    paint,
                    ..
                } => {
                    if let Some(src) = sources.get(source) {
                        let color = paint.color.to_rgba8_premul().with_opacity(paint.opacity);
                        draw_fill_layer(&mut frame, src, source_layer, color);
                    }
                }
                LayerDef::Unsupported => {}
            }
        }
        Ok(frame)
    }

    async fn resolve_sources(
        &self,
        scene: &SceneDocument,
        diagnostics: &DiagnosticChannel,
    ) -> TilecheckResult<Vec<ResolvedSource>> {
        let mut out = Vec::new();
        for (name, SourceDef::Vector(def)) in &scene.sources {
            if let Some(template) = def.tiles.first() {
                out.push(ResolvedSource {
                    name: name.clone(),
                    template: template.clone(),
                    minzoom: def.minzoom,
                    maxzoom: def.maxzoom,
                });
                continue;
            }
            let Some(url) = def.url.as_deref() else {
                continue;
            };
            let bytes = self.fetch_required(url, ResourceKind::Source).await?;
            match TileJson::from_slice(&bytes) {
                Ok(tj) => out.push(ResolvedSource {
                    name: name.clone(),
                    template: tj.tiles[0].clone(),
                    minzoom: tj.minzoom,
                    maxzoom: tj.maxzoom,
                }),
                Err(reason) => diagnostics.emit(Diagnostic::error(
                    EventClass::ParseStyle,
                    format!("Parsing TileJSON for source '{name}' failed: {reason}"),
                )),
            }
        }
        Ok(out)
    }

    async fn fetch_required(&self, url: &str, kind: ResourceKind) -> TilecheckResult<Vec<u8>> {
        let handle = self.provider.request(Request::with_kind(url, kind));
        match handle.response_within(REQUIRED_RESOURCE_TIMEOUT).await {
            Delivery::Response(r) => Ok(r.into_result()?),
            Delivery::TimedOut => Err(ResourceError::Timeout.into()),
            Delivery::Cancelled => Err(TilecheckError::render(format!(
                "request for required resource '{url}' was cancelled"
            ))),
        }
    }

    async fn fetch_tiles(
        &self,
        source: &ResolvedSource,
        coverage: &Coverage,
        timeout: Duration,
        diagnostics: &DiagnosticChannel,
    ) -> HashMap<TileId, VectorTile> {
        let ids = coverage.unique_tiles();
        let waits = ids.iter().map(|id| {
            let url = id.expand_template(&source.template);
            self.provider
                .request(Request::with_kind(url, ResourceKind::Tile))
                .response_within(timeout)
        });
        let deliveries = futures::future::join_all(waits).await;

        let mut tiles = HashMap::new();
        for (id, delivery) in ids.into_iter().zip(deliveries) {
            match delivery {
                Delivery::Response(response) => {
                    let url = response.request.url.clone();
                    match response.into_result() {
                        Ok(bytes) => match VectorTile::decode(&bytes) {
                            Ok(tile) => {
                                tiles.insert(id, tile);
                            }
                            Err(e) => diagnostics.emit(Diagnostic::error(
                                EventClass::ParseTile,
                                format!("Parsing [{id}] failed: {e}"),
                            )),
                        },
                        Err(e) => diagnostics.emit(Diagnostic::error(
                            EventClass::HttpRequest,
                            format!("Failed to load tile {id} from {url}: {e}"),
                        )),
                    }
                }
                Delivery::TimedOut => diagnostics.emit(Diagnostic::warning(
                    EventClass::HttpRequest,
                    format!(
                        "Tile {id} of source '{}' timed out after {} ms",
                        source.name,
                        timeout.as_millis()
                    ),
                )),
                Delivery::Cancelled => diagnostics.emit(Diagnostic::warning(
                    EventClass::HttpRequest,
                    format!("Request for tile {id} was cancelled"),
                )),
            }
        }
        tiles
    }
}

fn draw_fill_layer(
    frame: &mut FrameRGBA,
    src: &SourceTiles,
    source_layer: &str,
    color: crate::foundation::core::Rgba8Premul,
) {
    for placement in &src.coverage.placements {
        let Some(layer) = src
            .tiles
            .get(&placement.id)
            .and_then(|t| t.layer(source_layer))
        else {
            continue;
        };
        if layer.extent == 0 {
            continue;
        }
        let scale = placement.size / f64::from(layer.extent);
        let (ox, oy) = placement.origin;
        let clip = ClipRect {
            x0: ox,
            y0: oy,
            x1: ox + placement.size,
            y1: oy + placement.size,
        };
        for feature in layer
            .features
            .iter()
            .filter(|f| f.kind == GeomType::Polygon)
        {
            let rings: Vec<Vec<(f64, f64)>> = feature
                .rings
                .iter()
                .map(|ring| {
                    ring.iter()
                        .map(|&(x, y)| (ox + f64::from(x) * scale, oy + f64::from(y) * scale))
                        .collect()
                })
                .collect();
            fill_even_odd(frame, &rings, color, clip);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
