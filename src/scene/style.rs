//! Scene documents and TileJSON.
//!
//! Parsing failures are [`TilecheckError::Serde`]; a document that parses but refers to missing
//! sources or out-of-range zooms is [`TilecheckError::Validation`].

use crate::foundation::core::{LngLat, MAX_ZOOM};
use crate::foundation::error::{TilecheckError, TilecheckResult};
use crate::scene::color::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// JSON scene document: a viewport, vector sources, and an ordered layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Document format version.
    pub version: u32,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default viewport center.
    #[serde(default)]
    pub center: LngLat,
    /// Default viewport zoom.
    #[serde(default)]
    pub zoom: f64,
    /// Named tile sources.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceDef>,
    /// Layers, painted bottom to top.
    #[serde(default)]
    pub layers: Vec<LayerDef>,
}

/// Tile source declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceDef {
    /// Mapbox Vector Tile source.
    Vector(VectorSourceDef),
}

/// Vector source: either inline URL templates or a TileJSON `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSourceDef {
    /// TileJSON document URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline `{z}/{x}/{y}` URL templates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<String>,
    /// Lowest zoom with data.
    #[serde(default)]
    pub minzoom: u8,
    /// Highest zoom with data; deeper views overzoom this level.
    #[serde(default = "default_maxzoom")]
    pub maxzoom: u8,
}

fn default_maxzoom() -> u8 {
    14
}

fn default_opacity() -> f64 {
    1.0
}

/// One entry of the layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerDef {
    /// Solid fill of the whole viewport.
    Background {
        /// Layer id.
        id: String,
        /// Paint properties.
        #[serde(default)]
        paint: BackgroundPaint,
    },
    /// Polygon fill from a vector source layer.
    Fill {
        /// Layer id.
        id: String,
        /// Source name.
        source: String,
        /// Layer name inside the vector tile.
        #[serde(rename = "source-layer")]
        source_layer: String,
        /// Paint properties.
        #[serde(default)]
        paint: FillPaint,
    },
    /// Any layer type this renderer does not draw.
    #[serde(other)]
    Unsupported,
}

impl LayerDef {
    /// Layer id, if the layer type carries one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Background { id, .. } | Self::Fill { id, .. } => Some(id),
            Self::Unsupported => None,
        }
    }
}

/// Paint properties of a background layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPaint {
    /// Fill color.
    #[serde(rename = "background-color", default = "Color::black")]
    pub color: Color,
    /// Opacity multiplier in `[0, 1]`.
    #[serde(rename = "background-opacity", default = "default_opacity")]
    pub opacity: f64,
}

impl Default for BackgroundPaint {
    fn default() -> Self {
        Self {
            color: Color::black(),
            opacity: 1.0,
        }
    }
}

/// Paint properties of a fill layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillPaint {
    /// Polygon color.
    #[serde(rename = "fill-color", default = "Color::black")]
    pub color: Color,
    /// Opacity multiplier in `[0, 1]`.
    #[serde(rename = "fill-opacity", default = "default_opacity")]
    pub opacity: f64,
}

impl Default for FillPaint {
    fn default() -> Self {
        Self {
            color: Color::black(),
            opacity: 1.0,
        }
    }
}

impl SceneDocument {
    /// Parse a scene document from a JSON string.
    pub fn from_json(json: &str) -> TilecheckResult<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Parse a scene document from a JSON reader and validate it.
    pub fn from_reader<R: std::io::Read>(r: R) -> TilecheckResult<Self> {
        let doc: Self = serde_json::from_reader(r)
            .map_err(|e| TilecheckError::serde(format!("parse scene JSON: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parse a scene document from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TilecheckResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TilecheckError::validation(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check cross-references and numeric ranges.
    pub fn validate(&self) -> TilecheckResult<()> {
        if !self.zoom.is_finite() || self.zoom < 0.0 || self.zoom > f64::from(MAX_ZOOM) {
            return Err(TilecheckError::validation(format!(
                "scene zoom {} is outside 0..={MAX_ZOOM}",
                self.zoom
            )));
        }
        for (name, SourceDef::Vector(src)) in &self.sources {
            if src.url.is_none() && src.tiles.is_empty() {
                return Err(TilecheckError::validation(format!(
                    "source '{name}' needs either `url` or `tiles`"
                )));
            }
            if src.minzoom > src.maxzoom || src.maxzoom > MAX_ZOOM {
                return Err(TilecheckError::validation(format!(
                    "source '{name}' has invalid zoom range {}..={}",
                    src.minzoom, src.maxzoom
                )));
            }
        }
        for layer in &self.layers {
            if let LayerDef::Fill { id, source, .. } = layer
                && !self.sources.contains_key(source)
            {
                return Err(TilecheckError::validation(format!(
                    "layer '{id}' references unknown source '{source}'"
                )));
            }
        }
        Ok(())
    }
}

/// The subset of a TileJSON document the renderer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    /// Tile URL templates.
    pub tiles: Vec<String>,
    /// Lowest zoom with data.
    #[serde(default)]
    pub minzoom: u8,
    /// Highest zoom with data.
    #[serde(default = "default_maxzoom")]
    pub maxzoom: u8,
}

impl TileJson {
    /// Parse TileJSON from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let tj: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if tj.tiles.is_empty() {
            return Err("TileJSON has no tile URLs".to_owned());
        }
        if tj.minzoom > tj.maxzoom {
            return Err(format!(
                "TileJSON zoom range {}..={} is empty",
                tj.minzoom, tj.maxzoom
            ));
        }
        Ok(tj)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/style.rs"]
mod tests;
