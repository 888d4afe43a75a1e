use std::path::Path;

use crate::foundation::error::TilecheckResult;
use crate::render::frame::ensure_parent_dir;
use crate::resource::encoding::gzip;
use crate::resource::transport::StaticTransport;
use crate::tile::vector::{TileBuilder, rect_ring};

/// Origin every fixture URL starts with.
pub const FIXTURE_ORIGIN: &str = "http://localhost:2900";
/// Scene document URL.
pub const STYLE_URL: &str = "http://localhost:2900/style.json";
/// URL of the single fixture tile.
pub const TILE_URL: &str = "http://localhost:2900/tiles/0-0-0.pbf";

const STYLE_PATH: &str = "style.json";
const TILE_PATH: &str = "tiles/0-0-0.pbf";

/// Scene document of the fixture set.
pub fn fixture_style() -> String {
    format!(
        r##"{{
  "version": 8,
  "name": "gzip fixture",
  "center": [0, 0],
  "zoom": 0,
  "sources": {{
    "fixture": {{
      "type": "vector",
      "tiles": ["{FIXTURE_ORIGIN}/tiles/{{z}}-{{x}}-{{y}}.pbf"],
      "maxzoom": 0
    }}
  }},
  "layers": [
    {{ "id": "land", "type": "background", "paint": {{ "background-color": "#f2efe9" }} }},
    {{ "id": "water", "type": "fill", "source": "fixture", "source-layer": "water",
       "paint": {{ "fill-color": "#a0c8f0" }} }},
    {{ "id": "park", "type": "fill", "source": "fixture", "source-layer": "park",
       "paint": {{ "fill-color": "#c8e6a0", "fill-opacity": 0.8 }} }}
  ]
}}
"##
    )
}

/// Uncompressed protobuf bytes of the fixture tile.
pub fn fixture_tile() -> Vec<u8> {
    TileBuilder::new()
        .layer("water")
        .polygon(vec![vec![
            (0, 2600),
            (1400, 2300),
            (2900, 2700),
            (4096, 2400),
            (4096, 4096),
            (0, 4096),
        ]])
        .layer("park")
        .polygon(vec![
            rect_ring(600, 500, 2200, 1900),
            rect_ring(1100, 1000, 1700, 1400),
        ])
        .polygon(vec![rect_ring(2800, 700, 3600, 1600)])
        .encode()
}

/// Gzip-compressed fixture tile, as a static server would store it.
pub fn fixture_tile_gz() -> Vec<u8> {
    gzip(&fixture_tile())
}

/// Write `style.json` and `tiles/0-0-0.pbf` (gzip) below `dir`.
pub fn write_fixture_set(dir: &Path) -> TilecheckResult<()> {
    use anyhow::Context as _;
    let style = dir.join(STYLE_PATH);
    let tile = dir.join(TILE_PATH);
    ensure_parent_dir(&style)?;
    ensure_parent_dir(&tile)?;
    std::fs::write(&style, fixture_style())
        .with_context(|| format!("write fixture '{}'", style.display()))?;
    std::fs::write(&tile, fixture_tile_gz())
        .with_context(|| format!("write fixture '{}'", tile.display()))?;
    Ok(())
}

/// In-memory transport serving the fixture set, tiles labelled `Content-Encoding: gzip`.
pub fn fixture_transport() -> StaticTransport {
    let mut t = StaticTransport::new();
    t.insert(STYLE_URL, fixture_style().into_bytes());
    t.insert_gzip(TILE_URL, fixture_tile_gz());
    t
}

#[cfg(test)]
#[path = "../../tests/unit/harness/fixtures.rs"]
mod tests;
