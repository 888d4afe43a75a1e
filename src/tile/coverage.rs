use crate::foundation::core::{LngLat, TileId};

/// Edge length of one tile on screen at its own integer zoom.
pub const TILE_SIZE: f64 = 512.0;

/// Where one tile lands in the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePlacement {
    /// Tile to fetch (column wrapped into the world).
    pub id: TileId,
    /// Screen position of the tile's top-left corner, in pixels.
    pub origin: (f64, f64),
    /// Screen edge length of the tile, in pixels.
    pub size: f64,
}

/// Tiles needed to cover a viewport at one source zoom.
#[derive(Clone, Debug, PartialEq)]
pub struct Coverage {
    /// Integer zoom the tiles are requested at.
    pub zoom: u8,
    /// Placements in row-major screen order. A tile may appear more than once when the
    /// viewport is wider than the world.
    pub placements: Vec<TilePlacement>,
}

impl Coverage {
    /// Distinct tile ids, in first-seen order.
    pub fn unique_tiles(&self) -> Vec<TileId> {
        let mut out: Vec<TileId> = Vec::with_capacity(self.placements.len());
        for p in &self.placements {
            if !out.contains(&p.id) {
                out.push(p.id);
            }
        }
        out
    }
}

/// Compute the tiles covering a `width`×`height` viewport centred on `center` at `zoom`.
///
/// The request zoom is `floor(zoom)` clamped to `[minzoom, maxzoom]`; beyond `maxzoom` the
/// deepest tiles are overzoomed.
pub fn covering_tiles(
    center: LngLat,
    zoom: f64,
    width: u32,
    height: u32,
    minzoom: u8,
    maxzoom: u8,
) -> Coverage {
    let zoom = zoom.max(0.0);
    let z = (zoom.floor() as u8).clamp(minzoom, maxzoom.max(minzoom));
    let n = 1i64 << z;
    let world = TILE_SIZE * 2f64.powf(zoom);
    let tile_px = world / n as f64;

    let (mx, my) = center.to_mercator();
    let left = mx * world - f64::from(width) / 2.0;
    let top = my * world - f64::from(height) / 2.0;
    let right = left + f64::from(width);
    let bottom = top + f64::from(height);

    let tx0 = (left / tile_px).floor() as i64;
    let tx1 = ((right / tile_px).ceil() as i64 - 1).max(tx0);
    let ty0 = ((top / tile_px).floor() as i64).max(0);
    let ty1 = ((bottom / tile_px).ceil() as i64 - 1).min(n - 1);

    let mut placements = Vec::new();
    for ty in ty0..=ty1 {
        for tx in tx0..=tx1 {
            let id = TileId {
                z,
                x: tx.rem_euclid(n) as u32,
                y: ty as u32,
            };
            placements.push(TilePlacement {
                id,
                origin: (tx as f64 * tile_px - left, ty as f64 * tile_px - top),
                size: tile_px,
            });
        }
    }
    Coverage {
        zoom: z,
        placements,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tile/coverage.rs"]
mod tests;
