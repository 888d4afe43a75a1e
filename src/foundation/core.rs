use crate::foundation::error::{TilecheckError, TilecheckResult};

/// Highest zoom level accepted for tile addressing.
pub const MAX_ZOOM: u8 = 24;

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Address of one tile in the `z/x/y` Web Mercator pyramid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TileId {
    /// Zoom level.
    pub z: u8,
    /// Column, `0..2^z`.
    pub x: u32,
    /// Row, `0..2^z`, counted from the north.
    pub y: u32,
}

impl TileId {
    /// Create a validated tile address.
    pub fn new(z: u8, x: u32, y: u32) -> TilecheckResult<Self> {
        if z > MAX_ZOOM {
            return Err(TilecheckError::validation(format!(
                "tile zoom {z} exceeds maximum {MAX_ZOOM}"
            )));
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(TilecheckError::validation(format!(
                "tile {z}/{x}/{y} is outside the zoom {z} grid"
            )));
        }
        Ok(Self { z, x, y })
    }

    /// Expand a `{z}`/`{x}`/`{y}` URL template for this tile.
    pub fn expand_template(self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic position as `[longitude, latitude]` in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Create a position.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Project into normalized Web Mercator space, `[0, 1]` on both axes.
    ///
    /// Latitude is clamped to [`MAX_LAT`].
    pub fn to_mercator(self) -> (f64, f64) {
        let x = (self.lng + 180.0) / 360.0;
        let lat = self.lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
        let y = (1.0 - lat.tan().asinh() / std::f64::consts::PI) / 2.0;
        (x, y)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(v: LngLat) -> Self {
        [v.lng, v.lat]
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Scale all channels by an opacity in `[0, 1]`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let k = (opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
        Self {
            r: crate::foundation::math::mul_div255_u8(u16::from(self.r), k),
            g: crate::foundation::math::mul_div255_u8(u16::from(self.g), k),
            b: crate::foundation::math::mul_div255_u8(u16::from(self.b), k),
            a: crate::foundation::math::mul_div255_u8(u16::from(self.a), k),
        }
    }

    /// Channels as a `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
