use crate::foundation::core::Rgba8Premul;
use crate::render::frame::FrameRGBA;

/// Axis-aligned clip rectangle in pixel space, half-open on the right and bottom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRect {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

/// Fill `rings` with `color` using the even-odd rule.
///
/// A pixel is covered when its centre is inside the shape and inside `clip`. No antialiasing, so
/// the result is exact and platform independent.
pub fn fill_even_odd(
    frame: &mut FrameRGBA,
    rings: &[Vec<(f64, f64)>],
    color: Rgba8Premul,
    clip: ClipRect,
) {
    if color.a == 0 || frame.width == 0 || frame.height == 0 {
        return;
    }

    let mut edges: Vec<((f64, f64), (f64, f64))> = Vec::new();
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for ring in rings.iter().filter(|r| r.len() >= 3) {
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            if a.1 == b.1 {
                continue;
            }
            min_y = min_y.min(a.1.min(b.1));
            max_y = max_y.max(a.1.max(b.1));
            edges.push((a, b));
        }
    }
    if edges.is_empty() {
        return;
    }

    let top = min_y.max(clip.y0).max(0.0);
    let bottom = max_y.min(clip.y1).min(f64::from(frame.height));
    let row0 = (top - 0.5).ceil().max(0.0) as u32;
    let row1 = (bottom - 0.5).ceil().max(0.0) as u32;

    let mut xs: Vec<f64> = Vec::new();
    for row in row0..row1 {
        let yc = f64::from(row) + 0.5;
        if yc < clip.y0 || yc >= clip.y1 {
            continue;
        }
        xs.clear();
        for &((ax, ay), (bx, by)) in &edges {
            let (lo, hi) = if ay < by { (ay, by) } else { (by, ay) };
            if yc >= lo && yc < hi {
                xs.push(ax + (yc - ay) * (bx - ax) / (by - ay));
            }
        }
        xs.sort_by(f64::total_cmp);
        for pair in xs.chunks_exact(2) {
            let left = pair[0].max(clip.x0);
            let right = pair[1].min(clip.x1);
            if right <= left {
                continue;
            }
            let x0 = (left - 0.5).ceil().max(0.0);
            let x1 = (right - 0.5).ceil().max(0.0);
            frame.blend_span(row, x0 as u32, x1 as u32, color);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
