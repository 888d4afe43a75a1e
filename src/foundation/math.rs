pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Premultiplied source-over: `dst = src + dst * (1 - src.a)`.
pub(crate) fn blend_src_over_premul(dst: &mut [u8], src: [u8; 4]) {
    let inv = 255u16 - u16::from(src[3]);
    if inv == 0 {
        dst.copy_from_slice(&src);
        return;
    }
    for c in 0..4 {
        let v = u16::from(src[c]) + mul_div255_u16(u16::from(dst[c]), inv);
        dst[c] = v.min(255) as u8;
    }
}

/// Convert premultiplied RGBA8 pixels to straight alpha in place.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            if a == 0 {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
            }
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
