use super::*;

const OPEN: ClipRect = ClipRect {
    x0: f64::NEG_INFINITY,
    y0: f64::NEG_INFINITY,
    x1: f64::INFINITY,
    y1: f64::INFINITY,
};

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
    vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
}

fn covered(f: &FrameRGBA) -> usize {
    f.data.chunks_exact(4).filter(|px| px[3] != 0).count()
}

fn white() -> Rgba8Premul {
    Rgba8Premul::from_straight_rgba(255, 255, 255, 255)
}

#[test]
fn pixel_aligned_square_covers_exact_pixels() {
    let mut f = FrameRGBA::new(10, 10);
    fill_even_odd(&mut f, &[square(2.0, 3.0, 6.0, 5.0)], white(), OPEN);
    assert_eq!(covered(&f), 4 * 2);
    assert_eq!(f.pixel(2, 3).unwrap()[3], 255);
    assert_eq!(f.pixel(5, 4).unwrap()[3], 255);
    assert_eq!(f.pixel(6, 4).unwrap()[3], 0);
    assert_eq!(f.pixel(2, 5).unwrap()[3], 0);
}

#[test]
fn inner_ring_makes_a_hole() {
    let mut f = FrameRGBA::new(10, 10);
    fill_even_odd(
        &mut f,
        &[square(0.0, 0.0, 10.0, 10.0), square(3.0, 3.0, 7.0, 7.0)],
        white(),
        OPEN,
    );
    assert_eq!(covered(&f), 100 - 16);
    assert_eq!(f.pixel(5, 5).unwrap()[3], 0);
}

#[test]
fn clip_limits_coverage() {
    let mut f = FrameRGBA::new(10, 10);
    let clip = ClipRect {
        x0: 0.0,
        y0: 0.0,
        x1: 5.0,
        y1: 5.0,
    };
    fill_even_odd(&mut f, &[square(-5.0, -5.0, 20.0, 20.0)], white(), clip);
    assert_eq!(covered(&f), 25);
}

#[test]
fn shapes_outside_the_frame_are_ignored() {
    let mut f = FrameRGBA::new(4, 4);
    fill_even_odd(&mut f, &[square(10.0, 10.0, 20.0, 20.0)], white(), OPEN);
    fill_even_odd(&mut f, &[vec![(0.0, 0.0), (1.0, 1.0)]], white(), OPEN);
    assert_eq!(covered(&f), 0);
}

#[test]
fn translucent_fill_blends_over_background() {
    let mut f = FrameRGBA::new(2, 1);
    f.fill_all(Rgba8Premul::from_straight_rgba(0, 0, 255, 255));
    let half_red = Rgba8Premul::from_straight_rgba(255, 0, 0, 128);
    fill_even_odd(&mut f, &[square(0.0, 0.0, 1.0, 1.0)], half_red, OPEN);
    let px = f.pixel(0, 0).unwrap();
    assert_eq!(px[3], 255);
    assert!(px[0] > 120 && px[2] > 120);
    assert_eq!(f.pixel(1, 0), Some([0, 0, 255, 255]));
}
