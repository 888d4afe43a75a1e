use super::*;

#[test]
fn world_at_zoom_zero_is_one_tile() {
    let cov = covering_tiles(LngLat::new(0.0, 0.0), 0.0, 512, 512, 0, 14);
    assert_eq!(cov.zoom, 0);
    assert_eq!(cov.placements.len(), 1);
    let p = cov.placements[0];
    assert_eq!(p.id, TileId { z: 0, x: 0, y: 0 });
    assert_eq!(p.origin, (0.0, 0.0));
    assert_eq!(p.size, 512.0);
}

#[test]
fn fractional_zoom_floors_and_scales() {
    let cov = covering_tiles(LngLat::new(0.0, 0.0), 1.5, 256, 256, 0, 14);
    assert_eq!(cov.zoom, 1);
    let expected = 512.0 * 2f64.powf(1.5) / 2.0;
    assert!(cov.placements.iter().all(|p| (p.size - expected).abs() < 1e-9));
    // Centre of the world at z1 touches all four tiles.
    assert_eq!(cov.unique_tiles().len(), 4);
}

#[test]
fn zoom_clamps_to_source_range() {
    let cov = covering_tiles(LngLat::new(0.0, 0.0), 6.0, 512, 512, 0, 2);
    assert_eq!(cov.zoom, 2);
    assert!(cov.placements.iter().all(|p| p.id.z == 2));

    let cov = covering_tiles(LngLat::new(0.0, 0.0), 0.0, 512, 512, 3, 5);
    assert_eq!(cov.zoom, 3);
}

#[test]
fn columns_wrap_across_the_antimeridian() {
    let cov = covering_tiles(LngLat::new(180.0, 0.0), 1.0, 512, 512, 0, 14);
    let xs: Vec<u32> = cov.placements.iter().map(|p| p.id.x).collect();
    assert!(xs.contains(&0));
    assert!(xs.contains(&1));
    assert!(xs.iter().all(|x| *x < 2));
}

#[test]
fn rows_clamp_to_the_world() {
    let cov = covering_tiles(LngLat::new(0.0, 85.0), 0.0, 512, 1024, 0, 14);
    assert!(cov.placements.iter().all(|p| p.id.y == 0));
}

#[test]
fn wide_viewport_repeats_the_same_tile() {
    let cov = covering_tiles(LngLat::new(0.0, 0.0), 0.0, 1536, 512, 0, 14);
    assert_eq!(cov.placements.len(), 3);
    assert_eq!(cov.unique_tiles(), vec![TileId { z: 0, x: 0, y: 0 }]);
}
