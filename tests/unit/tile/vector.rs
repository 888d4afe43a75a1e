use super::*;
use crate::resource::encoding::gzip;

fn sample() -> VectorTile {
    TileBuilder::new()
        .layer("water")
        .polygon(vec![rect_ring(0, 0, 2048, 4096)])
        .layer("park")
        .extent(512)
        .polygon(vec![
            rect_ring(100, 100, 400, 400),
            rect_ring(200, 200, 300, 300),
        ])
        .build()
}

#[test]
fn decodes_what_the_builder_encodes() {
    let tile = sample();
    let decoded = VectorTile::decode(&tile.encode()).unwrap();
    assert_eq!(decoded, tile);

    let park = decoded.layer("park").unwrap();
    assert_eq!(park.extent, 512);
    assert_eq!(park.features[0].rings.len(), 2);
    assert_eq!(park.features[0].kind, GeomType::Polygon);
    assert!(decoded.layer("roads").is_none());
}

#[test]
fn geometry_uses_mvt_command_encoding() {
    let f = Feature {
        id: None,
        kind: GeomType::Polygon,
        rings: vec![vec![(3, 6), (8, 12), (20, 34)]],
    };
    // Reference polygon from the vector tile format documentation.
    assert_eq!(encode_geometry(&f), vec![9, 6, 12, 18, 10, 12, 24, 44, 15]);
    assert_eq!(decode_geometry(&[9, 6, 12, 18, 10, 12, 24, 44, 15]).unwrap(), f.rings);
}

#[test]
fn gzip_bytes_fail_with_unknown_field_type() {
    let compressed = gzip(&sample().encode());
    let err = VectorTile::decode(&compressed).unwrap_err();
    assert_eq!(err.to_string(), "pbf unknown field type exception");
}

#[test]
fn empty_buffer_is_an_empty_tile() {
    assert_eq!(VectorTile::decode(&[]).unwrap(), VectorTile::default());
}

#[test]
fn truncated_geometry_is_rejected() {
    let err = decode_geometry(&[9, 6]).unwrap_err();
    assert!(matches!(err, TileError::Geometry(_)));
    let err = decode_geometry(&[10, 2, 2]).unwrap_err();
    assert_eq!(err.to_string(), "invalid geometry: LineTo before MoveTo");
}

#[test]
fn unknown_layer_version_is_rejected() {
    let mut layer = crate::tile::pbf::PbfWriter::new();
    layer.varint(15, 9).bytes(1, b"x");
    let mut tile = crate::tile::pbf::PbfWriter::new();
    tile.bytes(3, &layer.finish());
    assert_eq!(
        VectorTile::decode(&tile.finish()).unwrap_err(),
        TileError::Version(9)
    );
}
