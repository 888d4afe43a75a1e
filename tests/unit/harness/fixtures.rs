use super::*;
use crate::resource::encoding::is_gzip;
use crate::resource::transport::{DirTransport, Transport, TransportRequest};
use crate::scene::style::SceneDocument;
use crate::tile::vector::VectorTile;

#[test]
fn fixture_style_parses() {
    let doc = SceneDocument::from_json(&fixture_style()).unwrap();
    assert_eq!(doc.layers.len(), 3);
    assert!(doc.sources.contains_key("fixture"));
}

#[test]
fn fixture_tile_has_both_layers() {
    let tile = VectorTile::decode(&fixture_tile()).unwrap();
    assert!(tile.layer("water").is_some());
    assert_eq!(tile.layer("park").unwrap().features.len(), 2);
    assert!(is_gzip(&fixture_tile_gz()));
}

#[tokio::test]
async fn written_fixture_set_is_served_by_dir_transport() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_set(dir.path()).unwrap();

    let t = DirTransport::new(dir.path());
    let resp = t
        .fetch(TransportRequest {
            url: TILE_URL.to_owned(),
            headers: Vec::new(),
        })
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(resp.body, fixture_tile_gz());

    let style = t
        .fetch(TransportRequest {
            url: STYLE_URL.to_owned(),
            headers: Vec::new(),
        })
        .await
        .unwrap();
    assert_eq!(style.content_encoding, None);
}

#[tokio::test]
async fn fixture_transport_labels_tiles_gzip() {
    let t = fixture_transport();
    let resp = t
        .fetch(TransportRequest {
            url: TILE_URL.to_owned(),
            headers: Vec::new(),
        })
        .await
        .unwrap();
    assert_eq!(resp.content_encoding.as_deref(), Some("gzip"));
}
