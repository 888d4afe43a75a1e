use super::*;
use crate::resource::encoding::gzip;

fn get(url: &str) -> TransportRequest {
    TransportRequest {
        url: url.to_owned(),
        headers: vec![("Accept-Encoding".to_owned(), "gzip".to_owned())],
    }
}

#[test]
fn header_lookup_is_case_insensitive() {
    let req = get("a");
    assert_eq!(req.header("accept-encoding"), Some("gzip"));
    assert_eq!(req.header("range"), None);
}

#[tokio::test]
async fn static_transport_serves_entries_and_counts_hits() {
    let mut t = StaticTransport::new();
    t.insert("a.json", b"{}".to_vec())
        .insert_gzip("b.pbf", gzip(b"tile"))
        .insert_failure("c.pbf", ResourceError::Connection("refused".into()), None);

    let a = t.fetch(get("a.json")).await.unwrap();
    assert_eq!(a.status, 200);
    assert_eq!(a.body, b"{}");
    assert!(a.content_encoding.is_none());

    let b = t.fetch(get("b.pbf")).await.unwrap();
    assert_eq!(b.content_encoding.as_deref(), Some("gzip"));

    let c = t.fetch(get("c.pbf")).await.unwrap_err();
    assert_eq!(c, ResourceError::Connection("refused".into()));

    let missing = t.fetch(get("nope.pbf")).await.unwrap();
    assert_eq!(missing.status, 404);
    assert!(!missing.is_success());

    t.fetch(get("a.json")).await.unwrap();
    assert_eq!(t.hits("a.json"), 2);
    assert_eq!(t.hits("never"), 0);
}

#[tokio::test]
async fn dir_transport_maps_urls_under_root() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("tiles")).unwrap();
    std::fs::write(dir.path().join("style.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("tiles/0-0-0.pbf"), gzip(b"tile")).unwrap();

    let t = DirTransport::new(dir.path());

    let style = t.fetch(get("style.json")).await.unwrap();
    assert_eq!(style.status, 200);
    assert!(style.content_encoding.is_none());

    let tile = t
        .fetch(get("http://localhost:2900/tiles/0-0-0.pbf?fresh=1"))
        .await
        .unwrap();
    assert_eq!(tile.status, 200);
    assert_eq!(tile.content_encoding.as_deref(), Some("gzip"));

    let missing = t.fetch(get("/tiles/9-9-9.pbf")).await.unwrap();
    assert_eq!(missing.status, 404);

    let escape = t.fetch(get("../etc/passwd")).await.unwrap();
    assert_eq!(escape.status, 403);
}
