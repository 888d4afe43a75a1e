use std::sync::Arc;

use super::*;
use crate::diagnostics::Severity;
use crate::render::frame::encode_png;
use crate::resource::encoding::{EncodingPolicy, gzip};
use crate::resource::transport::StaticTransport;
use crate::tile::vector::{TileBuilder, rect_ring};

const TILE_URL: &str = "http://tiles.test/0/0/0.pbf";

fn scene(sources: &str) -> String {
    format!(
        r##"{{
          "version": 8,
          "center": [0, 0],
          "zoom": 0,
          "sources": {sources},
          "layers": [
            {{ "id": "bg", "type": "background", "paint": {{ "background-color": "#ffffff" }} }},
            {{ "id": "water", "type": "fill", "source": "base", "source-layer": "water",
               "paint": {{ "fill-color": "#0000ff" }} }}
          ]
        }}"##
    )
}

fn inline_scene() -> String {
    scene(r#"{"base": {"type": "vector", "tiles": ["http://tiles.test/{z}/{x}/{y}.pbf"]}}"#)
}

fn water_tile() -> Vec<u8> {
    TileBuilder::new()
        .layer("water")
        .polygon(vec![rect_ring(0, 0, 2048, 4096)])
        .encode()
}

fn pipeline(transport: StaticTransport, policy: EncodingPolicy) -> RenderPipeline {
    RenderPipeline::new(ResourceProvider::new(Arc::new(transport), policy))
}

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[tokio::test]
async fn render_requires_a_scene() {
    let mut p = pipeline(StaticTransport::new(), EncodingPolicy::default());
    let channel = DiagnosticChannel::new();
    let err = p
        .render(&RenderOptions::default(), &channel)
        .await
        .unwrap_err();
    assert!(matches!(err, TilecheckError::Validation(_)));
    assert_eq!(p.state(), PipelineState::Idle);
}

#[tokio::test]
async fn oversized_render_is_rejected_without_allocating() {
    let mut p = pipeline(StaticTransport::new(), EncodingPolicy::default());
    p.load_scene(r#"{"version": 8, "sources": {}, "layers": []}"#)
        .unwrap();
    let channel = DiagnosticChannel::new();
    for (width, height) in [
        (u32::MAX, u32::MAX),
        (MAX_FRAME_DIMENSION + 1, 1),
        (1, MAX_FRAME_DIMENSION + 1),
    ] {
        let opts = RenderOptions {
            width,
            height,
            ..RenderOptions::default()
        };
        let err = p.render(&opts, &channel).await.unwrap_err();
        assert!(matches!(err, TilecheckError::Validation(_)), "{err}");
    }
    assert_eq!(p.state(), PipelineState::SceneLoaded);

    let opts = RenderOptions {
        width: MAX_FRAME_DIMENSION,
        height: 1,
        ..RenderOptions::default()
    };
    let frame = p.render(&opts, &channel).await.unwrap();
    assert_eq!(frame.width, MAX_FRAME_DIMENSION);
}

#[tokio::test]
async fn decompressed_tile_is_drawn_without_diagnostics() {
    let mut t = StaticTransport::new();
    t.insert_gzip(TILE_URL, gzip(&water_tile()));
    let mut p = pipeline(t, EncodingPolicy::decompress_all());
    p.load_scene(&inline_scene()).unwrap();
    assert_eq!(p.state(), PipelineState::SceneLoaded);

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let frame = p.render(&RenderOptions::default(), &channel).await.unwrap();

    assert_eq!(p.state(), PipelineState::FrameReady);
    assert!(log.is_empty(), "unexpected diagnostics: {:?}", log.snapshot());
    assert_eq!(frame.pixel(10, 10), Some(BLUE));
    assert_eq!(frame.pixel(400, 10), Some(WHITE));
}

#[tokio::test]
async fn compressed_tile_reports_one_parse_error_and_renders_blank() {
    let mut t = StaticTransport::new();
    t.insert_gzip(TILE_URL, gzip(&water_tile()));
    let mut p = pipeline(t, EncodingPolicy::raw_tiles());
    p.load_scene(&inline_scene()).unwrap();

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let frame = p.render(&RenderOptions::default(), &channel).await.unwrap();

    let events = log.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].class, EventClass::ParseTile);
    assert_eq!(events[0].severity, Severity::Error);
    assert_eq!(
        events[0].text,
        "Parsing [0/0/0] failed: pbf unknown field type exception"
    );
    assert_eq!(frame.pixel(10, 10), Some(WHITE));
    assert_eq!(p.state(), PipelineState::FrameReady);
}

#[tokio::test]
async fn missing_tile_degrades_with_http_error() {
    let mut p = pipeline(StaticTransport::new(), EncodingPolicy::default());
    p.load_scene(&inline_scene()).unwrap();

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let frame = p.render(&RenderOptions::default(), &channel).await.unwrap();

    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].class, EventClass::HttpRequest);
    assert!(errors[0].text.contains("HTTP status 404"));
    assert_eq!(frame.pixel(10, 10), Some(WHITE));
}

#[tokio::test]
async fn hung_tile_times_out_with_a_warning() {
    let mut t = StaticTransport::new();
    t.insert_hang(TILE_URL);
    let mut p = pipeline(t, EncodingPolicy::default());
    p.load_scene(&inline_scene()).unwrap();

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let opts = RenderOptions {
        tile_timeout: Duration::from_millis(20),
        ..RenderOptions::default()
    };
    let frame = p.render(&opts, &channel).await.unwrap();

    let events = log.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Warning);
    assert_eq!(events[0].class, EventClass::HttpRequest);
    assert_eq!(frame.pixel(10, 10), Some(WHITE));
    assert_eq!(p.provider().in_flight(), 0);
}

#[tokio::test]
async fn unreachable_tilejson_is_fatal() {
    let mut p = pipeline(StaticTransport::new(), EncodingPolicy::default());
    p.load_scene(&scene(
        r#"{"base": {"type": "vector", "url": "http://tiles.test/base.json"}}"#,
    ))
    .unwrap();

    let channel = DiagnosticChannel::new();
    let err = p
        .render(&RenderOptions::default(), &channel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TilecheckError::Resource(ResourceError::Status { status: 404 })
    ));
    assert_eq!(p.state(), PipelineState::Failed);
}

#[tokio::test]
async fn tilejson_source_is_resolved() {
    let mut t = StaticTransport::new();
    t.insert(
        "http://tiles.test/base.json",
        br#"{"tiles": ["http://tiles.test/{z}/{x}/{y}.pbf"], "maxzoom": 0}"#.to_vec(),
    );
    t.insert(TILE_URL, water_tile());
    let mut p = pipeline(t, EncodingPolicy::default());
    p.load_scene(&scene(
        r#"{"base": {"type": "vector", "url": "http://tiles.test/base.json"}}"#,
    ))
    .unwrap();

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let frame = p.render(&RenderOptions::default(), &channel).await.unwrap();
    assert!(log.is_empty());
    assert_eq!(frame.pixel(10, 10), Some(BLUE));
}

#[tokio::test]
async fn malformed_tilejson_skips_the_source() {
    let mut t = StaticTransport::new();
    t.insert("http://tiles.test/base.json", b"{\"tiles\": 5}".to_vec());
    let mut p = pipeline(t, EncodingPolicy::default());
    p.load_scene(&scene(
        r#"{"base": {"type": "vector", "url": "http://tiles.test/base.json"}}"#,
    ))
    .unwrap();

    let channel = DiagnosticChannel::new();
    let (_sub, log) = channel.collect();
    let frame = p.render(&RenderOptions::default(), &channel).await.unwrap();
    let events = log.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].class, EventClass::ParseStyle);
    assert_eq!(frame.pixel(10, 10), Some(WHITE));
}

#[tokio::test]
async fn scene_can_be_loaded_by_url() {
    let mut t = StaticTransport::new();
    t.insert("http://tiles.test/style.json", inline_scene().into_bytes());
    let mut p = pipeline(t, EncodingPolicy::default());
    p.load_scene_url("http://tiles.test/style.json")
        .await
        .unwrap();
    assert_eq!(p.state(), PipelineState::SceneLoaded);
    assert_eq!(p.scene().map(|s| s.layers.len()), Some(2));

    let err = p
        .load_scene_url("http://tiles.test/missing.json")
        .await
        .unwrap_err();
    assert!(matches!(err, TilecheckError::Resource(_)));
    assert_eq!(p.state(), PipelineState::Failed);
}

#[tokio::test]
async fn bad_scene_json_fails_the_pipeline() {
    let mut p = pipeline(StaticTransport::new(), EncodingPolicy::default());
    let err = p.load_scene("{").unwrap_err();
    assert!(matches!(err, TilecheckError::Serde(_)), "{err}");
    assert_eq!(p.state(), PipelineState::Failed);
}

#[tokio::test]
async fn repeated_renders_encode_identically() {
    let mut t = StaticTransport::new();
    t.insert_gzip(TILE_URL, gzip(&water_tile()));
    let mut p = pipeline(t, EncodingPolicy::decompress_all());
    p.load_scene(&inline_scene()).unwrap();

    let channel = DiagnosticChannel::new();
    let a = p.render(&RenderOptions::default(), &channel).await.unwrap();
    let b = p.render(&RenderOptions::default(), &channel).await.unwrap();
    assert_eq!(encode_png(&a).unwrap(), encode_png(&b).unwrap());
}
