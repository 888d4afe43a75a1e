use super::*;
use crate::compare::metric::{ToolVerdict, interpret_tool_output};

fn save(dir: &Path, name: &str, w: u32, h: u32, px: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    let data: Vec<u8> = (0..w * h).flat_map(|_| px).collect();
    image::save_buffer_with_format(
        &path,
        &data,
        w,
        h,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .unwrap();
    path
}

#[tokio::test]
async fn identical_images_report_zero() {
    let dir = tempfile::tempdir().unwrap();
    let a = save(dir.path(), "a.png", 4, 4, [10, 20, 30, 255]);
    let diff = dir.path().join("out/diff.png");
    let out = BuiltinMae.run(&a, &a, &diff).await.unwrap();
    assert_eq!(out.exit_code, Some(0));
    assert_eq!(out.stderr, "0 (0)");
    assert_eq!(interpret_tool_output(&out), ToolVerdict::Metric(0.0));
    assert!(diff.exists());
}

#[tokio::test]
async fn different_images_report_normalized_mae() {
    let dir = tempfile::tempdir().unwrap();
    let a = save(dir.path(), "a.png", 2, 2, [0, 0, 0, 255]);
    let b = save(dir.path(), "b.png", 2, 2, [255, 0, 0, 255]);
    let diff = dir.path().join("diff.png");
    let out = BuiltinMae.run(&a, &b, &diff).await.unwrap();
    assert_eq!(out.exit_code, Some(1));
    // One channel of four differs fully on every pixel.
    assert_eq!(interpret_tool_output(&out), ToolVerdict::Metric(0.25));
    assert!(out.stderr.starts_with("16383.75 (0.25)"));

    let img = image::open(&diff).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, DIFF_HIGHLIGHT);
}

#[tokio::test]
async fn size_mismatch_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    let a = save(dir.path(), "a.png", 2, 2, [0, 0, 0, 255]);
    let b = save(dir.path(), "b.png", 3, 2, [0, 0, 0, 255]);
    let out = BuiltinMae
        .run(&a, &b, &dir.path().join("diff.png"))
        .await
        .unwrap();
    assert_eq!(out.exit_code, Some(2));
    assert!(out.stderr.contains("widths or heights differ"));
}

#[tokio::test]
async fn unreadable_input_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    let a = save(dir.path(), "a.png", 2, 2, [0, 0, 0, 255]);
    let out = BuiltinMae
        .run(&a, &dir.path().join("nope.png"), &dir.path().join("diff.png"))
        .await
        .unwrap();
    assert!(matches!(
        interpret_tool_output(&out),
        ToolVerdict::HardFailure(msg) if msg.contains("unable to open image")
    ));
}

#[tokio::test]
async fn missing_imagemagick_binary_is_a_spawn_error() {
    let tool = ImageMagickCompare::new("/nonexistent/tilecheck-compare");
    assert!(!tool.is_available());
    let err = tool
        .run(Path::new("a"), Path::new("b"), Path::new("c"))
        .await
        .unwrap_err();
    assert!(matches!(err, TilecheckError::Comparison(_)));
}

#[test]
fn tool_kind_parses_from_text() {
    assert_eq!(
        "builtin".parse::<DiffToolKind>().unwrap(),
        DiffToolKind::Builtin
    );
    assert_eq!(
        "ImageMagick".parse::<DiffToolKind>().unwrap(),
        DiffToolKind::ImageMagick
    );
    assert!("gimp".parse::<DiffToolKind>().is_err());
}
