use super::*;
use serde_json::json;

#[test]
fn parses_hex_forms() {
    let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 1.0));

    let c: Color = serde_json::from_value(json!("#0f0")).unwrap();
    assert_eq!(c, Color::rgba(0.0, 1.0, 0.0, 1.0));

    let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
    assert!((c.b - 1.0).abs() < 1e-9);
    assert!((c.a - (128.0 / 255.0)).abs() < 1e-9);
}

#[test]
fn parses_functional_forms() {
    let c = Color::parse("rgba(255, 0, 0, 0.5)").unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 0.5));

    let c = Color::parse("rgb(100%, 50%, 0%)").unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.5, 0.0, 1.0));

    let c = Color::parse("hsl(0, 100%, 50%)").unwrap();
    assert!((c.r - 1.0).abs() < 1e-9);
    assert!(c.g.abs() < 1e-9);
    assert!(c.b.abs() < 1e-9);
}

#[test]
fn parses_object_and_array() {
    let c: Color = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 1.0));

    let c: Color = serde_json::from_value(json!([0.25, 0.5, 0.75, 0.9])).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 0.9));

    assert!(serde_json::from_value::<Color>(json!([1.0])).is_err());
}

#[test]
fn rejects_garbage() {
    assert!(Color::parse("#12345").is_err());
    assert!(Color::parse("cornflowerblue").is_err());
    assert!(Color::parse("rgb(1,2)").is_err());
}

#[test]
fn premultiplied_quantization() {
    let c = Color::rgba(1.0, 0.5, 0.0, 0.5).to_rgba8_premul();
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
    assert_eq!(Color::transparent().to_rgba8_premul().a, 0);
}
