use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn defaults_match_the_documented_values() {
    let cfg = HarnessConfig::default();
    assert_eq!(cfg.results_dir, PathBuf::from("test/results"));
    assert_eq!(cfg.mode, HarnessMode::Verify);
    assert_eq!(cfg.tolerance, 0.001);
    assert_eq!(cfg.diff_tool, DiffToolKind::Builtin);
    assert_eq!(cfg.tile_timeout(), Duration::from_secs(10));
}

#[test]
fn update_flag_selects_record_mode() {
    let cfg = HarnessConfig::default()
        .with_env(env(&[("UPDATE", "1")]))
        .unwrap();
    assert_eq!(cfg.mode, HarnessMode::RecordBaseline);

    for off in ["", "0", "false", "FALSE"] {
        let cfg = HarnessConfig::default()
            .with_env(env(&[("UPDATE", off)]))
            .unwrap();
        assert_eq!(cfg.mode, HarnessMode::Verify, "UPDATE={off:?}");
    }
}

#[test]
fn env_overrides_apply() {
    let cfg = HarnessConfig::default()
        .with_env(env(&[
            ("TILECHECK_RESULTS_DIR", "/tmp/out"),
            ("TILECHECK_DIFF_TOOL", "imagemagick"),
            ("TILECHECK_TOLERANCE", "0.05"),
        ]))
        .unwrap();
    assert_eq!(cfg.results_dir, PathBuf::from("/tmp/out"));
    assert_eq!(cfg.diff_tool, DiffToolKind::ImageMagick);
    assert_eq!(cfg.tolerance, 0.05);
}

#[test]
fn bad_env_values_are_rejected() {
    assert!(
        HarnessConfig::default()
            .with_env(env(&[("TILECHECK_TOLERANCE", "lots")]))
            .is_err()
    );
    assert!(
        HarnessConfig::default()
            .with_env(env(&[("TILECHECK_TOLERANCE", "-1")]))
            .is_err()
    );
    assert!(
        HarnessConfig::default()
            .with_env(env(&[("TILECHECK_DIFF_TOOL", "gimp")]))
            .is_err()
    );
}

#[test]
fn json_config_fills_defaults() {
    let cfg = HarnessConfig::from_reader(
        br#"{"mode": "record_baseline", "tolerance": 0.01}"#.as_slice(),
    )
    .unwrap();
    assert_eq!(cfg.mode, HarnessMode::RecordBaseline);
    assert_eq!(cfg.tolerance, 0.01);
    assert_eq!(cfg.results_dir, PathBuf::from("test/results"));

    let err = HarnessConfig::from_reader(br#"{"tolerence": 1}"#.as_slice()).unwrap_err();
    assert!(matches!(err, TilecheckError::Serde(_)), "{err}");
    let err = HarnessConfig::from_reader(b"not json".as_slice()).unwrap_err();
    assert!(matches!(err, TilecheckError::Serde(_)), "{err}");
    let err = HarnessConfig::from_reader(br#"{"tile_timeout_ms": 0}"#.as_slice()).unwrap_err();
    assert!(matches!(err, TilecheckError::Validation(_)), "{err}");
}

#[test]
fn from_path_reads_files() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("harness.json");
    std::fs::write(&p, r#"{"diff_tool": "imagemagick"}"#).unwrap();
    let cfg = HarnessConfig::from_path(&p).unwrap();
    assert_eq!(cfg.diff_tool, DiffToolKind::ImageMagick);
    assert!(HarnessConfig::from_path(dir.path().join("missing.json")).is_err());
}
