use super::*;

fn parse_tile_error() -> Diagnostic {
    Diagnostic::error(
        EventClass::ParseTile,
        "Parsing [0/0/0] failed: pbf unknown field type exception",
    )
}

#[test]
fn gzip_scenarios_are_named_for_their_artifacts() {
    let s = gzip_scenarios();
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].name, "gz-success");
    assert_eq!(s[0].tile_encoding, TileEncoding::Decompress);
    assert_eq!(s[0].expect, DiagnosticExpectation::NoErrors);
    assert_eq!(s[1].name, "gz-fail");
    assert_eq!(s[1].tile_encoding, TileEncoding::Passthrough);
}

#[test]
fn no_errors_ignores_warnings() {
    let observed = vec![Diagnostic::warning(EventClass::HttpRequest, "slow")];
    assert!(DiagnosticExpectation::NoErrors.check(&observed).is_empty());
    let observed = vec![parse_tile_error()];
    assert_eq!(DiagnosticExpectation::NoErrors.check(&observed).len(), 1);
}

#[test]
fn exactly_requires_the_count() {
    let expect = gzip_scenarios().remove(1).expect;
    assert!(expect.check(&[parse_tile_error()]).is_empty());
    assert_eq!(expect.check(&[]).len(), 1);
    assert_eq!(
        expect.check(&[parse_tile_error(), parse_tile_error()]).len(),
        1
    );
}

#[test]
fn exactly_rejects_unrelated_errors() {
    let expect = gzip_scenarios().remove(1).expect;
    let failures = expect.check(&[
        parse_tile_error(),
        Diagnostic::error(EventClass::HttpRequest, "HTTP status 404"),
    ]);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("HttpRequest"));
}
