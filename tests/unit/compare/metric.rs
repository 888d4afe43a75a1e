use super::*;

fn out(code: Option<i32>, stderr: &str) -> ToolOutput {
    ToolOutput {
        exit_code: code,
        stderr: stderr.to_owned(),
    }
}

#[test]
fn similar_and_dissimilar_both_parse_the_metric() {
    assert_eq!(
        interpret_tool_output(&out(Some(0), "0 (0)\n")),
        ToolVerdict::Metric(0.0)
    );
    assert_eq!(
        interpret_tool_output(&out(Some(1), "1234.5 (0.0188373)")),
        ToolVerdict::Metric(0.0188373)
    );
}

#[test]
fn exit_two_is_a_hard_failure() {
    let v = interpret_tool_output(&out(Some(2), "  compare: unable to open image  \n"));
    assert_eq!(
        v,
        ToolVerdict::HardFailure("compare: unable to open image".to_owned())
    );
    assert!(v.difference().is_infinite());
}

#[test]
fn killed_process_is_a_hard_failure() {
    assert!(matches!(
        interpret_tool_output(&out(None, "")),
        ToolVerdict::HardFailure(_)
    ));
}

#[test]
fn unexpected_text_keeps_raw_output() {
    let raw = "compare: image widths or heights differ\n";
    assert_eq!(
        interpret_tool_output(&out(Some(1), raw)),
        ToolVerdict::Unparseable(raw.to_owned())
    );
    assert!(matches!(
        interpret_tool_output(&out(Some(0), "12 (abc)")),
        ToolVerdict::Unparseable(_)
    ));
    assert!(matches!(
        interpret_tool_output(&out(Some(0), "12 (0.1) trailing")),
        ToolVerdict::Unparseable(_)
    ));
}
