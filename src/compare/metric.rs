use std::sync::OnceLock;

use regex::Regex;

use crate::compare::tool::ToolOutput;

/// Exit code the comparison tool uses for "metric unusable".
pub const HARD_FAILURE_EXIT: i32 = 2;

/// What one comparison tool run means.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolVerdict {
    /// The tool reported a normalized difference.
    Metric(f64),
    /// The tool failed outright; carries its error text.
    HardFailure(String),
    /// The tool exited normally but its report did not match `<number> (<number>)`.
    Unparseable(String),
}

impl ToolVerdict {
    /// Difference score: the metric, or `+∞` for every failure.
    pub fn difference(&self) -> f64 {
        match self {
            Self::Metric(v) => *v,
            Self::HardFailure(_) | Self::Unparseable(_) => f64::INFINITY,
        }
    }
}

fn metric_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+(?:\.\d+)?\s+\(([^)]+)\)\s*$").expect("metric pattern is valid")
    })
}

/// Interpret the exit code and error stream of a `compare -metric MAE` style run.
///
/// This is the only place the tool's report grammar is parsed.
pub fn interpret_tool_output(output: &ToolOutput) -> ToolVerdict {
    match output.exit_code {
        None | Some(HARD_FAILURE_EXIT) => {
            return ToolVerdict::HardFailure(output.stderr.trim().to_owned());
        }
        Some(_) => {}
    }
    let text = output.stderr.trim();
    let Some(caps) = metric_line().captures(text) else {
        return ToolVerdict::Unparseable(output.stderr.clone());
    };
    match caps[1].trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => ToolVerdict::Metric(v),
        _ => ToolVerdict::Unparseable(output.stderr.clone()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compare/metric.rs"]
mod tests;
