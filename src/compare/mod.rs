//! Candidate-versus-baseline image comparison.
//!
//! The comparison tool is an external collaborator with a small text contract (exit code plus a
//! `<raw> (<normalized>)` line on the error stream). [`tool`] runs it, [`metric`] is the single
//! parser of its report, and [`comparator`] turns both into a [`ComparisonResult`].
//!
//! [`ComparisonResult`]: comparator::ComparisonResult

/// Tolerance-checked comparison with a guaranteed diff artifact.
pub mod comparator;
/// Report grammar of the comparison tool.
pub mod metric;
/// Comparison tool implementations.
pub mod tool;
