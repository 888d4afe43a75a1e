//! Golden-image scenarios: render, persist, compare, and assert diagnostics.
//!
//! A [`VerificationHarness`](runner::VerificationHarness) runs each
//! [`Scenario`](scenario::Scenario) with its own diagnostic channel and provider, so nothing one
//! render emits can be attributed to another.

/// Harness settings and environment overrides.
pub mod config;
/// Built-in fixture set served at `http://localhost:2900`.
pub mod fixtures;
/// Scenario execution and reports.
pub mod runner;
/// Scenario definitions and diagnostic expectations.
pub mod scenario;
