//! Resource requests, transports, and the provider that mediates between them.

/// Content-encoding negotiation and gzip helpers.
pub mod encoding;
/// Request lifecycle, cancellation, and delivery.
pub mod provider;
/// Request/response value types.
pub mod request;
/// Transport trait and built-in transports.
pub mod transport;
