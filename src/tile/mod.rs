//! Vector tile decoding and viewport tile math.

/// Viewport to tile-grid mapping.
pub mod coverage;
/// Protobuf wire primitives.
pub mod pbf;
/// Mapbox Vector Tile model, decoder, and encoder.
pub mod vector;
