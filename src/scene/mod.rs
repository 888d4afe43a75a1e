//! Scene documents: the style-like JSON that tells the renderer what to draw.

/// Color parsing and quantization.
pub mod color;
/// Document model and TileJSON.
pub mod style;
