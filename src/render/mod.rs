//! Frames, rasterization, and the scene render pipeline.

/// Frame buffer and PNG encoding.
pub mod frame;
/// Scene loading, resource fetching, and compositing.
pub mod pipeline;
/// Even-odd polygon scan conversion.
pub mod raster;
