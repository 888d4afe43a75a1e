use crate::resource::request::ResourceError;

/// Convenience result type used across tilecheck.
pub type TilecheckResult<T> = Result<T, TilecheckError>;

/// Top-level error taxonomy used by the pipeline, comparator, and harness APIs.
///
/// Decode problems inside tiles never show up here: they are reported through the
/// [`DiagnosticChannel`](crate::DiagnosticChannel) and rendering continues.
#[derive(thiserror::Error, Debug)]
pub enum TilecheckError {
    /// Invalid user-provided data or an operation called in the wrong state.
    #[error("validation error: {0}")]
    Validation(String),

    /// A required resource (scene document, TileJSON) could not be fetched.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Fatal failure while producing or encoding a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Failure while driving the image comparison tool.
    #[error("comparison error: {0}")]
    Comparison(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TilecheckError {
    /// Build a [`TilecheckError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TilecheckError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`TilecheckError::Comparison`] value.
    pub fn comparison(msg: impl Into<String>) -> Self {
        Self::Comparison(msg.into())
    }

    /// Build a [`TilecheckError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
