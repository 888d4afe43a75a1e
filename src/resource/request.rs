use serde::Serialize;

/// Identity of one `request` call; unique per [`ResourceProvider`](crate::ResourceProvider).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the renderer is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    /// Scene (style) document.
    Style,
    /// TileJSON source description.
    Source,
    /// Vector tile payload.
    Tile,
    /// Raster image (sprites, raster tiles).
    Image,
    /// Glyph ranges.
    Glyphs,
    /// Anything the URL suffix does not identify.
    Unknown,
}

impl ResourceKind {
    /// Infer the kind from the URL path suffix, ignoring query and fragment.
    ///
    /// A `.pbf` file under a `fonts/` or `glyphs/` directory is a glyph range
    /// (`fonts/{fontstack}/{range}.pbf`); any other `.pbf` is a tile.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let mut segments = path.rsplit('/');
        let file = segments.next().unwrap_or(path);
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Self::Unknown;
        };
        match ext.to_ascii_lowercase().as_str() {
            "pbf" if segments.any(|s| s == "fonts" || s == "glyphs") => Self::Glyphs,
            "pbf" | "mvt" => Self::Tile,
            "png" | "jpg" | "jpeg" | "webp" => Self::Image,
            "json" => Self::Style,
            _ => Self::Unknown,
        }
    }
}

/// How the body should look when it reaches the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum EncodingExpectation {
    /// Transfer encodings are removed before delivery.
    #[default]
    Decoded,
    /// The body is delivered exactly as it came off the wire.
    Raw,
}

/// One resource fetch issued by the renderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Request {
    /// Resource locator.
    pub url: String,
    /// Resource kind, inferred from the URL unless overridden.
    pub kind: ResourceKind,
    /// Negotiated by the provider's encoding policy when the request is accepted.
    pub encoding: EncodingExpectation,
}

impl Request {
    /// Create a request whose kind is inferred from `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = ResourceKind::from_url(&url);
        Self {
            url,
            kind,
            encoding: EncodingExpectation::default(),
        }
    }

    /// Create a request with an explicit kind.
    pub fn with_kind(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
            encoding: EncodingExpectation::default(),
        }
    }
}

/// Transport-level failure delivered inside a [`Response`].
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ResourceError {
    /// DNS, refused connection, IO failure, and similar.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {status}")]
    Status {
        /// Status code.
        status: u16,
    },

    /// The request was abandoned after waiting too long.
    #[error("request timed out")]
    Timeout,

    /// The body claimed a transfer encoding that could not be removed.
    #[error("content decoding failed: {0}")]
    ContentEncoding(String),
}

/// Terminal outcome of a [`Request`]: exactly one of data or error.
#[derive(Clone, Debug)]
pub struct Response {
    /// The request this answers.
    pub request: Request,
    /// Body bytes or the transport failure.
    pub body: Result<Vec<u8>, ResourceError>,
    /// `Content-Encoding` reported by the transport, if any.
    pub content_encoding: Option<String>,
}

impl Response {
    /// Body bytes when the transfer succeeded.
    pub fn data(&self) -> Option<&[u8]> {
        self.body.as_deref().ok()
    }

    /// Transport failure when the transfer failed.
    pub fn error(&self) -> Option<&ResourceError> {
        self.body.as_ref().err()
    }

    /// Consume the response, yielding the body or the transport failure.
    pub fn into_result(self) -> Result<Vec<u8>, ResourceError> {
        self.body
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/request.rs"]
mod tests;
