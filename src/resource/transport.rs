//! Outbound fetch implementations.
//!
//! A [`Transport`] knows nothing about maps: it moves bytes for a URL and reports what the wire
//! said. Encoding policy and request lifecycle live in [`ResourceProvider`](crate::ResourceProvider).

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::resource::encoding::is_gzip;
use crate::resource::request::ResourceError;

/// Request as seen by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportRequest {
    /// Resource locator.
    pub url: String,
    /// Extra request headers, e.g. `Accept-Encoding`.
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back over the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-like status code.
    pub status: u16,
    /// `Content-Encoding` header, if any.
    pub content_encoding: Option<String>,
    /// Body exactly as received.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// A `200` response with no content encoding.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_encoding: None,
            body,
        }
    }

    /// Return `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Pluggable outbound fetch supplied by the embedder.
///
/// Implementations must be cancel-safe: the provider drops the returned future when a request is
/// cancelled.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetch `req.url`. Non-2xx answers are returned as responses, not errors.
    async fn fetch(&self, req: TransportRequest) -> Result<TransportResponse, ResourceError>;
}

#[derive(Clone, Debug)]
enum StaticEntry {
    Respond {
        response: TransportResponse,
        delay: Option<Duration>,
    },
    Fail {
        error: ResourceError,
        delay: Option<Duration>,
    },
    Hang,
}

/// In-memory transport keyed by exact URL; unknown URLs answer `404`.
#[derive(Debug, Default)]
pub struct StaticTransport {
    entries: HashMap<String, StaticEntry>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StaticTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status `200` for `url`.
    pub fn insert(&mut self, url: impl Into<String>, body: Vec<u8>) -> &mut Self {
        self.insert_response(url, TransportResponse::ok(body), None)
    }

    /// Serve a gzip body labelled `Content-Encoding: gzip`.
    pub fn insert_gzip(&mut self, url: impl Into<String>, gz_body: Vec<u8>) -> &mut Self {
        let response = TransportResponse {
            status: 200,
            content_encoding: Some("gzip".to_owned()),
            body: gz_body,
        };
        self.insert_response(url, response, None)
    }

    /// Serve an arbitrary response, optionally after `delay`.
    pub fn insert_response(
        &mut self,
        url: impl Into<String>,
        response: TransportResponse,
        delay: Option<Duration>,
    ) -> &mut Self {
        self.entries
            .insert(url.into(), StaticEntry::Respond { response, delay });
        self
    }

    /// Fail requests for `url` with `error`, optionally after `delay`.
    pub fn insert_failure(
        &mut self,
        url: impl Into<String>,
        error: ResourceError,
        delay: Option<Duration>,
    ) -> &mut Self {
        self.entries
            .insert(url.into(), StaticEntry::Fail { error, delay });
        self
    }

    /// Never answer requests for `url`.
    pub fn insert_hang(&mut self, url: impl Into<String>) -> &mut Self {
        self.entries.insert(url.into(), StaticEntry::Hang);
        self
    }

    /// How many times `url` has been fetched.
    pub fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .map(|h| h.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn fetch(&self, req: TransportRequest) -> Result<TransportResponse, ResourceError> {
        if let Ok(mut hits) = self.hits.lock() {
            *hits.entry(req.url.clone()).or_default() += 1;
        }
        let entry = self.entries.get(&req.url).cloned();
        match entry {
            None => Ok(TransportResponse {
                status: 404,
                content_encoding: None,
                body: Vec::new(),
            }),
            Some(StaticEntry::Respond { response, delay }) => {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                Ok(response)
            }
            Some(StaticEntry::Fail { error, delay }) => {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                Err(error)
            }
            Some(StaticEntry::Hang) => std::future::pending().await,
        }
    }
}

/// Serves files below a root directory, the way a static file server would.
///
/// Any `scheme://host` prefix is stripped and the remaining path is resolved under `root`.
/// Files that start with the gzip magic are labelled `Content-Encoding: gzip`.
#[derive(Clone, Debug)]
pub struct DirTransport {
    root: PathBuf,
}

impl DirTransport {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory being served.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let without_scheme = match url.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => url,
        };
        let path = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme)
            .trim_start_matches('/');
        let rel = Path::new(path);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[async_trait]
impl Transport for DirTransport {
    async fn fetch(&self, req: TransportRequest) -> Result<TransportResponse, ResourceError> {
        let Some(path) = self.resolve(&req.url) else {
            return Ok(TransportResponse {
                status: 403,
                content_encoding: None,
                body: Vec::new(),
            });
        };
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(TransportResponse {
                status: 200,
                content_encoding: is_gzip(&body).then(|| "gzip".to_owned()),
                body,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TransportResponse {
                status: 404,
                content_encoding: None,
                body: Vec::new(),
            }),
            Err(e) => Err(ResourceError::Connection(format!(
                "read '{}': {e}",
                path.display()
            ))),
        }
    }
}

/// HTTP transport backed by `reqwest`; bodies are never decompressed here.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, ResourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::Connection(format!("build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, req: TransportRequest) -> Result<TransportResponse, ResourceError> {
        let mut builder = self.client.get(&req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ResourceError::Timeout
            } else {
                ResourceError::Connection(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| ResourceError::Connection(format!("read body: {e}")))?;
        Ok(TransportResponse {
            status,
            content_encoding,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/transport.rs"]
mod tests;
