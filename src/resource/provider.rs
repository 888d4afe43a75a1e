//! Request lifecycle between the renderer and a [`Transport`].
//!
//! Every accepted request owns one slot in the in-flight table: a oneshot sender plus a
//! cancellation token. Delivery and cancellation both begin by removing that slot under the table
//! lock, so whichever runs first wins and the other becomes a no-op. That single removal is what
//! makes delivery at-most-once no matter how the two race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::resource::encoding::{EncodingPolicy, apply_expectation};
use crate::resource::request::{Request, RequestId, ResourceError, Response};
use crate::resource::transport::{Transport, TransportRequest};

struct InFlight {
    tx: oneshot::Sender<Response>,
    cancel: CancellationToken,
}

struct ProviderInner {
    transport: Arc<dyn Transport>,
    policy: EncodingPolicy,
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<RequestId, InFlight>>,
}

impl ProviderInner {
    fn take_slot(&self, id: RequestId) -> Option<InFlight> {
        match self.in_flight.lock() {
            Ok(mut map) => map.remove(&id),
            Err(poisoned) => poisoned.into_inner().remove(&id),
        }
    }

    fn deliver(&self, id: RequestId, response: Response) -> bool {
        match self.take_slot(id) {
            Some(slot) => {
                let delivered = slot.tx.send(response).is_ok();
                trace!(%id, delivered, "response delivered");
                delivered
            }
            None => {
                trace!(%id, "response discarded after cancellation");
                false
            }
        }
    }
}

/// Mediates renderer resource requests: request identity, in-flight tracking, cancellation, and
/// content-encoding policy.
///
/// Cloning is cheap and clones share the in-flight table.
#[derive(Clone)]
pub struct ResourceProvider {
    inner: Arc<ProviderInner>,
}

impl std::fmt::Debug for ResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceProvider")
            .field("policy", &self.inner.policy)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl ResourceProvider {
    /// Create a provider over `transport` with the given encoding policy.
    pub fn new(transport: Arc<dyn Transport>, policy: EncodingPolicy) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                transport,
                policy,
                next_id: AtomicU64::new(1),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Encoding policy applied to every request.
    pub fn policy(&self) -> EncodingPolicy {
        self.inner.policy
    }

    /// Begin fetching `req` and return the handle its single response arrives on.
    ///
    /// The fetch runs as a Tokio task, so this must be called from within a Tokio runtime. The
    /// response is never produced on the caller's stack: it is only observable by awaiting the
    /// returned handle.
    pub fn request(&self, mut req: Request) -> ResponseHandle {
        let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        req.encoding = self.inner.policy.expectation_for(req.kind);

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        {
            let slot = InFlight {
                tx,
                cancel: cancel.clone(),
            };
            match self.inner.in_flight.lock() {
                Ok(mut map) => map.insert(id, slot),
                Err(poisoned) => poisoned.into_inner().insert(id, slot),
            };
        }
        debug!(%id, url = %req.url, kind = ?req.kind, encoding = ?req.encoding, "request");

        let inner = Arc::clone(&self.inner);
        let request = req.clone();
        tokio::spawn(async move {
            let wire = TransportRequest {
                url: request.url.clone(),
                headers: vec![("Accept-Encoding".to_owned(), "gzip".to_owned())],
            };
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(%id, "fetch abandoned");
                    return;
                }
                r = inner.transport.fetch(wire) => r,
            };
            let response = into_response(request, fetched);
            inner.deliver(id, response);
        });

        ResponseHandle {
            id,
            request: req,
            rx: Some(rx),
            provider: self.clone(),
        }
    }

    /// Cancel request `id`.
    ///
    /// Returns `true` when a pending response was suppressed; `false` when the request already
    /// completed, was already cancelled, or never existed. Never panics.
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.inner.take_slot(id) {
            Some(slot) => {
                slot.cancel.cancel();
                debug!(%id, "request cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of requests that have neither delivered nor been cancelled.
    pub fn in_flight(&self) -> usize {
        match self.inner.in_flight.lock() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

fn into_response(
    request: Request,
    fetched: Result<crate::resource::transport::TransportResponse, ResourceError>,
) -> Response {
    let (body, content_encoding) = match fetched {
        Err(e) => (Err(e), None),
        Ok(wire) if !wire.is_success() => (
            Err(ResourceError::Status {
                status: wire.status,
            }),
            wire.content_encoding,
        ),
        Ok(wire) => {
            let body =
                apply_expectation(request.encoding, wire.content_encoding.as_deref(), wire.body);
            (body, wire.content_encoding)
        }
    };
    Response {
        request,
        body,
        content_encoding,
    }
}

/// Terminal outcome observed through a [`ResponseHandle`].
#[derive(Debug)]
pub enum Delivery {
    /// The single response for the request.
    Response(Response),
    /// The request was cancelled before a response was delivered.
    Cancelled,
    /// The wait expired; the request was cancelled through the provider.
    TimedOut,
}

impl Delivery {
    /// The response, if one was delivered.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(r) => Some(r),
            Self::Cancelled | Self::TimedOut => None,
        }
    }
}

/// Completion handle for one request.
///
/// Dropping a handle whose response has not been taken cancels the request.
#[derive(Debug)]
pub struct ResponseHandle {
    id: RequestId,
    request: Request,
    rx: Option<oneshot::Receiver<Response>>,
    provider: ResourceProvider,
}

impl ResponseHandle {
    /// Identity of the request.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The request as negotiated by the provider.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Cancel the request; see [`ResourceProvider::cancel`].
    pub fn cancel(&self) -> bool {
        self.provider.cancel(self.id)
    }

    /// Wait for the terminal outcome.
    pub async fn response(mut self) -> Delivery {
        let Some(rx) = self.rx.take() else {
            return Delivery::Cancelled;
        };
        match rx.await {
            Ok(r) => Delivery::Response(r),
            Err(_) => Delivery::Cancelled,
        }
    }

    /// Wait at most `timeout` for the terminal outcome.
    ///
    /// On expiry the request is cancelled through the provider. A response that won the race
    /// against that cancellation is still returned.
    pub async fn response_within(mut self, timeout: Duration) -> Delivery {
        let Some(mut rx) = self.rx.take() else {
            return Delivery::Cancelled;
        };
        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(r)) => Delivery::Response(r),
            Ok(Err(_)) => Delivery::Cancelled,
            Err(_) => {
                if self.provider.cancel(self.id) {
                    debug!(id = %self.id, url = %self.request.url, "request timed out");
                    return Delivery::TimedOut;
                }
                // The slot is already gone, so the sender resolves promptly either way.
                match rx.await {
                    Ok(r) => Delivery::Response(r),
                    Err(_) => Delivery::Cancelled,
                }
            }
        }
    }
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        if self.rx.is_some() {
            self.provider.cancel(self.id);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/provider.rs"]
mod tests;
