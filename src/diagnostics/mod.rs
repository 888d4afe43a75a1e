//! Structured, asynchronous diagnostics.
//!
//! Decode and runtime problems inside the renderer are not errors: they are published as
//! [`Diagnostic`] values on a [`DiagnosticChannel`] while rendering carries on. A channel belongs
//! to one render context (one scenario), so handlers cannot observe another context's events.
//!
//! Emission only enqueues. A dispatcher task delivers events to the handlers subscribed at
//! dispatch time, in emission order. [`DiagnosticChannel::flush`] resolves once everything
//! emitted before it has been delivered; the render pipeline awaits it before completing.
//! A handler that panics is skipped for that event; the others, and later events, still run.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Something failed; output is degraded.
    Error,
    /// Something unexpected; output may be degraded.
    Warning,
    /// Informational.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        })
    }
}

/// Subsystem that produced a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    /// Uncategorized.
    General,
    /// Scene document or TileJSON parsing.
    ParseStyle,
    /// Vector tile decoding.
    ParseTile,
    /// Compositing.
    Render,
    /// Resource transfer.
    HttpRequest,
    /// Image decoding or encoding.
    Image,
}

impl std::fmt::Display for EventClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::General => "General",
            Self::ParseStyle => "ParseStyle",
            Self::ParseTile => "ParseTile",
            Self::Render => "Render",
            Self::HttpRequest => "HttpRequest",
            Self::Image => "Image",
        })
    }
}

/// One structured diagnostic. Carries no reference to the request that triggered it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Failing subsystem.
    pub class: EventClass,
    /// Severity.
    pub severity: Severity,
    /// Human-readable detail.
    pub text: String,
}

impl Diagnostic {
    /// Build a diagnostic.
    pub fn new(class: EventClass, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            class,
            severity,
            text: text.into(),
        }
    }

    /// Build an `ERROR` diagnostic.
    pub fn error(class: EventClass, text: impl Into<String>) -> Self {
        Self::new(class, Severity::Error, text)
    }

    /// Build a `WARNING` diagnostic.
    pub fn warning(class: EventClass, text: impl Into<String>) -> Self {
        Self::new(class, Severity::Warning, text)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.class, self.text)
    }
}

type Handler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;
type HandlerList = Mutex<Vec<(u64, Handler)>>;

enum Envelope {
    Event(Diagnostic),
    Flush(oneshot::Sender<()>),
}

struct ChannelInner {
    tx: mpsc::UnboundedSender<Envelope>,
    handlers: Arc<HandlerList>,
    next_id: AtomicU64,
}

/// Context-scoped publish/subscribe stream of [`Diagnostic`]s.
///
/// Clones share the same stream.
#[derive(Clone)]
pub struct DiagnosticChannel {
    inner: Arc<ChannelInner>,
}

impl std::fmt::Debug for DiagnosticChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl DiagnosticChannel {
    /// Create a channel and spawn its dispatcher. Must be called within a Tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let handlers: Arc<HandlerList> = Arc::new(Mutex::new(Vec::new()));
        let dispatch_handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match envelope {
                    Envelope::Event(diagnostic) => {
                        let snapshot: Vec<Handler> = lock(&dispatch_handlers)
                            .iter()
                            .map(|(_, h)| Arc::clone(h))
                            .collect();
                        for handler in snapshot {
                            let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| {
                                handler(&diagnostic)
                            }));
                            if delivered.is_err() {
                                tracing::error!(
                                    class = %diagnostic.class,
                                    "diagnostic handler panicked; continuing with the next handler"
                                );
                            }
                        }
                    }
                    Envelope::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self {
            inner: Arc::new(ChannelInner {
                tx,
                handlers,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Publish `diagnostic`. Handlers run later, on the dispatcher task.
    pub fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(class = %diagnostic.class, "{}", diagnostic.text)
            }
            Severity::Warning => {
                tracing::warn!(class = %diagnostic.class, "{}", diagnostic.text)
            }
            Severity::Info => tracing::info!(class = %diagnostic.class, "{}", diagnostic.text),
        }
        let _ = self.inner.tx.send(Envelope::Event(diagnostic));
    }

    /// Resolve once every diagnostic emitted before this call has reached its handlers.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.inner.tx.send(Envelope::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Register `handler` for subsequently dispatched diagnostics.
    ///
    /// The handler stays registered until the returned [`Subscription`] is dropped or
    /// [`unsubscribe_all`](Self::unsubscribe_all) is called.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.handlers).push((id, Arc::new(handler)));
        Subscription {
            id,
            handlers: Arc::downgrade(&self.inner.handlers),
        }
    }

    /// Subscribe a recorder and return it with its subscription.
    #[must_use = "dropping the subscription stops recording"]
    pub fn collect(&self) -> (Subscription, DiagnosticLog) {
        let log = DiagnosticLog::default();
        let sink = log.clone();
        let sub = self.subscribe(move |d| sink.push(d.clone()));
        (sub, log)
    }

    /// Remove every handler.
    pub fn unsubscribe_all(&self) {
        lock(&self.inner.handlers).clear();
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.handlers).len()
    }
}

impl Default for DiagnosticChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(handlers: &HandlerList) -> std::sync::MutexGuard<'_, Vec<(u64, Handler)>> {
    match handlers.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registration of one handler; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    handlers: Weak<HandlerList>,
}

impl Subscription {
    /// Unsubscribe explicitly.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            lock(&handlers).retain(|(id, _)| *id != self.id);
        }
    }
}

/// Shared, append-only record of diagnostics filled by [`DiagnosticChannel::collect`].
#[derive(Clone, Debug, Default)]
pub struct DiagnosticLog {
    events: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticLog {
    fn push(&self, d: Diagnostic) {
        match self.events.lock() {
            Ok(mut v) => v.push(d),
            Err(poisoned) => poisoned.into_inner().push(d),
        }
    }

    /// Copy of everything recorded so far, in delivery order.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded diagnostics with `Severity::Error`.
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.snapshot()
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Return `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diagnostics/channel.rs"]
mod tests;
