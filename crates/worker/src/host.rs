//! Event dispatch for one worker instance.
//!
//! Host runtime events are routed through a registration table keyed by
//! [`EventKind`]. Each dispatched event runs as its own task, so a slow
//! network fetch never holds up a status message or another fetch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use swcache_core::{Error, Message, PortMessage, Request, Response};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::WorkerState;
use crate::router::CacheRouter;

/// Kinds of host runtime events a worker can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Message,
    Fetch,
}

/// A host runtime event.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Message(Message),
    Fetch { id: String, request: Request },
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install => EventKind::Install,
            WorkerEvent::Activate => EventKind::Activate,
            WorkerEvent::Message(_) => EventKind::Message,
            WorkerEvent::Fetch { .. } => EventKind::Fetch,
        }
    }
}

/// What handling an event produced.
#[derive(Debug)]
pub enum Outcome {
    Lifecycle { state: WorkerState, result: Result<(), Error> },
    Response { id: String, result: Result<Response, Error> },
    Handled,
}

/// An async event handler.
pub type Handler = Arc<dyn Fn(Arc<CacheRouter>, WorkerEvent) -> BoxFuture<'static, Outcome> + Send + Sync>;

/// Wrap an async function as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<CacheRouter>, WorkerEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(move |router, event| f(router, event).boxed())
}

/// Dispatches events to the handlers registered for their kind.
#[derive(Clone)]
pub struct WorkerHost {
    router: Arc<CacheRouter>,
    handlers: HashMap<EventKind, Handler>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHost")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WorkerHost {
    /// Create a host with no handlers registered.
    pub fn empty(router: Arc<CacheRouter>) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        (Self { router, handlers: HashMap::new(), outcomes }, rx)
    }

    /// Create a host with the router's handlers registered for every kind.
    pub fn new(router: Arc<CacheRouter>) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (mut host, rx) = Self::empty(router);
        host.on(EventKind::Install, handler(|router, _| install(router)));
        host.on(EventKind::Activate, handler(|router, _| activate(router)));
        host.on(EventKind::Message, handler(message));
        host.on(EventKind::Fetch, handler(fetch));
        (host, rx)
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn on(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    /// Run the handler for `event` to completion on the current task.
    ///
    /// Returns None if no handler is registered for the event's kind.
    pub async fn handle(&self, event: WorkerEvent) -> Option<Outcome> {
        let kind = event.kind();
        match self.handlers.get(&kind) {
            Some(handler) => Some(handler(Arc::clone(&self.router), event).await),
            None => {
                tracing::debug!(?kind, "no handler registered");
                None
            }
        }
    }

    /// Spawn the handler for `event` and publish its outcome.
    pub fn dispatch(&self, event: WorkerEvent) -> JoinHandle<()> {
        let host = self.clone();
        tokio::spawn(async move {
            if let Some(outcome) = host.handle(event).await
                && host.outcomes.send(outcome).is_err()
            {
                tracing::debug!("outcome receiver dropped");
            }
        })
    }

    /// Feed replies arriving on the router's reply port back in as message events.
    pub fn forward_replies(&self, mut replies: mpsc::UnboundedReceiver<PortMessage>) -> JoinHandle<()> {
        let host = self.clone();
        tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                host.dispatch(WorkerEvent::Message(reply.message));
            }
        })
    }
}

async fn install(router: Arc<CacheRouter>) -> Outcome {
    let result = router.on_install().await;
    if let Err(e) = &result {
        tracing::error!("install failed: {}", e);
    }
    Outcome::Lifecycle { state: router.state(), result }
}

async fn activate(router: Arc<CacheRouter>) -> Outcome {
    let result = router.on_activate().await;
    if let Err(e) = &result {
        tracing::error!("activation failed: {}", e);
    }
    Outcome::Lifecycle { state: router.state(), result }
}

async fn message(router: Arc<CacheRouter>, event: WorkerEvent) -> Outcome {
    if let WorkerEvent::Message(message) = event {
        router.on_message(message);
    }
    Outcome::Handled
}

async fn fetch(router: Arc<CacheRouter>, event: WorkerEvent) -> Outcome {
    let WorkerEvent::Fetch { id, request } = event else {
        return Outcome::Handled;
    };
    let result = router.on_fetch(&request).await;
    if let Err(e) = &result {
        tracing::warn!(%id, "pass-through fetch failed: {}", e);
    }
    Outcome::Response { id, result }
}
