//! Test doubles for the network and host scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swcache_client::{CacheMode, Network};
use swcache_core::{Error, MessagePort, Request, Response};

use crate::scope::WorkerScope;

pub fn ok(body: &str) -> Response {
    Response::new(200, "OK", body.to_string()).with_header("Content-Type", "text/plain")
}

enum Route {
    Respond(Response),
    Fail,
}

/// Network that answers from a fixed table keyed by full URL and records
/// every call. Unknown URLs reject.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl StubNetwork {
    pub fn respond(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Respond(response));
    }

    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub fn calls(&self) -> Vec<(String, CacheMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push((url.clone(), mode));
        match self.routes.lock().unwrap().get(&url) {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Fail) => Err(Error::Network(format!("{url}: connection refused"))),
            None => Err(Error::Network(format!("{url}: no route"))),
        }
    }
}

/// Scope that counts lifecycle calls and hands out a fixed client list.
#[derive(Default)]
pub struct RecordingScope {
    clients: Vec<Arc<dyn MessagePort>>,
    fail_claim: bool,
    skip_waiting: AtomicUsize,
    claim: AtomicUsize,
}

impl RecordingScope {
    pub fn with_clients(clients: Vec<Arc<dyn MessagePort>>) -> Self {
        Self { clients, ..Default::default() }
    }

    pub fn failing_claim() -> Self {
        Self { fail_claim: true, ..Default::default() }
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerScope for RecordingScope {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim(&self) -> Result<(), Error> {
        self.claim.fetch_add(1, Ordering::SeqCst);
        if self.fail_claim {
            return Err(Error::Host("claim refused".into()));
        }
        Ok(())
    }

    async fn match_all(&self, _include_uncontrolled: bool) -> Result<Vec<Arc<dyn MessagePort>>, Error> {
        Ok(self.clients.clone())
    }
}
