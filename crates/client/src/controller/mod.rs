//! Page-side worker controller.
//!
//! Keeps the worker's connectivity flag in sync with what the page observes:
//!
//! - pushes a status message as soon as a worker is registered or takes over
//! - pushes again on every browser online/offline transition
//! - answers `requestStatusUpdate` from the worker, on the supplied reply
//!   port when there is one
//!
//! The controller holds no cache state. Its only state is its own
//! connectivity flag and the worker it resolved, both per page load.

mod registration;

use std::sync::Arc;

use serde_json::Value;
use swcache_core::{ConnectivityFlag, Error, Message, MessagePort};

pub use registration::{Registration, WorkerSlot};

/// Browser-side events the controller reacts to.
#[derive(Debug)]
pub enum PageEvent {
    /// Worker registration succeeded.
    Registered(Registration),
    /// Worker registration failed; logged and otherwise ignored.
    RegistrationFailed(String),
    /// A new worker took control of the page.
    ControllerChange(Option<Arc<dyn MessagePort>>),
    /// A message from the worker, with the port it was transferred, if any.
    Message { data: Value, reply: Option<Arc<dyn MessagePort>> },
    Online,
    Offline,
}

/// Relays page connectivity to the worker.
#[derive(Debug)]
pub struct WorkerController {
    connectivity: ConnectivityFlag,
    worker: Option<Arc<dyn MessagePort>>,
    controller: Option<Arc<dyn MessagePort>>,
}

impl WorkerController {
    /// Create a controller.
    ///
    /// `initial_online` is the browser's connectivity signal at page load.
    /// Pass `None` when the browser exposes none; the page then assumes online.
    pub fn new(initial_online: Option<bool>, controller: Option<Arc<dyn MessagePort>>) -> Self {
        let is_online = initial_online.unwrap_or(true);
        if is_online {
            tracing::info!("page loaded online");
        } else {
            tracing::info!("page loaded offline");
        }
        Self { connectivity: ConnectivityFlag::new(is_online), worker: None, controller }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Whether a worker instance has been resolved for this page.
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Dispatch a page event to its handler.
    pub async fn handle(&mut self, event: PageEvent) -> Result<(), Error> {
        match event {
            PageEvent::Registered(registration) => self.on_registered(&registration).await,
            PageEvent::RegistrationFailed(reason) => {
                tracing::error!("worker registration failed: {}", reason);
                Ok(())
            }
            PageEvent::ControllerChange(controller) => self.on_controller_change(controller).await,
            PageEvent::Message { data, reply } => self.on_message(data, reply).await,
            PageEvent::Online => self.on_online().await,
            PageEvent::Offline => self.on_offline().await,
        }
    }

    /// Resolve the current worker of a fresh registration and tell it our status.
    pub async fn on_registered(&mut self, registration: &Registration) -> Result<(), Error> {
        match registration.current() {
            Some(slot) => {
                tracing::debug!(slot = slot.label(), "resolved worker from registration");
                self.worker = Some(Arc::clone(slot.port()));
            }
            None => tracing::warn!("registration carries no worker instance"),
        }
        self.send_status_update(None).await
    }

    /// A new worker took over: talk to it from now on.
    pub async fn on_controller_change(&mut self, controller: Option<Arc<dyn MessagePort>>) -> Result<(), Error> {
        tracing::debug!(has_controller = controller.is_some(), "controller changed");
        self.worker = controller.clone();
        self.controller = controller;
        self.send_status_update(None).await
    }

    /// Handle a message from the worker.
    ///
    /// Only `requestStatusUpdate` is acted on; everything else is ignored.
    pub async fn on_message(&mut self, data: Value, reply: Option<Arc<dyn MessagePort>>) -> Result<(), Error> {
        match Message::from_value(data) {
            Message::RequestStatusUpdate => self.send_status_update(reply).await,
            other => {
                tracing::debug!(?other, "ignoring worker message");
                Ok(())
            }
        }
    }

    pub async fn on_online(&mut self) -> Result<(), Error> {
        tracing::info!("online");
        self.connectivity.set(true);
        self.send_status_update(None).await
    }

    pub async fn on_offline(&mut self) -> Result<(), Error> {
        tracing::info!("offline");
        self.connectivity.set(false);
        self.send_status_update(None).await
    }

    /// Send the current status to `target`, else the resolved worker, else
    /// the page's controller.
    pub async fn send_status_update(&self, target: Option<Arc<dyn MessagePort>>) -> Result<(), Error> {
        let message = Message::status(self.is_online());
        let port = target
            .or_else(|| self.worker.clone())
            .or_else(|| self.controller.clone())
            .ok_or_else(|| Error::NoWorker("no reply port, resolved worker, or controller".into()))?;

        tracing::debug!(is_online = self.is_online(), ?port, "sending status update");
        port.post_message(message, None).await
    }
}
