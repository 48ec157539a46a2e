//! Message ports between the page and worker contexts.
//!
//! A port is the only way the two contexts talk to each other. Posting is
//! asynchronous and may carry a reply port, which is how the worker lets a
//! page answer a broadcast on a dedicated channel.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Error, Message};

/// One end of a message channel.
#[async_trait]
pub trait MessagePort: Send + Sync + fmt::Debug {
    /// Deliver `message`, optionally transferring a port the receiver can reply on.
    async fn post_message(&self, message: Message, reply: Option<Arc<dyn MessagePort>>) -> Result<(), Error>;
}

/// A message as seen by the receiving side of a [`ChannelPort`].
#[derive(Debug)]
pub struct PortMessage {
    pub message: Message,
    pub reply: Option<Arc<dyn MessagePort>>,
}

/// Port backed by a tokio mpsc channel.
#[derive(Clone)]
pub struct ChannelPort {
    label: String,
    tx: mpsc::UnboundedSender<PortMessage>,
}

impl ChannelPort {
    /// Create a labelled port and the receiver for everything posted to it.
    pub fn channel(label: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<PortMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { label: label.into(), tx }, rx)
    }
}

impl fmt::Debug for ChannelPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPort").field("label", &self.label).finish()
    }
}

#[async_trait]
impl MessagePort for ChannelPort {
    async fn post_message(&self, message: Message, reply: Option<Arc<dyn MessagePort>>) -> Result<(), Error> {
        self.tx
            .send(PortMessage { message, reply })
            .map_err(|_| Error::PortClosed(self.label.clone()))
    }
}
