//! Newline-delimited JSON host over stdin/stdout.
//!
//! Each input line is one host event:
//!
//! ```text
//! {"event":"install"}
//! {"event":"activate"}
//! {"event":"message","data":{"statusUpdate":{"isOnline":false}}}
//! {"event":"fetch","id":"1","request":{"method":"GET","url":"http://localhost:8000/"}}
//! ```
//!
//! Output lines carry fetch responses (`{"id", "response"}`), pass-through
//! failures (`{"id", "error"}`), lifecycle results (`{"lifecycle", "ok"}`) and
//! messages the worker posts to the page (`{"postMessage"}`). The page side
//! answers a `requestStatusUpdate` by sending a `message` event back in.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use swcache_core::{Error, Message, MessagePort, Request, Response};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use url::Url;

use crate::error::ErrorReply;
use crate::host::{Outcome, WorkerEvent, WorkerHost};
use crate::scope::WorkerScope;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum HostEvent {
    Install,
    Activate,
    Message { data: Value },
    Fetch { id: String, request: FetchRequest },
}

#[derive(Debug, Deserialize)]
struct FetchRequest {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
    #[serde(default)]
    body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Decode one input line into a worker event.
pub fn parse_event(line: &str) -> Result<WorkerEvent, Error> {
    let event = match serde_json::from_str::<HostEvent>(line)? {
        HostEvent::Install => WorkerEvent::Install,
        HostEvent::Activate => WorkerEvent::Activate,
        HostEvent::Message { data } => WorkerEvent::Message(Message::from_value(data)),
        HostEvent::Fetch { id, request } => {
            let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?;
            let mut built = Request::new(&request.method, url);
            built.headers = request.headers;
            if let Some(body) = request.body {
                built = built.with_body(body);
            }
            WorkerEvent::Fetch { id, request: built }
        }
    };
    Ok(event)
}

fn response_json(response: &Response) -> Value {
    json!({
        "status": response.status,
        "statusText": response.status_text,
        "headers": response.headers,
        "body": String::from_utf8_lossy(&response.body),
    })
}

/// Encode an outcome as an output line, if it produces one.
pub fn outcome_line(outcome: &Outcome) -> Option<Value> {
    match outcome {
        Outcome::Lifecycle { state, result: Ok(()) } => Some(json!({"lifecycle": state.to_string(), "ok": true})),
        Outcome::Lifecycle { state, result: Err(e) } => {
            Some(json!({"lifecycle": state.to_string(), "ok": false, "error": ErrorReply::from(e)}))
        }
        Outcome::Response { id, result: Ok(response) } => Some(json!({"id": id, "response": response_json(response)})),
        Outcome::Response { id, result: Err(e) } => Some(json!({"id": id, "error": ErrorReply::from(e)})),
        Outcome::Handled => None,
    }
}

/// Shared, line-oriented JSON writer.
#[derive(Clone)]
pub struct Output {
    writer: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl Output {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self { writer: Arc::new(Mutex::new(Box::new(writer))) }
    }

    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Write `value` as one line and flush.
    pub async fn emit(&self, value: &Value) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Output")
    }
}

/// The page on the other end of stdout.
#[derive(Debug, Clone)]
pub struct StdioPage {
    output: Output,
}

#[async_trait]
impl MessagePort for StdioPage {
    async fn post_message(&self, message: Message, reply: Option<Arc<dyn MessagePort>>) -> Result<(), Error> {
        if reply.is_some() {
            tracing::debug!("stdio page answers on stdin; reply port unused");
        }
        self.output
            .emit(&json!({"postMessage": message.to_value()}))
            .await
            .map_err(|e| Error::PortClosed(format!("stdout: {e}")))
    }
}

/// Scope for a worker whose only client is the stdio page.
#[derive(Debug, Clone)]
pub struct StdioScope {
    page: Arc<StdioPage>,
}

impl StdioScope {
    pub fn new(output: Output) -> Self {
        Self { page: Arc::new(StdioPage { output }) }
    }
}

#[async_trait]
impl WorkerScope for StdioScope {
    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::debug!("skip waiting");
        Ok(())
    }

    async fn claim(&self) -> Result<(), Error> {
        tracing::debug!("claiming stdio page");
        Ok(())
    }

    async fn match_all(&self, _include_uncontrolled: bool) -> Result<Vec<Arc<dyn MessagePort>>, Error> {
        Ok(vec![self.page.clone()])
    }
}

/// Read events from `input` until EOF, dispatching each one and writing
/// outcomes as they complete. Pending events finish before returning.
pub async fn serve<R>(
    input: R, host: WorkerHost, mut outcomes: mpsc::UnboundedReceiver<Outcome>, output: Output,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut pending = Vec::new();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match parse_event(&line) {
                    Ok(event) => pending.push(host.dispatch(event)),
                    Err(e) => {
                        tracing::warn!("rejected input line: {}", e);
                        output.emit(&json!({"error": ErrorReply::from(&e)})).await?;
                    }
                },
                None => break,
            },
            Some(outcome) = outcomes.recv() => {
                if let Some(line) = outcome_line(&outcome) {
                    output.emit(&line).await?;
                }
            }
        }
        pending.retain(|handle| !handle.is_finished());
    }

    for handle in pending {
        if let Err(e) = handle.await {
            tracing::error!("event task failed: {}", e);
        }
    }
    while let Ok(outcome) = outcomes.try_recv() {
        if let Some(line) = outcome_line(&outcome) {
            output.emit(&line).await?;
        }
    }

    tracing::info!("input closed, shutting down");
    Ok(())
}
