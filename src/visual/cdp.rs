//! Chrome DevTools Protocol client over a page target's WebSocket.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum CdpError {
    #[error("CDP connection failed: {0}")]
    Connect(#[from] tungstenite::Error),

    #[error("CDP connection closed")]
    Closed,

    #[error("CDP command '{0}' timed out")]
    Timeout(String),

    #[error("CDP error: {0}")]
    Protocol(String),

    #[error("page script threw: {0}")]
    Script(String),
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

pub struct CdpClient {
    outgoing: mpsc::Sender<String>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl CdpClient {
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        let (stream, _) = connect_async(ws_url).await?;
        let (mut sink, mut incoming) = stream.split();
        let (outgoing, mut queue) = mpsc::channel::<String>(64);
        let pending: Pending = Arc::default();

        let writer = tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "CDP write failed");
                    break;
                }
            }
        });

        let waiting = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = incoming.next().await {
                match message {
                    Ok(Message::Text(text)) => dispatch(&waiting, &text).await,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "CDP read failed");
                        break;
                    }
                }
            }
            // dropping the senders wakes every waiter with `Closed`
            waiting.lock().await.clear();
        });

        Ok(Self {
            outgoing,
            pending,
            next_id: AtomicU64::new(1),
            reader,
            writer,
        })
    }

    pub async fn send(&self, method: &str, params: Value) -> Result<Value, CdpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = json!({ "id": id, "method": method, "params": params });
        if self.outgoing.send(message.to_string()).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(CdpError::Closed);
        }

        let response = match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(CdpError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(CdpError::Timeout(method.to_string()));
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(CdpError::Protocol(message));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self.send("Page.navigate", json!({ "url": url })).await?;
        match result.get("errorText").and_then(Value::as_str) {
            Some(text) => Err(CdpError::Protocol(format!("navigation failed: {text}"))),
            None => Ok(()),
        }
    }

    /// Evaluates `expression` in the page and returns its value, awaiting promises.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        evaluation_value(result)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn dispatch(pending: &Pending, text: &str) {
    let Ok(message) = serde_json::from_str::<Value>(text) else {
        debug!("ignoring non-JSON CDP frame");
        return;
    };
    // events carry no id; nothing here subscribes to them
    let Some(id) = message.get("id").and_then(Value::as_u64) else {
        return;
    };
    if let Some(tx) = pending.lock().await.remove(&id) {
        let _ = tx.send(message);
    }
}

fn evaluation_value(result: Value) -> Result<Value, CdpError> {
    if let Some(details) = result.get("exceptionDetails") {
        let text = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("unknown exception");
        return Err(CdpError::Script(text.to_string()));
    }
    Ok(result
        .pointer("/result/value")
        .cloned()
        .unwrap_or(Value::Null))
}
