//! In-process bridge
//!
//! Second transport for the control commands. An embedding host (web view,
//! stdin loop) sends [`BridgeRequest`]s over a channel and gets one
//! [`BridgeResponse`] back per request. The method is not used for routing;
//! the path alone picks the command.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::control::{Command, execute};
use crate::core::{BridgeError, Result, ServerState};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub request_id: String,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub request_id: String,
    pub success: bool,
    pub data: Value,
}

struct Envelope {
    request: BridgeRequest,
    reply: oneshot::Sender<BridgeResponse>,
}

/// Sending half, cheap to clone
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeHandle {
    /// Send a request and wait for its response
    pub async fn call(&self, request: BridgeRequest) -> Result<BridgeResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| BridgeError::WorkerStopped)?;
        rx.await.map_err(|_| BridgeError::WorkerStopped)
    }
}

/// Receiving half, drives the commands
pub struct BridgeWorker {
    state: ServerState,
    rx: mpsc::Receiver<Envelope>,
}

/// Create a connected handle/worker pair
pub fn channel(state: ServerState, capacity: usize) -> (BridgeHandle, BridgeWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (BridgeHandle { tx }, BridgeWorker { state, rx })
}

impl BridgeWorker {
    /// Serve requests until every handle is dropped or `shutdown` fires
    ///
    /// Each request runs on its own task, so a slow print does not hold up
    /// a status query.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let envelope = tokio::select! {
                _ = shutdown.cancelled() => break,
                envelope = self.rx.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let state = self.state.clone();
            tokio::spawn(async move {
                let Envelope { request, reply } = envelope;
                let response = handle(&state, request).await;
                if reply.send(response).is_err() {
                    tracing::debug!("Bridge caller went away before the reply");
                }
            });
        }
        tracing::debug!("Bridge worker stopped");
    }
}

async fn handle(state: &ServerState, request: BridgeRequest) -> BridgeResponse {
    let BridgeRequest {
        request_id,
        path,
        method,
        body,
    } = request;
    tracing::debug!(%request_id, %path, %method, "Bridge request");

    let command = match path.as_str() {
        "/status" => Command::Status,
        "/print" => Command::Print(body.unwrap_or_default()),
        "/drawer" => Command::Drawer,
        "/test" => Command::Test,
        _ => {
            return BridgeResponse {
                request_id,
                success: false,
                data: json!({ "error": "Unknown path" }),
            };
        }
    };

    let reply = execute(state, command).await;
    BridgeResponse {
        request_id,
        success: reply.is_success(),
        data: reply.body,
    }
}
