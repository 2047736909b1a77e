//! Control server
//!
//! Accepts TCP connections and hands each one to its own task:
//! - one request per connection, then close
//! - the accept loop never waits on a handler
//! - stops on the shutdown token

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::error::{BridgeError, Result};
use super::state::ServerState;
use crate::control::{self, READ_IDLE_TIMEOUT, RequestError, Response};

/// Control server
pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Bind the configured control address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.state.config.control_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!("Control server listening on {}", local);
        self.state.set_running(true);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Control server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_connection_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        self.state.set_running(false);
        Ok(())
    }

    fn spawn_connection_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let state = self.state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &state).await {
                tracing::debug!("Client {} handler finished: {}", addr, e);
            }
        });
    }
}

/// Serve exactly one request on `stream`, then close it
async fn handle_connection(
    mut stream: TcpStream,
    state: &ServerState,
) -> std::result::Result<(), RequestError> {
    let response = match control::read_request(&mut stream, READ_IDLE_TIMEOUT).await {
        Ok(raw) => match control::parse(&raw) {
            Ok(request) => {
                tracing::debug!(method = %request.method, path = %request.path, "Request");
                control::dispatch(state, request).await
            }
            Err(_) => invalid_request(),
        },
        Err(RequestError::TooLarge) => invalid_request(),
        Err(e) => return Err(e),
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn invalid_request() -> Response {
    let reply = control::Reply::error(http::StatusCode::BAD_REQUEST, "Invalid request");
    Response::json(reply.status, &reply.body)
}
