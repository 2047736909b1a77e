//! Control protocol
//!
//! A deliberately small HTTP-shaped framing: one request per connection,
//! headers ignored, JSON in and out.
//!
//! - [`request`] - reading and parsing the request
//! - [`router`] - method/path routing table
//! - [`handler`] - commands, shared with the in-process bridge
//! - [`response`] - status line, headers and body
//! - [`client`] - talks to a running server from the CLI

pub mod client;
pub mod handler;
pub mod request;
pub mod response;
pub mod router;

pub use client::{ClientError, ClientReply, ControlClient};
pub use handler::{Command, Reply, execute};
pub use request::{MAX_REQUEST_BYTES, READ_IDLE_TIMEOUT, Request, RequestError, parse, read_request};
pub use response::Response;
pub use router::dispatch;
