//! Printing module
//!
//! Everything between a decoded command and bytes on the printer socket:
//! - [`PrintService`] renders jobs, sends duplicate copies and keeps stats
//! - [`PrinterLink`] is the delivery seam, [`TcpLink`] the real transport
//! - [`PrinterSettings`] holds the active endpoint, persisted in redb

pub mod link;
pub mod service;
pub mod storage;
pub mod types;

pub use link::{PrinterLink, TcpLink};
pub use service::{COPY_DELAY, PrintService, PrintServiceError, PrintServiceResult};
pub use storage::{
    EndpointStore, PrinterSettings, RedbEndpointStore, SettingsStoreError, SettingsStoreResult,
};
pub use types::{PrintStats, PrinterEndpoint};
