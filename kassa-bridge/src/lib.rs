//! Kassa Print Bridge - local print server for thermal receipt printers
//!
//! # Overview
//!
//! A POS front end posts orders to a small HTTP-shaped control server on
//! port 3001. Each order is rendered into ESC/POS bytes and pushed to a
//! network printer on port 9100. The printer can be found with a /24 subnet
//! scan and is remembered in a local redb file.
//!
//! # Module layout
//!
//! ```text
//! kassa-bridge/src/
//! ├── core/        # config, shared state, server loop, errors
//! ├── control/     # request framing, routing, commands, responses
//! ├── bridge.rs    # in-process transport for the same commands
//! ├── orders/      # typed order payloads
//! ├── receipt/     # receipt / test page / drawer rendering
//! ├── printing/    # print service, transport seam, settings store
//! ├── discovery/   # subnet scanner
//! └── common/      # logging
//! ```

pub mod bridge;
pub mod common;
pub mod control;
pub mod core;
pub mod discovery;
pub mod orders;
pub mod printing;
pub mod receipt;

pub use bridge::{BridgeHandle, BridgeRequest, BridgeResponse, BridgeWorker};
pub use core::{BridgeError, Config, Server, ServerState};
pub use discovery::{DiscoveredPrinter, NetworkScanner, ScanConfig};
pub use printing::{PrintService, PrinterEndpoint, PrinterSettings};

pub use common::logger::{cleanup_old_logs, init_logger_with_file};

/// Load `.env` and start logging as configured
///
/// Returns the loaded configuration.
pub fn setup_environment() -> anyhow::Result<Config> {
    // A missing .env file is fine
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )?;
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    __ __
   / //_/___ _______________ _
  / ,< / __ `/ ___/ ___/ __ `/
 / /| / /_/ (__  |__  ) /_/ /
/_/ |_\__,_/____/____/\__,_/
       print bridge
    "#
    );
}
