//! # kassa-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - PC858 encoding for Western-European printers
//! - Network printing (TCP port 9100) with a hard job timeout
//! - Reachability probes for discovery
//!
//! Business logic (WHAT to print) lives in `kassa-bridge`.
//!
//! ## Example
//!
//! ```ignore
//! use kassa_printer::{EscPosBuilder, NetworkPrinter, Printer};
//!
//! let mut builder = EscPosBuilder::new(42);
//! builder.center();
//! builder.double_size();
//! builder.line("TEST PRINT");
//! builder.reset_size();
//! builder.left();
//! builder.line_lr("Friet", "€3.00");
//! builder.cut();
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&builder.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

// Re-exports
pub use encoding::{EURO, encode_pc858, line_padding, pc858_width, price_line};
pub use error::{PrintError, PrintResult};
pub use escpos::{DrawerPin, EscPosBuilder, commands};
pub use printer::{DEFAULT_PORT, DEFAULT_TIMEOUT, NetworkPrinter, Printer, probe};
