//! Receipt, test page and drawer byte streams

pub mod renderer;

pub use renderer::{RECEIPT_WIDTH, ReceiptLayout, ReceiptRenderer, drawer_pulse};
