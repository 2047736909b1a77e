//! Typed order payloads

pub mod model;

pub use model::{BusinessInfo, Order, OrderItem, OrderType, PaymentMethod, PrintRequest, SelectedOption};
