//! Printer discovery on the local /24 subnet

mod scanner;

pub use scanner::{DiscoveredPrinter, NetworkScanner, SUBNET_HOSTS, ScanConfig, local_ipv4};
