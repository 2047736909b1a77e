use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kassa_printer::DrawerPin;
use tracing::warn;

use crate::discovery::ScanConfig;
use crate::printing::PrinterEndpoint;
use crate::receipt::ReceiptLayout;

/// Bridge configuration
///
/// # Environment variables
///
/// Every field can be overridden through the environment (or `.env`):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | settings database and logs |
/// | CONTROL_HOST | 0.0.0.0 | control server bind address |
/// | CONTROL_PORT | 3001 | control server port |
/// | PRINTER_IP | - | seeds the printer when none is stored |
/// | PRINTER_PORT | 9100 | port for PRINTER_IP |
/// | PRINT_TIMEOUT_MS | 5000 | per job timeout |
/// | COPY_DELAY_MS | 500 | pause between receipt copies |
/// | RECEIPT_WIDTH | 42 | receipt columns |
/// | RECEIPT_DARKEN | true | darkened print profile |
/// | DRAWER_PIN | 2 | cash drawer pin (2 or 5) |
/// | SCAN_INTERFACES | en0,en1,eth0,wlan0 | interfaces tried for the local address |
/// | SCAN_SUBNET | - | fixed /24 to scan, e.g. 192.168.1 |
/// | SCAN_PORT | 9100 | discovery port |
/// | SCAN_BATCH_SIZE | 20 | concurrent probes per batch |
/// | PROBE_TIMEOUT_MS | 1000 | per probe timeout |
/// | LOG_LEVEL | info | default filter (RUST_LOG wins) |
/// | LOG_JSON | false | JSON console output |
/// | LOG_DIR | - | enables daily log files |
///
/// # Example
///
/// ```ignore
/// PRINTER_IP=192.168.1.50 CONTROL_PORT=3001 cargo run -p kassa-bridge
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the settings database
    pub work_dir: String,
    pub control_host: String,
    pub control_port: u16,
    /// Printer used when the store holds none
    pub printer_ip: Option<Ipv4Addr>,
    pub printer_port: u16,
    pub print_timeout_ms: u64,
    pub copy_delay_ms: u64,
    pub receipt_width: usize,
    pub receipt_darken: bool,
    pub drawer_pin: u8,
    pub scan_interfaces: Vec<String>,
    /// First three octets, e.g. `192.168.1`
    pub scan_subnet: Option<String>,
    pub scan_port: u16,
    pub scan_batch_size: usize,
    pub probe_timeout_ms: u64,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            work_dir: non_empty("WORK_DIR").unwrap_or_else(|| "./work_dir".into()),
            control_host: non_empty("CONTROL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            control_port: parsed(&lookup, "CONTROL_PORT").unwrap_or(3001),
            printer_ip: parsed(&lookup, "PRINTER_IP"),
            printer_port: parsed(&lookup, "PRINTER_PORT").unwrap_or(kassa_printer::DEFAULT_PORT),
            print_timeout_ms: parsed(&lookup, "PRINT_TIMEOUT_MS").unwrap_or(5000),
            copy_delay_ms: parsed(&lookup, "COPY_DELAY_MS").unwrap_or(500),
            receipt_width: parsed(&lookup, "RECEIPT_WIDTH").unwrap_or(crate::receipt::RECEIPT_WIDTH),
            receipt_darken: parsed(&lookup, "RECEIPT_DARKEN").unwrap_or(true),
            drawer_pin: parsed(&lookup, "DRAWER_PIN").unwrap_or(2),
            scan_interfaces: non_empty("SCAN_INTERFACES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(default_interfaces),
            scan_subnet: non_empty("SCAN_SUBNET"),
            scan_port: parsed(&lookup, "SCAN_PORT").unwrap_or(kassa_printer::DEFAULT_PORT),
            scan_batch_size: parsed(&lookup, "SCAN_BATCH_SIZE").unwrap_or(20),
            probe_timeout_ms: parsed(&lookup, "PROBE_TIMEOUT_MS").unwrap_or(1000),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parsed(&lookup, "LOG_JSON").unwrap_or(false),
            log_dir: non_empty("LOG_DIR"),
        }
    }

    /// Control server bind address
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.control_host, self.control_port)
    }

    /// Address a local CLI uses to reach the running control server
    ///
    /// A wildcard bind host is reached over loopback.
    pub fn control_client_addr(&self) -> String {
        let host = match self.control_host.as_str() {
            "" | "0.0.0.0" => "127.0.0.1",
            "::" | "[::]" => "[::1]",
            host => host,
        };
        format!("{}:{}", host, self.control_port)
    }

    /// Path of the redb settings file
    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("settings.redb")
    }

    /// Endpoint from PRINTER_IP / PRINTER_PORT
    pub fn seed_endpoint(&self) -> Option<PrinterEndpoint> {
        self.printer_ip
            .map(|ip| PrinterEndpoint::new(ip, self.printer_port))
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_millis(self.print_timeout_ms)
    }

    pub fn copy_delay(&self) -> Duration {
        Duration::from_millis(self.copy_delay_ms)
    }

    pub fn receipt_layout(&self) -> ReceiptLayout {
        ReceiptLayout {
            width: self.receipt_width.max(1),
            darken: self.receipt_darken,
        }
    }

    pub fn drawer_pin(&self) -> DrawerPin {
        DrawerPin::from_number(self.drawer_pin).unwrap_or_else(|| {
            warn!(pin = self.drawer_pin, "Unsupported drawer pin, using pin 2");
            DrawerPin::Pin2
        })
    }

    pub fn scan_config(&self) -> ScanConfig {
        let subnet = self.scan_subnet.as_deref().and_then(|raw| {
            let parsed = parse_subnet(raw);
            if parsed.is_none() {
                warn!(subnet = raw, "Ignoring invalid SCAN_SUBNET");
            }
            parsed
        });

        ScanConfig {
            interfaces: self.scan_interfaces.clone(),
            subnet,
            port: self.scan_port,
            batch_size: self.scan_batch_size.max(1),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_interfaces() -> Vec<String> {
    ["en0", "en1", "eth0", "wlan0"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Parse `a.b.c` (or a full address, whose last octet is dropped) into a /24
pub fn parse_subnet(raw: &str) -> Option<[u8; 3]> {
    let octets: Vec<u8> = raw
        .trim()
        .trim_end_matches('.')
        .split('.')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;

    match octets.as_slice() {
        [a, b, c] | [a, b, c, _] => Some([*a, *b, *c]),
        _ => None,
    }
}
