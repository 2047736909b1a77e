use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use super::config::Config;
use super::error::Result;
use crate::discovery::NetworkScanner;
use crate::printing::{PrintService, PrinterSettings, RedbEndpointStore, TcpLink};

/// Server state - shared handles for every connection
///
/// Cloning is cheap; all fields are `Arc`s.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | configuration (immutable) |
/// | printer | print service, active endpoint and stats |
/// | scanner | discovery scanner |
/// | running | control server accept loop is up |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub printer: Arc<PrintService>,
    pub scanner: Arc<NetworkScanner>,
    running: Arc<AtomicBool>,
}

impl ServerState {
    /// Build state from explicit parts
    pub fn new(config: Config, printer: PrintService, scanner: NetworkScanner) -> Self {
        Self {
            config: Arc::new(config),
            printer: Arc::new(printer),
            scanner: Arc::new(scanner),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the settings store under `work_dir` and wire up the services
    ///
    /// `PRINTER_IP` seeds the endpoint only when the store holds none.
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(Path::new(&config.work_dir))?;

        let store = RedbEndpointStore::open(config.settings_path())?;
        let settings = Arc::new(PrinterSettings::load(Arc::new(store))?);

        if let Some(seed) = config.seed_endpoint()
            && settings.seed(seed)?
        {
            info!(printer = %seed, "Printer seeded from environment");
        }

        match settings.current() {
            Some(endpoint) => info!(printer = %endpoint, "Active printer"),
            None => info!("No printer configured yet"),
        }

        let printer = PrintService::new(Arc::new(TcpLink::new(config.print_timeout())), settings)
            .with_layout(config.receipt_layout())
            .with_copy_delay(config.copy_delay())
            .with_drawer_pin(config.drawer_pin());
        let scanner = NetworkScanner::new(config.scan_config());

        Ok(Self::new(config.clone(), printer, scanner))
    }

    pub fn settings(&self) -> &Arc<PrinterSettings> {
        self.printer.settings()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}
