//! Command execution shared by the socket server and the in-process bridge

use http::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::core::ServerState;
use crate::orders::PrintRequest;
use crate::printing::{PrintServiceError, PrinterEndpoint};

/// Logical operations of the bridge
///
/// The first four are the POS surface; the rest let an operator manage a
/// running server without touching its settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    /// Raw JSON body `{order, businessInfo}`
    Print(String),
    Drawer,
    Test,
    /// Raw JSON body `{ip, port?}`
    SelectPrinter(String),
    StartScan,
    ScanStatus,
    StopScan,
}

/// Outcome of a command: status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn success() -> Self {
        Self::ok(json!({ "success": true }))
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }
}

pub async fn execute(state: &ServerState, command: Command) -> Reply {
    match command {
        Command::Status => status(state),
        Command::Print(body) => print(state, &body).await,
        Command::Drawer => match state.printer.open_drawer().await {
            Ok(()) => Reply::success(),
            Err(e) => failure(e, "Drawer failed"),
        },
        Command::Test => match state.printer.test_print().await {
            Ok(()) => Reply::success(),
            Err(e) => failure(e, "Test print failed"),
        },
        Command::SelectPrinter(body) => select_printer(state, &body),
        Command::StartScan => Reply::ok(json!({ "started": state.scanner.start_scan() })),
        Command::ScanStatus => scan_status(state),
        Command::StopScan => {
            state.scanner.stop_scan();
            Reply::success()
        }
    }
}

fn status(state: &ServerState) -> Reply {
    let printer = state
        .printer
        .settings()
        .current()
        .map(|endpoint| endpoint.ip.to_string())
        .unwrap_or_else(|| "not configured".to_string());

    Reply::ok(json!({ "status": "online", "printer": printer }))
}

async fn print(state: &ServerState, body: &str) -> Reply {
    let request: PrintRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejecting print body");
            return Reply::error(StatusCode::BAD_REQUEST, "Invalid order data");
        }
    };
    let Some(order) = request.order else {
        return Reply::error(StatusCode::BAD_REQUEST, "Invalid order data");
    };

    match state
        .printer
        .print_receipt(&order, &request.business_info)
        .await
    {
        Ok(()) => Reply::success(),
        Err(e) => failure(e, "Print failed"),
    }
}

fn select_printer(state: &ServerState, body: &str) -> Reply {
    let endpoint: PrinterEndpoint = match serde_json::from_str(body) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            debug!(error = %e, "Rejecting printer body");
            return Reply::error(StatusCode::BAD_REQUEST, "Invalid printer address");
        }
    };

    match state.settings().select(endpoint) {
        Ok(()) => Reply::ok(json!({ "success": true, "printer": endpoint.to_string() })),
        Err(e) => {
            warn!(printer = %endpoint, error = %e, "Failed to persist printer");
            Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save printer")
        }
    }
}

fn scan_status(state: &ServerState) -> Reply {
    let printers: Vec<Value> = state
        .scanner
        .found_printers()
        .into_iter()
        .map(|printer| {
            json!({
                "ip": printer.ip.to_string(),
                "port": printer.port,
                "latencyMs": printer.latency.as_millis() as u64,
            })
        })
        .collect();

    Reply::ok(json!({
        "scanning": state.scanner.is_scanning(),
        "progress": state.scanner.progress(),
        "printers": printers,
    }))
}

fn failure(err: PrintServiceError, message: &str) -> Reply {
    match err {
        PrintServiceError::NotConfigured => {
            Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "Printer not configured")
        }
        PrintServiceError::Delivery { .. } => {
            Reply::error(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
