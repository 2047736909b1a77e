//! Routing table of the control server

use http::StatusCode;

use super::handler::{Command, Reply, execute};
use super::request::Request;
use super::response::Response;
use crate::core::ServerState;

/// Route a parsed request to its response
///
/// `/printer` and `/scan*` are operator routes used by the CLI while the
/// server owns the settings store.
pub async fn dispatch(state: &ServerState, request: Request) -> Response {
    let Request { method, path, body } = request;

    if method == "OPTIONS" {
        return Response::preflight();
    }

    let command = match (method.as_str(), path.as_str()) {
        ("GET", "/status") => Command::Status,
        ("GET", "/") => return index_page(state),
        ("POST", "/print") => Command::Print(body),
        ("POST", "/drawer") => Command::Drawer,
        ("POST", "/test") => Command::Test,
        ("POST", "/printer") => Command::SelectPrinter(body),
        ("GET", "/scan") => Command::ScanStatus,
        ("POST", "/scan") => Command::StartScan,
        ("POST", "/scan/stop") => Command::StopScan,
        _ => {
            let reply = Reply::error(StatusCode::NOT_FOUND, "Not found");
            return Response::json(reply.status, &reply.body);
        }
    };

    let reply = execute(state, command).await;
    Response::json(reply.status, &reply.body)
}

fn index_page(state: &ServerState) -> Response {
    let printer = state
        .printer
        .settings()
        .current()
        .map(|endpoint| endpoint.ip.to_string())
        .unwrap_or_else(|| "niet geconfigureerd".to_string());
    let stats = state.printer.stats();
    let print_count = stats.print_count;
    let last_error = stats
        .last_error
        .map(|err| {
            format!(
                "\n<p style=\"color: #ef4444;\">Laatste fout: {}</p>",
                escape_html(&err)
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<html>
<head><title>Kassa Print Bridge</title></head>
<body style="font-family: sans-serif; padding: 40px; background: #1a1a2e; color: #fff;">
<h1>Kassa Print Bridge</h1>
<p style="color: #22c55e;">Actief</p>
<p>Printer: {printer}</p>
<p>Bonnen geprint: {print_count}</p>{last_error}
</body>
</html>"#
    );

    Response::html(StatusCode::OK, html)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
