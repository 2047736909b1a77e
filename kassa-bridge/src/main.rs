use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kassa_bridge::control::{ClientError, ClientReply, ControlClient};
use kassa_bridge::{
    BridgeRequest, BridgeResponse, Config, PrinterEndpoint, Server, ServerState, bridge,
    print_banner, setup_environment,
};
use kassa_printer::{DEFAULT_PORT, NetworkPrinter, Printer};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "kassa-bridge", version, about = "Local print bridge for ESC/POS receipt printers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control server (default)
    Serve,
    /// Scan the local /24 for printers
    Scan {
        /// Make this discovered printer the active one
        #[arg(long, value_name = "IP")]
        select: Option<Ipv4Addr>,
    },
    /// Set the active printer
    Select {
        ip: Ipv4Addr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Show the active printer and configuration
    Status,
    /// Serve bridge requests as JSON lines on stdin/stdout
    Bridge,
}

/// Poll interval while following a scan on a running server
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = setup_environment()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(open_state(&config)?).await,
        Command::Bridge => run_bridge(open_state(&config)?).await,
        // The serving process holds the settings file lock, so these go
        // through its control port when it is up
        Command::Scan { select } => match running_server(&config).await? {
            Some(client) => remote_scan(&client, select).await,
            None => scan(&open_state(&config)?, select).await,
        },
        Command::Select { ip, port } => {
            let endpoint = PrinterEndpoint::new(ip, port);
            match running_server(&config).await? {
                Some(client) => remote_select(&client, endpoint).await,
                None => {
                    open_state(&config)?.settings().select(endpoint)?;
                    println!("Active printer: {endpoint}");
                    Ok(())
                }
            }
        }
        Command::Status => match running_server(&config).await? {
            Some(client) => remote_status(&config, &client).await,
            None => status(&config, &open_state(&config)?).await,
        },
    }
}

fn open_state(config: &Config) -> anyhow::Result<ServerState> {
    ServerState::initialize(config).context("Failed to initialize state")
}

/// Client for the control server, if one answers on the configured port
async fn running_server(config: &Config) -> anyhow::Result<Option<ControlClient>> {
    let client = ControlClient::new(config.control_client_addr());
    match client.get("/status").await {
        Ok(_) => Ok(Some(client)),
        Err(ClientError::Unreachable(_)) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Control port {} is not usable", client.addr())),
    }
}

async fn serve(state: ServerState) -> anyhow::Result<()> {
    print_banner();
    tracing::info!("Kassa print bridge starting...");

    let shutdown = shutdown_on_ctrl_c();
    let server = Server::new(state);

    if let Err(e) = server.run(shutdown).await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn scan(state: &ServerState, select: Option<Ipv4Addr>) -> anyhow::Result<()> {
    let scanner = Arc::clone(&state.scanner);

    let mut progress = scanner.subscribe_progress();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            eprint!("\rScanning... {:>3.0}%", value * 100.0);
        }
    });

    let scan = scanner.scan();
    tokio::pin!(scan);
    let found = tokio::select! {
        found = &mut scan => found,
        _ = tokio::signal::ctrl_c() => {
            scanner.stop_scan();
            (&mut scan).await
        }
    };
    reporter.abort();
    eprintln!();

    let Some(found) = found else {
        bail!("A scan is already running");
    };

    if found.is_empty() {
        println!("No printers found");
    }
    for printer in &found {
        println!(
            "{}:{}  {} ms",
            printer.ip,
            printer.port,
            printer.latency.as_millis()
        );
    }

    if let Some(ip) = select {
        let Some(printer) = found.iter().find(|printer| printer.ip == ip) else {
            bail!("{ip} was not found by the scan");
        };
        let endpoint = PrinterEndpoint::new(printer.ip, printer.port);
        state.settings().select(endpoint)?;
        println!("Active printer: {endpoint}");
    }
    Ok(())
}

async fn status(config: &Config, state: &ServerState) -> anyhow::Result<()> {
    println!("Control server: {}", config.control_addr());
    println!("Settings:       {}", config.settings_path().display());

    match state.settings().current() {
        Some(endpoint) => {
            let online = NetworkPrinter::from_socket_addr(endpoint.socket_addr())
                .is_online()
                .await;
            let label = if online { "online" } else { "offline" };
            println!("Printer:        {endpoint} ({label})");
        }
        None => println!("Printer:        not configured"),
    }
    Ok(())
}

async fn remote_status(config: &Config, client: &ControlClient) -> anyhow::Result<()> {
    let reply = expect_ok(client.get("/status").await?)?;

    println!("Control server: {} (running)", config.control_addr());
    println!("Settings:       {}", config.settings_path().display());
    match reply.body.get("printer").and_then(Value::as_str) {
        Some(printer) => println!("Printer:        {printer}"),
        None => println!("Printer:        unknown"),
    }
    Ok(())
}

async fn remote_select(client: &ControlClient, endpoint: PrinterEndpoint) -> anyhow::Result<()> {
    let body = json!({ "ip": endpoint.ip, "port": endpoint.port }).to_string();
    expect_ok(client.post("/printer", &body).await?)?;
    println!("Active printer: {endpoint} (applied to running server)");
    Ok(())
}

async fn remote_scan(client: &ControlClient, select: Option<Ipv4Addr>) -> anyhow::Result<()> {
    let started = expect_ok(client.post("/scan", "").await?)?;
    if started.body.get("started").and_then(Value::as_bool) != Some(true) {
        bail!("A scan is already running");
    }

    let mut stop_requested = false;
    let report = loop {
        let report = expect_ok(client.get("/scan").await?)?;
        let progress = report.body.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
        eprint!("\rScanning... {:>3.0}%", progress * 100.0);
        if report.body.get("scanning").and_then(Value::as_bool) != Some(true) {
            break report;
        }

        tokio::select! {
            _ = tokio::time::sleep(SCAN_POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c(), if !stop_requested => {
                stop_requested = true;
                expect_ok(client.post("/scan/stop", "").await?)?;
            }
        }
    };
    eprintln!();

    let found: Vec<(Ipv4Addr, u16, u64)> = report
        .body
        .get("printers")
        .and_then(Value::as_array)
        .map(|printers| {
            printers
                .iter()
                .filter_map(|printer| {
                    let ip = printer.get("ip")?.as_str()?.parse().ok()?;
                    let port = u16::try_from(printer.get("port")?.as_u64()?).ok()?;
                    let latency = printer.get("latencyMs").and_then(Value::as_u64).unwrap_or(0);
                    Some((ip, port, latency))
                })
                .collect()
        })
        .unwrap_or_default();

    for (ip, port, latency) in &found {
        println!("{ip}:{port}  {latency} ms");
    }
    if found.is_empty() {
        println!("No printers found");
    }

    if let Some(ip) = select {
        let Some(&(ip, port, _)) = found.iter().find(|(found_ip, _, _)| *found_ip == ip) else {
            bail!("{ip} was not found by the scan");
        };
        remote_select(client, PrinterEndpoint::new(ip, port)).await?;
    }
    Ok(())
}

fn expect_ok(reply: ClientReply) -> anyhow::Result<ClientReply> {
    if reply.is_success() {
        return Ok(reply);
    }
    match reply.error() {
        Some(message) => bail!("Control server answered {}: {message}", reply.status),
        None => bail!("Control server answered {}", reply.status),
    }
}

async fn run_bridge(state: ServerState) -> anyhow::Result<()> {
    let shutdown = shutdown_on_ctrl_c();
    let (handle, worker) = bridge::channel(state, 32);
    tokio::spawn(worker.run(shutdown.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = JoinSet::new();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: BridgeRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid bridge request");
                emit(&BridgeResponse {
                    request_id: String::new(),
                    success: false,
                    data: json!({ "error": "Invalid request" }),
                });
                continue;
            }
        };

        let handle = handle.clone();
        pending.spawn(async move {
            match handle.call(request).await {
                Ok(response) => emit(&response),
                Err(e) => tracing::error!(error = %e, "Bridge call failed"),
            }
        });
    }

    // Answer what is already in flight before exiting
    while pending.join_next().await.is_some() {}
    Ok(())
}

fn emit(response: &BridgeResponse) {
    match serde_json::to_string(response) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "Failed to encode bridge response"),
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received");
            trigger.cancel();
        }
    });
    token
}
