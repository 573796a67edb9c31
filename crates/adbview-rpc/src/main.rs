//! adbview RPC Server - JSON-RPC backend for the log viewer shell.
//!
//! This binary discovers adb, starts the device monitor and serves the bridge
//! over HTTP for the Electron main process.

use adbview_core::platform::default_save_dir;
use adbview_core::{
    AdbConfig, AdbController, Bridge, ControllerConfig, DeviceMonitor, DirectoryPrompt, LogSaver,
    MonitorConfig,
};
use adbview_rpc::{start_server, AppState};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "adbview-rpc")]
#[command(about = "JSON-RPC server supervising adb for the adbview log viewer")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// adb executable to try before the usual locations
    #[arg(long)]
    adb_path: Option<PathBuf>,

    /// Directory saved logs are written to (defaults to the download directory)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Seconds a user-typed adb command may run before it is killed
    #[arg(long, default_value_t = AdbConfig::COMMAND_TIMEOUT.as_secs())]
    command_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting adbview RPC Server");

    let mut config = ControllerConfig::default()
        .with_command_timeout(Duration::from_secs(args.command_timeout));
    if let Some(path) = args.adb_path {
        config = config.with_adb_override(path);
    }
    let controller = Arc::new(AdbController::new(config));

    match controller.discover_executable().await {
        Ok(installation) => info!(
            "Using adb at {} ({})",
            installation.path.display(),
            installation.version
        ),
        Err(e) => warn!("{}", e),
    }

    let prompt = DirectoryPrompt::new(args.save_dir.unwrap_or_else(default_save_dir));
    info!("Saving logs to {}", prompt.dir().display());
    let saver = LogSaver::new(Arc::new(prompt));

    let monitor = DeviceMonitor::spawn(controller.clone(), MonitorConfig::POLL_INTERVAL);

    let state = AppState {
        bridge: Bridge::new(controller.clone(), saver),
    };
    let addr = start_server(state, &args.host, args.port).await?;

    // Print port for Electron to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    monitor.stop().await;
    controller.shutdown();

    Ok(())
}
