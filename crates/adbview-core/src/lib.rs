//! adbview core - headless supervisor for the Android Debug Bridge.
//!
//! This crate owns every `adb` subprocess a log viewer needs: one long-running
//! `adb logcat` stream, short one-shot commands, and a periodic device poll.
//! A presentation surface talks to it only through the [`Bridge`] allowlist
//! and receives output as [`BridgeEvent`]s. The JSON-RPC transport lives in
//! the `adbview-rpc` crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use adbview_core::{AdbController, ControllerConfig, EventName, LogcatOptions};
//!
//! #[tokio::main]
//! async fn main() -> adbview_core::Result<()> {
//!     let controller = AdbController::new(ControllerConfig::default());
//!     controller.discover_executable().await?;
//!
//!     let mut output = controller.events().subscribe(&[EventName::LogcatData]);
//!     controller.start_logcat(&LogcatOptions::default())?;
//!
//!     while let Some(event) = output.recv().await {
//!         println!("{}", event.payload());
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod events;
pub mod monitor;
pub mod platform;
pub mod process;
pub mod saver;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeRequest, BridgeResponse};
pub use cancel::CancellationToken;
pub use config::{AdbConfig, ControllerConfig, MonitorConfig};
pub use controller::{AdbController, AdbInstallation, ControllerStatus, DeviceList};
pub use devices::{parse_devices, Device, DeviceInfo, DeviceState};
pub use error::{BridgeError, Result};
pub use events::{BridgeEvent, EventBus, EventName, Subscription};
pub use monitor::DeviceMonitor;
pub use process::{CommandOutput, CommandRunner, LogcatOptions, SystemRunner};
pub use saver::{DirectoryPrompt, LogSaver, SavePrompt};
