//! Host process controller.
//!
//! [`AdbController`] owns every adb subprocess the backend starts: the single
//! long-running logcat stream, the bounded one-shot commands and the device
//! poll. Asynchronous outcomes are published on its [`EventBus`].

use crate::config::{AdbConfig, ControllerConfig};
use crate::devices::{parse_devices, Device, DeviceInfo};
use crate::error::{BridgeError, Result};
use crate::events::{BridgeEvent, EventBus};
use crate::platform::{self, TerminationStrategy};
use crate::process::supervisor::{self, lock, SupervisorContext};
use crate::process::{
    normalize_command, CommandOutput, CommandRunner, LogcatOptions, LogcatSlot, SystemRunner,
    Teardown,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const NOT_FOUND_MESSAGE: &str = "ADB command not found. Please check ADB installation.";
const DISCONNECTED_MESSAGE: &str = "Device disconnected - stopping logcat";

/// A discovered adb executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdbInstallation {
    pub path: PathBuf,
    /// First line of `adb version`.
    pub version: String,
}

/// Result of a one-shot device listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceList {
    pub devices: Vec<Device>,
    pub raw: String,
}

/// Snapshot of the controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub adb_path: Option<PathBuf>,
    pub adb_version: Option<String>,
    pub platform: &'static str,
}

/// Supervises the adb executable on behalf of the bridge.
pub struct AdbController {
    config: ControllerConfig,
    runner: Arc<dyn CommandRunner>,
    events: EventBus,
    termination: TerminationStrategy,
    installation: Mutex<Option<AdbInstallation>>,
    slot: LogcatSlot,
    generation: AtomicU64,
}

impl AdbController {
    /// Create a controller that runs real subprocesses.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Create a controller with a custom one-shot command runner.
    ///
    /// The logcat stream is always a real subprocess.
    pub fn with_runner(config: ControllerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let termination = TerminationStrategy::detect(config.stop_grace);
        debug!("Controller using termination strategy {:?}", termination);
        Self {
            config,
            runner,
            events: EventBus::default(),
            termination,
            installation: Mutex::new(None),
            slot: LogcatSlot::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The executable found by the last successful discovery.
    pub fn installation(&self) -> Option<AdbInstallation> {
        lock(&self.installation).clone()
    }

    /// Path every adb command is run with.
    ///
    /// The discovered executable when there is one, otherwise the configured
    /// override, otherwise the bare tool name resolved through the search path.
    pub fn adb_path(&self) -> PathBuf {
        if let Some(installation) = lock(&self.installation).as_ref() {
            return installation.path.clone();
        }
        self.config
            .adb_override
            .clone()
            .unwrap_or_else(|| PathBuf::from(AdbConfig::TOOL_NAME))
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Start streaming `adb logcat`.
    ///
    /// Returns as soon as the child is spawned, with its pid. Output, errors
    /// and the final exit code arrive as events.
    pub fn start_logcat(&self, options: &LogcatOptions) -> Result<Option<u32>> {
        let mut slot = lock(&self.slot);
        if let Some(active) = slot.as_ref() {
            warn!("Logcat already running (pid {:?})", active.pid);
            return Err(BridgeError::AlreadyRunning);
        }

        let program = self.adb_path();
        let args = options.to_args();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = SupervisorContext {
            generation,
            slot: self.slot.clone(),
            events: self.events.clone(),
            termination: self.termination,
        };

        match supervisor::spawn_logcat(&program, &args, ctx) {
            Ok(active) => {
                let pid = active.pid;
                *slot = Some(active);
                Ok(pid)
            }
            Err(e) => {
                let message = if e.kind() == std::io::ErrorKind::NotFound {
                    NOT_FOUND_MESSAGE.to_string()
                } else {
                    format!("Failed to start logcat: {}", e)
                };
                warn!("Could not spawn {}: {}", program.display(), e);
                self.events.publish(BridgeEvent::LogcatError(message.clone()));
                Err(BridgeError::execution(message))
            }
        }
    }

    /// Stop the logcat stream.
    ///
    /// The handle is released immediately; the child is terminated in the
    /// background and `logcat-closed` follows once its exit is observed.
    pub fn stop_logcat(&self) -> Result<()> {
        let active = lock(&self.slot).take().ok_or(BridgeError::NotRunning)?;
        info!("Stopping logcat (pid {:?})", active.pid);
        active.request_stop(Teardown::UserStop);
        Ok(())
    }

    /// Run adb once with `args`, failing on a non-zero exit.
    pub async fn run_one_shot(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let program = self.adb_path();
        self.runner
            .run(&program, args, timeout)
            .await?
            .into_result(&program)
    }

    /// Probe the candidate locations in order and cache the first working one.
    pub async fn discover_executable(&self) -> Result<AdbInstallation> {
        let candidates = self.config.discovery_candidates();
        let args = [AdbConfig::VERSION_ARG.to_string()];

        for candidate in &candidates {
            match self
                .runner
                .run(candidate, &args, self.config.probe_timeout)
                .await
            {
                Ok(output) if output.success() => {
                    let installation = AdbInstallation {
                        path: candidate.clone(),
                        version: output.stdout.lines().next().unwrap_or("").trim().to_string(),
                    };
                    info!(
                        "Found adb at {} ({})",
                        installation.path.display(),
                        installation.version
                    );
                    *lock(&self.installation) = Some(installation.clone());
                    return Ok(installation);
                }
                Ok(output) => debug!(
                    "Probe of {} exited with {:?}",
                    candidate.display(),
                    output.code
                ),
                Err(e) => debug!("Probe of {} failed: {}", candidate.display(), e),
            }
        }

        *lock(&self.installation) = None;
        Err(BridgeError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        })
    }

    /// One device poll cycle.
    ///
    /// Publishes `device-status-changed` with the ready devices, empty lists
    /// included. With no devices left an active logcat is torn down and its
    /// close reported with the disconnect exit code.
    pub async fn poll_devices(&self) -> Vec<Device> {
        let devices = match self
            .run_one_shot(&["devices".to_string()], self.config.poll_timeout)
            .await
        {
            Ok(output) => parse_devices(&output.stdout),
            Err(e) => {
                debug!("Device poll failed: {}", e);
                Vec::new()
            }
        };

        self.events
            .publish(BridgeEvent::DeviceStatusChanged(devices.clone()));

        if devices.is_empty() {
            let active = lock(&self.slot).take();
            if let Some(active) = active {
                info!("No devices attached, stopping logcat (pid {:?})", active.pid);
                active.request_stop(Teardown::DeviceLost);
                self.events
                    .publish(BridgeEvent::LogcatError(DISCONNECTED_MESSAGE.to_string()));
                self.events.publish(BridgeEvent::LogcatClosed(Some(
                    AdbConfig::DISCONNECT_EXIT_CODE,
                )));
            }
        }

        devices
    }

    /// List devices on request.
    pub async fn check_devices(&self) -> Result<DeviceList> {
        let output = self
            .run_one_shot(&["devices".to_string()], self.config.command_timeout)
            .await?;
        Ok(DeviceList {
            devices: parse_devices(&output.stdout),
            raw: output.stdout,
        })
    }

    /// Model, manufacturer and Android version of a device.
    ///
    /// Targets `device_id` when given, otherwise the only attached device.
    pub async fn device_info(&self, device_id: Option<&str>) -> DeviceInfo {
        let (model, manufacturer, android_version) = futures::join!(
            self.getprop(device_id, AdbConfig::PROP_MODEL),
            self.getprop(device_id, AdbConfig::PROP_MANUFACTURER),
            self.getprop(device_id, AdbConfig::PROP_ANDROID_VERSION),
        );
        DeviceInfo {
            model,
            manufacturer,
            android_version,
        }
    }

    async fn getprop(&self, device_id: Option<&str>, property: &str) -> String {
        let mut args = Vec::with_capacity(5);
        if let Some(id) = device_id {
            args.push("-s".to_string());
            args.push(id.to_string());
        }
        args.extend(["shell", "getprop", property].map(String::from));

        match self.run_one_shot(&args, self.config.command_timeout).await {
            Ok(output) => output.stdout.trim().to_string(),
            Err(e) => {
                debug!("getprop {} failed: {}", property, e);
                DeviceInfo::UNKNOWN.to_string()
            }
        }
    }

    /// Run a user-typed adb command line.
    pub async fn execute_command(&self, command_line: &str) -> Result<CommandOutput> {
        let args = normalize_command(command_line, &self.adb_path())?;
        debug!("Executing adb {:?}", args);
        self.run_one_shot(&args, self.config.command_timeout).await
    }

    pub fn status(&self) -> ControllerStatus {
        let (running, pid) = match lock(&self.slot).as_ref() {
            Some(active) => (true, active.pid),
            None => (false, None),
        };
        let installation = self.installation();
        ControllerStatus {
            running,
            pid,
            adb_path: installation.as_ref().map(|i| i.path.clone()),
            adb_version: installation.map(|i| i.version),
            platform: platform::current_platform(),
        }
    }

    /// Tear down any active stream without reporting further events.
    pub fn shutdown(&self) {
        if let Some(active) = lock(&self.slot).take() {
            info!("Shutting down logcat (pid {:?})", active.pid);
            active.request_stop(Teardown::Shutdown);
        }
    }
}

impl std::fmt::Debug for AdbController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdbController")
            .field("config", &self.config)
            .field("termination", &self.termination)
            .field("status", &self.status())
            .finish()
    }
}
