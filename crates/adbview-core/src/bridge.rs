//! The contract between the presentation surface and the controller.
//!
//! Only the requests in [`BridgeRequest`] can reach the controller, and only
//! the events in [`crate::events::EventName`] flow back. Every outcome of a
//! request is a [`BridgeResponse`]; failures never escape as errors.

use crate::controller::AdbController;
use crate::error::{BridgeError, Result};
use crate::process::LogcatOptions;
use crate::saver::LogSaver;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// A request the surface may issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    CheckDevices,
    GetDeviceInfo { device_id: Option<String> },
    StartLogcat(LogcatOptions),
    StopLogcat,
    ExecuteAdbCommand { command: String },
    SaveLog { content: String, filename: String },
    CheckAdb,
}

impl BridgeRequest {
    /// Wire names of every allowed request.
    pub const METHODS: [&'static str; 7] = [
        "check-devices",
        "get-device-info",
        "start-logcat",
        "stop-logcat",
        "execute-adb-command",
        "save-log",
        "check-adb",
    ];

    pub fn method(&self) -> &'static str {
        match self {
            BridgeRequest::CheckDevices => "check-devices",
            BridgeRequest::GetDeviceInfo { .. } => "get-device-info",
            BridgeRequest::StartLogcat(_) => "start-logcat",
            BridgeRequest::StopLogcat => "stop-logcat",
            BridgeRequest::ExecuteAdbCommand { .. } => "execute-adb-command",
            BridgeRequest::SaveLog { .. } => "save-log",
            BridgeRequest::CheckAdb => "check-adb",
        }
    }

    /// Parse a named call.
    ///
    /// `method` may use dashes or underscores. `params` is either an object
    /// (snake_case or camelCase keys) or an array of positional arguments in
    /// the order the surface passes them.
    pub fn from_call(method: &str, params: &Value) -> Result<Self> {
        let normalized = method.replace('_', "-");
        let request = match normalized.as_str() {
            "check-devices" => BridgeRequest::CheckDevices,
            "get-device-info" => BridgeRequest::GetDeviceInfo {
                device_id: get_str_arg(params, 0, "device_id", "deviceId")
                    .filter(|id| !id.is_empty())
                    .map(String::from),
            },
            "start-logcat" => BridgeRequest::StartLogcat(logcat_options(params)?),
            "stop-logcat" => BridgeRequest::StopLogcat,
            "execute-adb-command" => BridgeRequest::ExecuteAdbCommand {
                command: require_str_arg(params, 0, "command", "command")?,
            },
            "save-log" => BridgeRequest::SaveLog {
                content: require_str_arg(params, 0, "content", "content")?,
                filename: get_str_arg(params, 1, "filename", "fileName")
                    .unwrap_or_default()
                    .to_string(),
            },
            "check-adb" => BridgeRequest::CheckAdb,
            _ => return Err(BridgeError::UnknownMethod(method.to_string())),
        };
        Ok(request)
    }
}

/// Positional argument `index`, or a named field of an object.
fn get_arg<'a>(params: &'a Value, index: usize, snake: &str, camel: &str) -> Option<&'a Value> {
    match params {
        Value::Array(items) => items.get(index),
        Value::Object(_) => params.get(snake).or_else(|| params.get(camel)),
        _ => None,
    }
}

fn get_str_arg<'a>(params: &'a Value, index: usize, snake: &str, camel: &str) -> Option<&'a str> {
    get_arg(params, index, snake, camel).and_then(Value::as_str)
}

fn require_str_arg(params: &Value, index: usize, snake: &str, camel: &str) -> Result<String> {
    get_str_arg(params, index, snake, camel)
        .map(String::from)
        .ok_or_else(|| BridgeError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

fn logcat_options(params: &Value) -> Result<LogcatOptions> {
    let options = match params {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::Object(map) => map.get("options").cloned().unwrap_or_else(|| params.clone()),
        _ => Value::Null,
    };
    if options.is_null() {
        return Ok(LogcatOptions::default());
    }
    serde_json::from_value(options).map_err(|e| BridgeError::InvalidParams {
        message: format!("Invalid logcat options: {}", e),
    })
}

/// `{success, error?, ...payload}` record returned for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl BridgeResponse {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            error: None,
            payload: into_map(payload),
        }
    }

    /// Failure record carrying the error message and any detail the error holds.
    pub fn failure(err: &BridgeError) -> Self {
        let mut payload = Map::new();
        match err {
            BridgeError::Execution {
                stderr: Some(stderr),
                ..
            } => {
                payload.insert("stderr".into(), json!(stderr));
            }
            BridgeError::NotFound { searched } => {
                payload.insert("searchedPaths".into(), json!(searched));
            }
            _ => {}
        }
        Self {
            success: false,
            error: Some(err.to_string()),
            payload,
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({"success": self.success}))
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".into(), other);
            map
        }
    }
}

/// Forwards each allowed request to exactly one controller operation.
#[derive(Debug, Clone)]
pub struct Bridge {
    controller: Arc<AdbController>,
    saver: LogSaver,
}

impl Bridge {
    pub fn new(controller: Arc<AdbController>, saver: LogSaver) -> Self {
        Self { controller, saver }
    }

    pub fn controller(&self) -> &Arc<AdbController> {
        &self.controller
    }

    /// Parse and handle a named call.
    ///
    /// Only a call that is not an allowed request, or whose parameters cannot
    /// be read, is an `Err`.
    pub async fn call(&self, method: &str, params: &Value) -> Result<BridgeResponse> {
        let request = BridgeRequest::from_call(method, params)?;
        Ok(self.handle(request).await)
    }

    pub async fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        let method = request.method();
        debug!("Bridge request {}", method);
        let is_check_adb = matches!(request, BridgeRequest::CheckAdb);

        match self.dispatch(request).await {
            Ok(payload) => BridgeResponse::ok(payload),
            Err(e) => {
                warn!("{} failed: {}", method, e);
                let response = BridgeResponse::failure(&e);
                if is_check_adb {
                    response.with("available", json!(false))
                } else {
                    response
                }
            }
        }
    }

    async fn dispatch(&self, request: BridgeRequest) -> Result<Value> {
        let controller = &self.controller;
        match request {
            BridgeRequest::CheckDevices => {
                let list = controller.check_devices().await?;
                Ok(json!({"devices": list.devices, "raw": list.raw}))
            }
            BridgeRequest::GetDeviceInfo { device_id } => {
                let info = controller.device_info(device_id.as_deref()).await;
                Ok(serde_json::to_value(info)?)
            }
            BridgeRequest::StartLogcat(options) => {
                let pid = controller.start_logcat(&options)?;
                Ok(json!({"pid": pid}))
            }
            BridgeRequest::StopLogcat => {
                controller.stop_logcat()?;
                Ok(Value::Null)
            }
            BridgeRequest::ExecuteAdbCommand { command } => {
                let output = controller.execute_command(&command).await?;
                Ok(json!({"stdout": output.stdout, "stderr": output.stderr}))
            }
            BridgeRequest::SaveLog { content, filename } => {
                let path = self.saver.save(&content, &filename).await?;
                Ok(json!({"path": path.to_string_lossy()}))
            }
            BridgeRequest::CheckAdb => {
                let installation = controller.discover_executable().await?;
                Ok(json!({
                    "available": true,
                    "version": installation.version,
                    "path": installation.path.to_string_lossy(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::process::{CommandOutput, CommandRunner};
    use crate::saver::{DirectoryPrompt, SavePrompt};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedRunner {
        code: i32,
        stdout: &'static str,
        stderr: &'static str,
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _: &Path, _: &[String], _: Duration) -> Result<CommandOutput> {
            Ok(CommandOutput {
                code: Some(self.code),
                stdout: self.stdout.to_string(),
                stderr: self.stderr.to_string(),
            })
        }
    }

    struct CancelPrompt;

    #[async_trait]
    impl SavePrompt for CancelPrompt {
        async fn choose_path(&self, _: &str) -> Option<PathBuf> {
            None
        }
    }

    fn bridge(runner: FixedRunner, prompt: Arc<dyn SavePrompt>) -> Bridge {
        let config = ControllerConfig::default()
            .with_search_paths(vec![PathBuf::from("adb"), PathBuf::from("/sdk/adb")]);
        let controller = Arc::new(AdbController::with_runner(config, Arc::new(runner)));
        Bridge::new(controller, LogSaver::new(prompt))
    }

    fn succeeding(stdout: &'static str) -> FixedRunner {
        FixedRunner {
            code: 0,
            stdout,
            stderr: "",
        }
    }

    #[test]
    fn test_parse_named_and_positional_params() {
        assert_eq!(
            BridgeRequest::from_call("get-device-info", &json!({"deviceId": "ABC"})).unwrap(),
            BridgeRequest::GetDeviceInfo {
                device_id: Some("ABC".into())
            }
        );
        assert_eq!(
            BridgeRequest::from_call("get_device_info", &json!(["ABC"])).unwrap(),
            BridgeRequest::GetDeviceInfo {
                device_id: Some("ABC".into())
            }
        );
        assert_eq!(
            BridgeRequest::from_call("save-log", &json!(["text", "out.txt"])).unwrap(),
            BridgeRequest::SaveLog {
                content: "text".into(),
                filename: "out.txt".into()
            }
        );
        assert_eq!(
            BridgeRequest::from_call("execute-adb-command", &json!({"command": "devices"}))
                .unwrap(),
            BridgeRequest::ExecuteAdbCommand {
                command: "devices".into()
            }
        );
    }

    #[test]
    fn test_parse_logcat_options() {
        let expected = LogcatOptions {
            clear: true,
            format: Some("threadtime".into()),
            filter: None,
        };
        for params in [
            json!({"clear": true, "format": "threadtime"}),
            json!({"options": {"clear": true, "format": "threadtime"}}),
            json!([{"clear": true, "format": "threadtime"}]),
        ] {
            assert_eq!(
                BridgeRequest::from_call("start-logcat", &params).unwrap(),
                BridgeRequest::StartLogcat(expected.clone())
            );
        }
        assert_eq!(
            BridgeRequest::from_call("start-logcat", &Value::Null).unwrap(),
            BridgeRequest::StartLogcat(LogcatOptions::default())
        );
        assert!(matches!(
            BridgeRequest::from_call("start-logcat", &json!({"clear": "yes"})),
            Err(BridgeError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_unknown_method_rejected() {
        for method in ["spawn", "eval", "open-external", ""] {
            assert!(matches!(
                BridgeRequest::from_call(method, &json!({})),
                Err(BridgeError::UnknownMethod(_))
            ));
        }
    }

    #[test]
    fn test_every_method_parses() {
        let params = json!({"command": "devices", "content": ""});
        for method in BridgeRequest::METHODS {
            let request = BridgeRequest::from_call(method, &params).unwrap();
            assert_eq!(request.method(), method);
        }
    }

    #[test]
    fn test_missing_command_is_invalid() {
        assert!(matches!(
            BridgeRequest::from_call("execute-adb-command", &json!({})),
            Err(BridgeError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_response_flattens_payload() {
        let value = BridgeResponse::ok(json!({"pid": 42})).to_value();
        assert_eq!(value, json!({"success": true, "pid": 42}));

        let value = BridgeResponse::failure(&BridgeError::NotRunning).to_value();
        assert_eq!(value, json!({"success": false, "error": "Logcat is not running"}));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_failure_record() {
        let bridge = bridge(succeeding(""), Arc::new(CancelPrompt));
        let response = bridge.handle(BridgeRequest::StopLogcat).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Logcat is not running"));
    }

    #[tokio::test]
    async fn test_execute_failure_carries_stderr() {
        let runner = FixedRunner {
            code: 1,
            stdout: "",
            stderr: "error: no devices/emulators found",
        };
        let bridge = bridge(runner, Arc::new(CancelPrompt));

        let response = bridge
            .call("execute-adb-command", &json!({"command": "adb shell ls"}))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(
            response.payload.get("stderr"),
            Some(&json!("error: no devices/emulators found"))
        );
    }

    #[tokio::test]
    async fn test_check_adb_not_found_lists_paths() {
        let runner = FixedRunner {
            code: 127,
            stdout: "",
            stderr: "not found",
        };
        let bridge = bridge(runner, Arc::new(CancelPrompt));

        let value = bridge.handle(BridgeRequest::CheckAdb).await.to_value();

        assert_eq!(value["success"], json!(false));
        assert_eq!(value["available"], json!(false));
        assert_eq!(value["searchedPaths"], json!(["adb", "/sdk/adb"]));
        assert!(value["error"].as_str().unwrap().contains("ADB not found"));
    }

    #[tokio::test]
    async fn test_check_adb_success() {
        let bridge = bridge(
            succeeding("Android Debug Bridge version 1.0.41\n"),
            Arc::new(CancelPrompt),
        );

        let value = bridge.handle(BridgeRequest::CheckAdb).await.to_value();

        assert_eq!(
            value,
            json!({
                "success": true,
                "available": true,
                "version": "Android Debug Bridge version 1.0.41",
                "path": "adb",
            })
        );
    }

    #[tokio::test]
    async fn test_save_log_cancel_and_success() {
        let cancelled = bridge(succeeding(""), Arc::new(CancelPrompt));
        let response = cancelled
            .call("save-log", &json!(["log text", "log.txt"]))
            .await
            .unwrap();
        assert_eq!(
            response.to_value(),
            json!({"success": false, "error": "Save canceled"})
        );

        let temp = TempDir::new().unwrap();
        let saving = bridge(succeeding(""), Arc::new(DirectoryPrompt::new(temp.path())));
        let response = saving
            .call("save-log", &json!({"content": "log text", "filename": "log.txt"}))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("log.txt")).unwrap(),
            "log text"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_log_to_non_utf8_directory() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(OsStr::from_bytes(b"logs\xff"));
        let saving = bridge(succeeding(""), Arc::new(DirectoryPrompt::new(&dir)));

        let response = saving
            .call("save-log", &json!(["text", "a.txt"]))
            .await
            .unwrap();

        assert!(response.success);
        let path = response.payload["path"].as_str().unwrap();
        assert!(path.ends_with("logs\u{fffd}/a.txt"), "{}", path);
        assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "text");
    }

    #[tokio::test]
    async fn test_check_devices_payload() {
        let bridge = bridge(
            succeeding("List of devices attached\nR58M\tdevice\n"),
            Arc::new(CancelPrompt),
        );

        let value = bridge.handle(BridgeRequest::CheckDevices).await.to_value();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["devices"], json!([{"id": "R58M", "status": "device"}]));
        assert_eq!(value["raw"], json!("List of devices attached\nR58M\tdevice\n"));
    }
}
