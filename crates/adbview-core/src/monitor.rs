//! Background device poll.

use crate::cancel::CancellationToken;
use crate::controller::AdbController;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodically runs [`AdbController::poll_devices`].
///
/// Cycles are skipped until an executable has been discovered. Poll failures
/// never surface beyond a debug log; the controller treats them as an empty
/// device list.
#[derive(Debug)]
pub struct DeviceMonitor {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl DeviceMonitor {
    pub fn spawn(controller: Arc<AdbController>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(controller, interval, token.clone()));
        info!("Device monitor started ({:?} interval)", interval);
        Self { token, task }
    }

    /// Cancel the loop and wait for an in-flight poll to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            debug!("Device monitor task ended abnormally: {}", e);
        }
        info!("Device monitor stopped");
    }
}

async fn run(controller: Arc<AdbController>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if token.is_cancelled() {
            break;
        }

        if controller.installation().is_none() {
            debug!("Skipping device poll, adb not discovered");
            continue;
        }

        let devices = controller.poll_devices().await;
        debug!("Device poll found {} device(s)", devices.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::error::Result;
    use crate::events::{BridgeEvent, EventName};
    use crate::process::{CommandOutput, CommandRunner};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct AlwaysOk(&'static str);

    #[async_trait]
    impl CommandRunner for AlwaysOk {
        async fn run(&self, _: &Path, _: &[String], _: Duration) -> Result<CommandOutput> {
            Ok(CommandOutput {
                code: Some(0),
                stdout: self.0.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn controller(stdout: &'static str) -> Arc<AdbController> {
        let config = ControllerConfig::default().with_search_paths(vec![PathBuf::from("adb")]);
        Arc::new(AdbController::with_runner(config, Arc::new(AlwaysOk(stdout))))
    }

    #[tokio::test]
    async fn test_monitor_idle_until_discovery() {
        let controller = controller("List of devices attached\n");
        let mut sub = controller.events().subscribe(&[EventName::DeviceStatusChanged]);

        let monitor = DeviceMonitor::spawn(controller.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sub.try_recv(), None);

        controller.discover_executable().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(BridgeEvent::DeviceStatusChanged(Vec::new())));

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_polling() {
        let controller = controller("List of devices attached\nABC\tdevice\n");
        controller.discover_executable().await.unwrap();
        let mut sub = controller.events().subscribe_all();

        let monitor = DeviceMonitor::spawn(controller.clone(), Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), monitor.stop())
            .await
            .expect("stop should not wait for the next tick");

        while sub.try_recv().is_some() {}
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sub.try_recv(), None);
    }
}
