//! Basic usage example - stream logcat from the attached device to stdout

use adbview_core::{AdbController, BridgeEvent, ControllerConfig, LogcatOptions, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional tag filter from args, e.g. `ActivityManager`
    let filter = std::env::args().nth(1);

    let controller = AdbController::new(ControllerConfig::default());
    let adb = controller.discover_executable().await?;
    println!("Using {} ({})", adb.path.display(), adb.version);

    let devices = controller.check_devices().await?;
    if devices.devices.is_empty() {
        println!("No devices attached.");
        return Ok(());
    }
    for device in &devices.devices {
        let info = controller.device_info(Some(&device.id)).await;
        println!(
            "  - {} {} {} (Android {})",
            device.id, info.manufacturer, info.model, info.android_version
        );
    }

    let mut events = controller.events().subscribe_all();
    controller.start_logcat(&LogcatOptions {
        filter,
        format: Some("threadtime".to_string()),
        ..Default::default()
    })?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.stop_logcat()?;
            }
            event = events.recv() => match event {
                Some(BridgeEvent::LogcatData(chunk)) => print!("{}", chunk),
                Some(BridgeEvent::LogcatError(message)) => eprint!("{}", message),
                Some(BridgeEvent::LogcatClosed(code)) => {
                    println!("\nlogcat exited ({:?})", code);
                    break;
                }
                Some(BridgeEvent::DeviceStatusChanged(_)) => {}
                None => break,
            },
        }
    }

    Ok(())
}
