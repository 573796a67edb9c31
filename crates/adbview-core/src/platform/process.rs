//! Platform-specific process termination.
//!
//! The strategy is picked once when the controller is built and then applied
//! to every child it tears down.

use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

/// How a supervised child is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStrategy {
    /// SIGTERM, then SIGKILL once `grace` has passed without an exit.
    Signal { grace: Duration },
    /// Kill the whole process tree at once with `taskkill /t /f`.
    ProcessTree,
}

impl TerminationStrategy {
    /// Select the strategy for the current platform.
    ///
    /// # Platform Behavior
    /// - **Linux/macOS**: [`TerminationStrategy::Signal`]
    /// - **Windows**: [`TerminationStrategy::ProcessTree`]
    pub fn detect(grace: Duration) -> Self {
        if cfg!(unix) {
            TerminationStrategy::Signal { grace }
        } else {
            TerminationStrategy::ProcessTree
        }
    }

    /// Stop `child` and reap it. Returns the exit status when one was observed.
    pub async fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        let Some(pid) = child.id() else {
            // Already reaped.
            return child.wait().await.ok();
        };

        match *self {
            TerminationStrategy::Signal { grace } => {
                if send_sigterm(pid) {
                    match tokio::time::timeout(grace, child.wait()).await {
                        Ok(status) => {
                            debug!("Process {} terminated gracefully", pid);
                            return status.ok();
                        }
                        Err(_) => {
                            debug!("Process {} still running after {:?}, killing", pid, grace);
                        }
                    }
                }
                force_kill(child, pid).await
            }
            TerminationStrategy::ProcessTree => {
                kill_tree(pid).await;
                force_kill(child, pid).await
            }
        }
    }
}

async fn force_kill(child: &mut Child, pid: u32) -> Option<ExitStatus> {
    if let Err(e) = child.start_kill() {
        debug!("Kill of process {} failed: {}", pid, e);
    }
    child.wait().await.ok()
}

/// Send SIGTERM. Returns false when the signal could not be delivered.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    debug!("Sending SIGTERM to process {}", pid);
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(e) => {
            warn!("Failed to send SIGTERM to {}: {}", pid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> bool {
    false
}

/// Kill a process and its descendants with `taskkill`.
async fn kill_tree(pid: u32) {
    debug!("Terminating process tree {} with taskkill", pid);

    let result = tokio::process::Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t", "/f"])
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            debug!("Process tree {} terminated", pid);
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // "not found" is fine, the process is already gone
            if !stderr.contains("not found") {
                warn!("taskkill failed for {}: {}", pid, stderr.trim());
            }
        }
        Err(e) => warn!("Failed to run taskkill: {}", e),
    }
}
