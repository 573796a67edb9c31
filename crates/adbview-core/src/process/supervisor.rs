//! Supervision of the long-running logcat child.
//!
//! One task per child owns the `Child`, waits for it to exit or for a stop
//! request, and publishes the stream events. Two reader tasks forward stdout
//! and stderr chunks as they arrive.

use crate::config::EventConfig;
use crate::events::{BridgeEvent, EventBus};
use crate::platform::TerminationStrategy;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Message published when logcat exits on its own with a failure status.
pub const CONNECTION_LOST_MESSAGE: &str = "Device may have disconnected or ADB connection lost";

/// Why the controller is tearing a stream down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// `stop-logcat`; the supervisor reports the real exit code once observed.
    UserStop,
    /// Every device went away; the controller already reported the close.
    DeviceLost,
    /// Host shutdown; nothing further is reported.
    Shutdown,
}

/// The managed process handle. At most one lives in the controller's slot.
#[derive(Debug)]
pub struct ActiveLogcat {
    pub pid: Option<u32>,
    pub generation: u64,
    muted: Arc<AtomicBool>,
    stop_tx: oneshot::Sender<Teardown>,
}

impl ActiveLogcat {
    /// Silence further output and ask the supervisor to terminate the child.
    /// Does not wait for the exit.
    pub fn request_stop(self, reason: Teardown) {
        self.muted.store(true, Ordering::SeqCst);
        if self.stop_tx.send(reason).is_err() {
            debug!("Logcat generation {} already exited", self.generation);
        }
    }
}

pub type LogcatSlot = Arc<Mutex<Option<ActiveLogcat>>>;

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a supervisor needs besides the child itself.
pub(crate) struct SupervisorContext {
    pub generation: u64,
    pub slot: LogcatSlot,
    pub events: EventBus,
    pub termination: TerminationStrategy,
}

/// Spawn `program args` with piped output and start supervising it.
///
/// The caller is expected to hold the slot lock and store the returned
/// handle before releasing it.
pub(crate) fn spawn_logcat(
    program: &Path,
    args: &[String],
    ctx: SupervisorContext,
) -> std::io::Result<ActiveLogcat> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let pid = child.id();
    let generation = ctx.generation;
    let muted = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = oneshot::channel();

    let stdout = child.stdout.take().map(|out| {
        spawn_pump(out, ctx.events.clone(), muted.clone(), BridgeEvent::LogcatData)
    });
    let stderr = child.stderr.take().map(|err| {
        spawn_pump(err, ctx.events.clone(), muted.clone(), BridgeEvent::LogcatError)
    });

    info!(
        "Started logcat (pid {:?}, generation {}): {} {:?}",
        pid,
        generation,
        program.display(),
        args
    );

    tokio::spawn(supervise(child, [stdout, stderr], stop_rx, ctx));

    Ok(ActiveLogcat {
        pid,
        generation,
        muted,
        stop_tx,
    })
}

async fn supervise(
    mut child: Child,
    readers: [Option<JoinHandle<()>>; 2],
    mut stop_rx: oneshot::Receiver<Teardown>,
    ctx: SupervisorContext,
) {
    let (status, teardown): (Option<ExitStatus>, Option<Teardown>) = tokio::select! {
        status = child.wait() => (status.ok(), None),
        reason = &mut stop_rx => {
            // A dropped sender means the controller itself went away.
            let reason = reason.unwrap_or(Teardown::Shutdown);
            debug!("Stopping logcat generation {} ({:?})", ctx.generation, reason);
            (ctx.termination.terminate(&mut child).await, Some(reason))
        }
    };

    let code = status.and_then(|s| s.code());

    let teardown = match teardown {
        Some(reason) => {
            for reader in readers.iter().flatten() {
                reader.abort();
            }
            Some(reason)
        }
        None => {
            // Output still in the pipes belongs before the close.
            for reader in readers.into_iter().flatten() {
                let _ = reader.await;
            }

            let owned = {
                let mut slot = lock(&ctx.slot);
                let owned = slot.as_ref().is_some_and(|a| a.generation == ctx.generation);
                if owned {
                    *slot = None;
                }
                owned
            };
            if owned {
                None
            } else {
                // The handle was taken by a stop that raced with the exit;
                // its request is already on the way.
                Some(stop_rx.await.unwrap_or(Teardown::Shutdown))
            }
        }
    };

    match teardown {
        None => {
            info!("Logcat exited with code {:?}", code);
            if code != Some(0) {
                ctx.events
                    .publish(BridgeEvent::LogcatError(CONNECTION_LOST_MESSAGE.to_string()));
            }
            ctx.events.publish(BridgeEvent::LogcatClosed(code));
        }
        Some(reason) => {
            info!("Logcat stopped ({:?}), exit code {:?}", reason, code);
            if reason == Teardown::UserStop {
                ctx.events.publish(BridgeEvent::LogcatClosed(code));
            }
        }
    }
}

fn spawn_pump<R>(
    reader: R,
    events: EventBus,
    muted: Arc<AtomicBool>,
    wrap: fn(String) -> BridgeEvent,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump(reader, events, muted, wrap))
}

async fn pump<R>(mut reader: R, events: EventBus, muted: Arc<AtomicBool>, wrap: fn(String) -> BridgeEvent)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; EventConfig::READ_CHUNK_SIZE];
    let mut decoder = Utf8Chunker::default();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let Some(text) = decoder.push(&buf[..n]) else {
                    continue;
                };
                if !muted.load(Ordering::SeqCst) {
                    events.publish(wrap(text));
                }
            }
            Err(e) => {
                warn!("Logcat pipe read failed: {}", e);
                break;
            }
        }
    }

    if let Some(rest) = decoder.finish() {
        if !muted.load(Ordering::SeqCst) {
            events.publish(wrap(rest));
        }
    }
}

/// Decodes a byte stream into text chunks without splitting a multi-byte
/// character across two chunks.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep decoding.
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end: hold it for the next read.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        (!text.is_empty()).then_some(text)
    }

    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| String::from_utf8_lossy(&self.pending).into_owned())
    }
}
