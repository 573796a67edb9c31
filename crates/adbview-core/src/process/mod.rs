//! Subprocess handling for the adb executable.
//!
//! - `runner` - bounded one-shot commands behind the [`CommandRunner`] seam
//! - `logcat` - logcat arguments and user command-line normalization
//! - `supervisor` - the single long-running logcat child and its readers

pub mod logcat;
pub mod runner;
pub mod supervisor;

pub use logcat::{normalize_command, split_command_line, LogcatOptions};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use supervisor::{ActiveLogcat, LogcatSlot, Teardown, CONNECTION_LOST_MESSAGE};
