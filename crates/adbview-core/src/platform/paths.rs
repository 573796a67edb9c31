//! Platform-specific path utilities.
//!
//! This module provides the candidate locations probed when looking for the
//! adb executable, and the default directory saved logs land in.

use crate::config::AdbConfig;
use std::path::{Path, PathBuf};

/// File name of the adb executable on this platform.
///
/// # Platform Behavior
/// - **Linux/macOS**: `adb`
/// - **Windows**: `adb.exe`
pub fn adb_file_name() -> &'static str {
    #[cfg(windows)]
    {
        "adb.exe"
    }
    #[cfg(not(windows))]
    {
        "adb"
    }
}

fn platform_tools(sdk_root: &Path) -> PathBuf {
    sdk_root.join("platform-tools").join(adb_file_name())
}

/// Ordered list of places adb may live.
///
/// The bare tool name comes first so the command search path wins. SDK
/// locations follow, then the directory of the running binary.
///
/// # Platform Behavior
/// - **Linux**: `~/Android/Sdk`
/// - **macOS**: `~/Library/Android/sdk`
/// - **Windows**: `%LOCALAPPDATA%\Android\Sdk` plus the common fixed SDK roots
pub fn adb_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(AdbConfig::TOOL_NAME)];

    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Some(root) = std::env::var_os(var) {
            candidates.push(platform_tools(Path::new(&root)));
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = dirs::home_dir() {
            candidates.push(platform_tools(&home.join("Android").join("Sdk")));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            candidates.push(platform_tools(
                &home.join("Library").join("Android").join("sdk"),
            ));
        }
    }

    #[cfg(target_os = "windows")]
    {
        candidates.push(platform_tools(Path::new(r"C:\Android")));
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(platform_tools(&local.join("Android").join("Sdk")));
        }
        candidates.push(platform_tools(Path::new(
            r"C:\Program Files (x86)\Android\android-sdk",
        )));
        candidates.push(platform_tools(Path::new(r"C:\sdk")));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(adb_file_name()));
    }

    dedup_preserving_order(candidates)
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Directory saved logs go to when no other directory is configured.
///
/// Uses the `dirs` crate: the user's download directory, then home, then the
/// current directory.
pub fn default_save_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_candidate_first() {
        let candidates = adb_candidates();
        assert_eq!(candidates[0], PathBuf::from("adb"));
    }

    #[test]
    fn test_candidates_are_unique() {
        let candidates = adb_candidates();
        let unique: std::collections::HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn test_dedup_preserving_order() {
        let paths = vec![
            PathBuf::from("adb"),
            PathBuf::from("/opt/adb"),
            PathBuf::from("adb"),
        ];
        assert_eq!(
            dedup_preserving_order(paths),
            vec![PathBuf::from("adb"), PathBuf::from("/opt/adb")]
        );
    }
}
