//! Argument construction for logcat and user-typed adb command lines.

use crate::config::AdbConfig;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options accepted by `start-logcat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogcatOptions {
    /// Clear the device log buffer (`-c`).
    pub clear: bool,
    /// Output format passed to `-v`, e.g. `threadtime`.
    pub format: Option<String>,
    /// Tag filter passed to `-s`.
    pub filter: Option<String>,
}

impl LogcatOptions {
    /// Arguments for the adb executable, in fixed order:
    /// `logcat [-c] [-s <filter>] [-v <format>]`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["logcat".to_string()];

        if self.clear {
            args.push("-c".to_string());
        }
        if let Some(filter) = non_empty(&self.filter) {
            args.push("-s".to_string());
            args.push(filter.to_string());
        }
        if let Some(format) = non_empty(&self.format) {
            args.push("-v".to_string());
            args.push(format.to_string());
        }

        args
    }
}

/// The value as given, unless it is blank.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Split a command line into words.
///
/// Whitespace separates words; single or double quotes group text containing
/// whitespace and are removed. No escapes or expansions are interpreted.
pub fn split_command_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(BridgeError::InvalidParams {
            message: "Unterminated quote in command".to_string(),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Turn a user-typed command into arguments for the adb executable.
///
/// A leading `adb` word (any case) or a leading word equal to the resolved
/// executable path is dropped, so `adb shell ls` and `shell ls` run the same.
pub fn normalize_command(line: &str, adb_path: &Path) -> Result<Vec<String>> {
    let mut words = split_command_line(line)?;

    let leading_tool = words.first().is_some_and(|first| {
        first.eq_ignore_ascii_case(AdbConfig::TOOL_NAME) || Path::new(first) == adb_path
    });
    if leading_tool {
        words.remove(0);
    }

    if words.is_empty() {
        return Err(BridgeError::InvalidParams {
            message: "Command is empty".to_string(),
        });
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(clear: bool, filter: &str, format: &str) -> LogcatOptions {
        LogcatOptions {
            clear,
            filter: Some(filter.to_string()),
            format: Some(format.to_string()),
        }
    }

    #[test]
    fn test_default_options() {
        assert_eq!(LogcatOptions::default().to_args(), vec!["logcat"]);
    }

    #[test]
    fn test_all_option_combinations() {
        for clear in [false, true] {
            for filter in ["", "ActivityManager"] {
                for format in ["", "threadtime"] {
                    let args = options(clear, filter, format).to_args();

                    assert_eq!(args[0], "logcat");
                    assert_eq!(args.contains(&"-c".to_string()), clear);
                    assert_eq!(args.contains(&"-s".to_string()), !filter.is_empty());
                    assert_eq!(args.contains(&"-v".to_string()), !format.is_empty());

                    let mut expected = vec!["logcat"];
                    if clear {
                        expected.push("-c");
                    }
                    if !filter.is_empty() {
                        expected.extend(["-s", filter]);
                    }
                    if !format.is_empty() {
                        expected.extend(["-v", format]);
                    }
                    assert_eq!(args, expected);
                }
            }
        }
    }

    #[test]
    fn test_whitespace_only_values_are_omitted() {
        let args = options(false, "   ", "\t").to_args();
        assert_eq!(args, vec!["logcat"]);
    }

    #[test]
    fn test_values_passed_through_untrimmed() {
        let args = options(false, " Tag ", "threadtime").to_args();
        assert_eq!(args, vec!["logcat", "-s", " Tag ", "-v", "threadtime"]);
    }

    #[test]
    fn test_options_deserialize_partial() {
        let opts: LogcatOptions = serde_json::from_str(r#"{"format": "brief"}"#).unwrap();
        assert!(!opts.clear);
        assert_eq!(opts.format.as_deref(), Some("brief"));
        assert_eq!(opts.filter, None);
    }

    #[test]
    fn test_split_quotes() {
        assert_eq!(
            split_command_line(r#"shell "echo hello world" 'a b'"#).unwrap(),
            vec!["shell", "echo hello world", "a b"]
        );
        assert_eq!(split_command_line("  devices  -l ").unwrap(), vec!["devices", "-l"]);
        assert_eq!(split_command_line(r#"shell """#).unwrap(), vec!["shell", ""]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert!(matches!(
            split_command_line("shell \"oops"),
            Err(BridgeError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_normalize_strips_tool_prefix() {
        let adb = Path::new("/sdk/platform-tools/adb");
        assert_eq!(
            normalize_command("adb shell getprop", adb).unwrap(),
            vec!["shell", "getprop"]
        );
        assert_eq!(normalize_command("ADB devices", adb).unwrap(), vec!["devices"]);
        assert_eq!(
            normalize_command("/sdk/platform-tools/adb reboot", adb).unwrap(),
            vec!["reboot"]
        );
        assert_eq!(normalize_command("devices", adb).unwrap(), vec!["devices"]);
        // Only a whole leading word counts as the tool name.
        assert_eq!(normalize_command("adbd", adb).unwrap(), vec!["adbd"]);
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let adb = Path::new("adb");
        assert!(normalize_command("", adb).is_err());
        assert!(normalize_command("adb", adb).is_err());
    }
}
