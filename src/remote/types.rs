//! Serializable records produced by the execution engine.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Placeholder rendered in place of a sensitive value.
pub const REDACTED: &str = "(sensitive value)";

/// How a remote command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    /// The remote process reported an exit status.
    Exited(u32),
    /// The remote process was terminated by the named signal.
    Signaled(String),
    /// The session ended without the server reporting an exit status.
    Missing,
    /// The command could not be started or was cut off mid-run.
    Aborted(String),
}

impl ExitStatus {
    /// Integer exit code for this status.
    ///
    /// Signals map to `128 + signum` (plain `128` for signals without a
    /// well-known number). `Missing` and `Aborted` carry no exit code and
    /// report `0`; use [`ExitStatus::is_observed`] to tell them apart from a
    /// clean exit.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => i32::try_from(*code).unwrap_or(i32::MAX),
            ExitStatus::Signaled(signal) => 128 + signal_number(signal).unwrap_or(0),
            ExitStatus::Missing | ExitStatus::Aborted(_) => 0,
        }
    }

    /// Whether the remote side reported how the process ended.
    pub fn is_observed(&self) -> bool {
        matches!(self, ExitStatus::Exited(_) | ExitStatus::Signaled(_))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exited with {}", code),
            ExitStatus::Signaled(signal) => write!(f, "killed by SIG{}", signal),
            ExitStatus::Missing => write!(f, "no exit status reported"),
            ExitStatus::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// POSIX numbers for the signal names SSH servers report.
fn signal_number(name: &str) -> Option<i32> {
    let number = match name.trim_start_matches("SIG") {
        "HUP" => 1,
        "INT" => 2,
        "QUIT" => 3,
        "ILL" => 4,
        "ABRT" => 6,
        "FPE" => 8,
        "KILL" => 9,
        "USR1" => 10,
        "SEGV" => 11,
        "USR2" => 12,
        "PIPE" => 13,
        "ALRM" => 14,
        "TERM" => 15,
        _ => return None,
    };
    Some(number)
}

/// Immutable record of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    /// Standard output with the priming password echo removed
    pub stdout: String,
    pub stderr: String,
    /// Exit code derived from `status` (0 when none was observed)
    pub exit_code: i32,
    pub status: ExitStatus,
    /// The priming echo was found in the raw output and removed
    #[serde(default)]
    pub echo_removed: bool,
    /// When the command finished (RFC3339 format)
    pub executed_at: String,
}

impl CommandResult {
    pub fn new(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        status: ExitStatus,
    ) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: status.code(),
            status,
            echo_removed: false,
            executed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Connection metadata for inspection and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
    /// Server identity the connection is registered under
    pub server_name: String,
    /// Dial target in `address:port` form
    pub address: String,
    pub user: String,
    pub connected_at: String,
}

/// A string that never shows up in logs or rendered output.
///
/// `Debug`, `Display` and `Serialize` all print [`REDACTED`] for non-empty
/// values; the value itself is only reachable through [`Sensitive::expose`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn rendered(&self) -> &str {
        if self.0.is_empty() { "" } else { REDACTED }
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.rendered())
    }
}

impl fmt::Display for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rendered())
    }
}

impl Serialize for Sensitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.rendered())
    }
}

/// Observable state of one remote file.
///
/// Exactly one of `content` and `sensitive_content` holds the file body,
/// chosen by the `sensitive` flag of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    /// `address-inode`
    pub id: String,
    pub path: String,
    pub privileged: bool,
    pub sensitive: bool,
    pub content: String,
    pub sensitive_content: Sensitive,
}
