//! Error taxonomy for connection, execution and resolution failures.
//!
//! Transport failures and remote exit-code failures render differently so a
//! caller can tell "the command ran and failed" apart from "the command could
//! not be run at all":
//!
//! - `command failed with exit 2: No such file`
//! - `unable to connect to web-1: Connection refused`
//!
//! Nothing in this crate retries. Every error is handed back to the immediate
//! caller, except inside [`ConnectionManager::open_all`], which logs and skips.
//!
//! [`ConnectionManager::open_all`]: crate::remote::connection::ConnectionManager::open_all

use std::path::PathBuf;

/// Errors produced by the remote execution engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dial, handshake, host-key rejection, authentication rejection, or a
    /// private key that could not be read or parsed.
    #[error("unable to connect to {server}: {reason}")]
    Connection { server: String, reason: String },

    /// A session channel could not be allocated (or set up) on a connection.
    #[error("unable to open session: {0}")]
    Session(String),

    /// No connection is registered for the server name. `open` must run first.
    #[error("no connection registered for server {0}")]
    NotFound(String),

    /// The remote command completed with a non-zero exit code.
    #[error("command failed with exit {code}: {stderr}")]
    Command { code: i32, stderr: String },

    /// The command could not be run to completion and no exit code exists.
    #[error("unable to execute: {0}")]
    Execution(String),

    /// A local file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A local file exists but could not be read.
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote output did not have the expected shape.
    #[error("unexpected command output: {0}")]
    UnexpectedOutput(String),
}

impl Error {
    /// Build a [`Error::Connection`] for a server name.
    pub(crate) fn connection(server: &str, reason: impl Into<String>) -> Self {
        Error::Connection {
            server: server.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    mod messages {
        use super::*;

        #[test]
        fn test_command_error_shape() {
            let err = Error::Command {
                code: 2,
                stderr: "No such file".to_string(),
            };
            assert_eq!(err.to_string(), "command failed with exit 2: No such file");
        }

        #[test]
        fn test_connection_error_shape() {
            let err = Error::connection("web-1", "Connection refused");
            assert_eq!(
                err.to_string(),
                "unable to connect to web-1: Connection refused"
            );
        }

        #[test]
        fn test_not_found_names_server() {
            let err = Error::NotFound("db".to_string());
            assert!(err.to_string().contains("db"));
        }

        #[test]
        fn test_transport_and_exit_failures_render_differently() {
            let exit = Error::Command {
                code: 1,
                stderr: String::new(),
            }
            .to_string();
            let transport = Error::Execution("channel closed".to_string()).to_string();
            assert!(exit.starts_with("command failed with exit"));
            assert!(transport.starts_with("unable to execute"));
        }

        #[test]
        fn test_io_error_keeps_source() {
            use std::error::Error as _;

            let err = Error::Io {
                path: PathBuf::from("/tmp/key"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            };
            assert!(err.to_string().contains("/tmp/key"));
            assert!(err.source().is_some());
        }
    }
}
