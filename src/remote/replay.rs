//! Scripted executor that replays canned outputs without any network.
//!
//! Useful for exercising callers of [`CommandExecutor`] offline. Commands must
//! arrive in the scripted order; anything else is an execution error.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::error::{Error, Result};
use super::executor::{CommandExecutor, record_output};
use super::server::Server;
use super::transport::RawOutput;
use super::types::{CommandResult, ExitStatus};

struct Step {
    command: String,
    output: RawOutput,
}

#[derive(Default)]
struct ReplayLog {
    steps: VecDeque<Step>,
    executed: Vec<String>,
    connected: Vec<String>,
}

/// [`CommandExecutor`] backed by a script of expected commands.
#[derive(Default)]
pub struct ReplayExecutor {
    log: Mutex<ReplayLog>,
}

impl ReplayExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `command` next and answer it with the given output.
    pub fn expect(
        self,
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        status: ExitStatus,
    ) -> Self {
        self.with_log(|log| {
            log.steps.push_back(Step {
                command: command.into(),
                output: RawOutput {
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                    status,
                },
            })
        });
        self
    }

    /// Commands submitted so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.with_log(|log| log.executed.clone())
    }

    /// Names of the servers passed to `connect`, in order.
    pub fn connected(&self) -> Vec<String> {
        self.with_log(|log| log.connected.clone())
    }

    /// Number of scripted steps not consumed yet.
    pub fn remaining(&self) -> usize {
        self.with_log(|log| log.steps.len())
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut ReplayLog) -> R) -> R {
        let mut guard = self.log.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl CommandExecutor for ReplayExecutor {
    async fn connect(&self, server: &Server) -> Result<()> {
        self.with_log(|log| log.connected.push(server.name().to_string()));
        Ok(())
    }

    async fn execute(&self, server: &mut Server, command: &str) -> Result<CommandResult> {
        let output = self.with_log(|log| {
            log.executed.push(command.to_string());
            match log.steps.pop_front() {
                Some(step) if step.command == command => Ok(step.output),
                Some(step) => {
                    let err = Error::Execution(format!(
                        "unexpected command {:?}, expected {:?}",
                        command, step.command
                    ));
                    log.steps.push_front(step);
                    Err(err)
                }
                None => Err(Error::Execution(format!(
                    "no scripted output left for {:?}",
                    command
                ))),
            }
        })?;

        debug!("Replaying {:?} on {}", command, server.name());
        Ok(record_output(server, command, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server::new("web", "10.0.0.5", "alice").with_sudo_password("secret123")
    }

    #[tokio::test]
    async fn test_replays_in_order() {
        let replay = ReplayExecutor::new()
            .expect("echo one", "one\n", "", ExitStatus::Exited(0))
            .expect("false", "", "", ExitStatus::Exited(1));
        let mut server = server();

        replay.connect(&server).await.unwrap();
        let one = replay.execute(&mut server, "echo one").await.unwrap();
        let two = replay.execute(&mut server, "false").await.unwrap();

        assert_eq!(one.stdout, "one\n");
        assert_eq!(two.exit_code, 1);
        assert_eq!(replay.executed(), vec!["echo one", "false"]);
        assert_eq!(replay.connected(), vec!["web"]);
        assert_eq!(replay.remaining(), 0);
        assert_eq!(server.history().len(), 2);
    }

    #[tokio::test]
    async fn test_scrubs_like_a_live_session() {
        let replay = ReplayExecutor::new().expect(
            "sudo id -u",
            "[sudo] password for alice:\nsecret123\n0\n",
            "",
            ExitStatus::Exited(0),
        );
        let mut server = server();

        let result = replay.execute(&mut server, "sudo id -u").await.unwrap();
        assert_eq!(result.stdout, "0\n");
    }

    #[tokio::test]
    async fn test_unexpected_command() {
        let replay = ReplayExecutor::new().expect("uptime", "", "", ExitStatus::Exited(0));
        let mut server = server();

        let err = replay.execute(&mut server, "reboot").await.err().unwrap();

        assert!(matches!(err, Error::Execution(ref msg) if msg.contains("reboot")));
        assert_eq!(replay.remaining(), 1);
        assert_eq!(replay.executed(), vec!["reboot"]);
        assert!(server.history().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let replay = ReplayExecutor::new();
        let mut server = server();

        let err = replay.execute(&mut server, "uptime").await.err().unwrap();
        assert!(matches!(err, Error::Execution(_)));
    }
}
