//! Command execution against registered connections.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::SshDialer;
use super::connection::ConnectionManager;
use super::error::{Error, Result};
use super::scrub::scrub;
use super::server::Server;
use super::transport::{Dialer, RawOutput, Transport};
use super::types::CommandResult;

/// Runs commands on servers.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Make sure `server` is connected.
    async fn connect(&self, server: &Server) -> Result<()>;

    /// Run `command` on `server` and append the result to its history.
    async fn execute(&self, server: &mut Server, command: &str) -> Result<CommandResult>;
}

/// Stdin written to every session: the priming password and a newline.
pub(crate) fn priming_input(server: &Server) -> String {
    format!("{}\n", server.sudo_password().unwrap_or_default())
}

/// Scrub a session's output, build the result and record it on `server`.
pub(crate) fn record_output(server: &mut Server, command: &str, raw: RawOutput) -> CommandResult {
    let scrubbed = scrub(&raw.stdout, server.sudo_password().unwrap_or_default());
    let mut result = CommandResult::new(command, scrubbed.stdout, raw.stderr, raw.status);
    result.echo_removed = scrubbed.echo_removed;

    server.record(result.clone());
    result
}

/// Executes commands through interactive sessions on registered connections.
pub struct RemoteShellExecutor<D: Dialer = SshDialer> {
    manager: Arc<ConnectionManager<D>>,
}

impl<D: Dialer> RemoteShellExecutor<D> {
    pub fn new(manager: Arc<ConnectionManager<D>>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager<D>> {
        &self.manager
    }
}

#[async_trait]
impl<D: Dialer> CommandExecutor for RemoteShellExecutor<D> {
    async fn connect(&self, server: &Server) -> Result<()> {
        self.manager.open(server).await.map(|_| ())
    }

    async fn execute(&self, server: &mut Server, command: &str) -> Result<CommandResult> {
        let connection = self
            .manager
            .get(server.name())
            .ok_or_else(|| Error::NotFound(server.name().to_string()))?;

        // One command at a time per connection.
        let _guard = connection.lock().await;

        debug!("Executing on {}: {}", server.name(), command);
        let raw = connection
            .transport()
            .run(command, &priming_input(server))
            .await?;

        let result = record_output(server, command, raw);
        info!(
            "Command on {} finished: {} (exit {})",
            server.name(),
            result.status,
            result.exit_code
        );
        Ok(result)
    }
}
