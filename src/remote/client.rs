//! SSH dialing, authentication and interactive command execution.
//!
//! ## Connection Lifecycle
//!
//! 1. **Credential loading**: Collect the credentials of the server
//!    descriptor. A private key is read and parsed here, before any network
//!    traffic.
//!
//! 2. **Client Configuration**: Build the russh client configuration with
//!    keepalive and no inactivity timeout, since connections are reused.
//!
//! 3. **Connection Establishment**: Dial `address:port` and run the handshake
//!    under the connect timeout. The host key is checked against the
//!    dialer's [`HostKeyPolicy`].
//!
//! 4. **Authentication**: Password first, then public key.
//!
//! ## Command Execution
//!
//! Each command gets its own session channel with a PTY (`xterm`, 80x40,
//! echo on). After `exec`, the priming input is written to the channel and
//! stdin is closed. Output is collected until the server closes the channel.
//! The channel is released on every path.
//!
//! There are no retries. A failed dial is reported to the caller as is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::{ChannelMsg, Disconnect, Pty, client};
use tracing::{debug, error, info, warn};

use super::auth::Credentials;
use super::config::{
    KEEPALIVE_INTERVAL, KEEPALIVE_MAX, PTY_BAUD, PTY_COLUMNS, PTY_ROWS, PTY_TERM,
    resolve_connect_timeout,
};
use super::error::{Error, Result};
use super::server::Server;
use super::session::{HostKeyPolicy, SshClientHandler};
use super::transport::{Dialer, RawOutput, Transport};
use super::types::ExitStatus;

/// Build russh client configuration for long-lived, reused connections.
///
/// Inactivity timeout is disabled; liveness is tracked with a keepalive every
/// [`KEEPALIVE_INTERVAL`], giving up after [`KEEPALIVE_MAX`] misses.
pub(crate) fn build_client_config() -> Arc<client::Config> {
    Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: KEEPALIVE_MAX,
        ..Default::default()
    })
}

/// Terminal modes requested with every PTY.
pub(crate) fn pty_modes() -> [(Pty, u32); 3] {
    [
        (Pty::ECHO, 1),
        (Pty::TTY_OP_ISPEED, PTY_BAUD),
        (Pty::TTY_OP_OSPEED, PTY_BAUD),
    ]
}

/// Establish an SSH connection and authenticate.
async fn connect_to_ssh(
    server: &Server,
    policy: &HostKeyPolicy,
    timeout: Duration,
) -> Result<client::Handle<SshClientHandler>, String> {
    let credentials = Credentials::for_server(server).await?;

    let config = build_client_config();
    let handler = SshClientHandler::new(server.address(), server.port(), policy.clone());

    let connect_future = client::connect(config, (server.address(), server.port()), handler);

    let mut handle = tokio::time::timeout(timeout, connect_future)
        .await
        .map_err(|_| format!("Connection timed out after {:?}", timeout))?
        .map_err(|e| format!("Failed to connect: {}", e))?;

    credentials.authenticate(&mut handle, server.user()).await?;

    Ok(handle)
}

/// Dials SSH connections under an explicit host key policy.
pub struct SshDialer {
    policy: HostKeyPolicy,
    connect_timeout: Duration,
}

impl SshDialer {
    /// Create a dialer. The connect timeout comes from
    /// [`resolve_connect_timeout`].
    pub fn new(policy: HostKeyPolicy) -> Self {
        Self {
            policy,
            connect_timeout: resolve_connect_timeout(None),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &HostKeyPolicy {
        &self.policy
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

#[async_trait]
impl Dialer for SshDialer {
    type Transport = SshTransport;

    async fn dial(&self, server: &Server) -> Result<SshTransport> {
        info!(
            "Attempting SSH connection to {}@{} ({}) with timeout {}s",
            server.user(),
            server.full_address(),
            server.name(),
            self.connect_timeout.as_secs()
        );

        match connect_to_ssh(server, &self.policy, self.connect_timeout).await {
            Ok(handle) => {
                info!("Connected to {}@{}", server.user(), server.full_address());
                Ok(SshTransport {
                    server_name: server.name().to_string(),
                    handle,
                })
            }
            Err(e) => {
                error!("SSH connection to {} failed: {}", server.full_address(), e);
                Err(Error::connection(server.name(), e))
            }
        }
    }
}

/// An authenticated SSH connection.
pub struct SshTransport {
    server_name: String,
    handle: client::Handle<SshClientHandler>,
}

/// What a session produced, and whether the server already closed it.
struct SessionOutcome {
    output: RawOutput,
    closed_by_peer: bool,
}

#[async_trait]
impl Transport for SshTransport {
    async fn run(&self, command: &str, stdin: &str) -> Result<RawOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Session(format!("Failed to open channel: {}", e)))?;

        let outcome = run_interactive(&mut channel, command, stdin).await;

        // A channel the server already closed needs no release.
        let closed_by_peer = matches!(&outcome, Ok(o) if o.closed_by_peer);
        if !closed_by_peer && let Err(e) = channel.close().await {
            warn!(
                "Failed to release session channel on {}: {}",
                self.server_name, e
            );
        }

        outcome.map(|o| o.output)
    }

    async fn close(&self) -> Result<()> {
        info!("Closing SSH connection to {}", self.server_name);
        self.handle
            .disconnect(Disconnect::ByApplication, "Connection closed by client", "en")
            .await
            .map_err(|e| Error::connection(&self.server_name, format!("Error during disconnect: {}", e)))
    }
}

/// Set up the PTY, run the command, feed stdin and collect the output.
async fn run_interactive(
    channel: &mut russh::Channel<client::Msg>,
    command: &str,
    stdin: &str,
) -> Result<SessionOutcome> {
    channel
        .request_pty(true, PTY_TERM, PTY_COLUMNS, PTY_ROWS, 0, 0, &pty_modes())
        .await
        .map_err(|e| Error::Session(format!("Failed to request PTY: {}", e)))?;

    if let Err(e) = channel.exec(true, command).await {
        return Ok(SessionOutcome {
            output: RawOutput {
                stdout: String::new(),
                stderr: String::new(),
                status: ExitStatus::Aborted(format!("Failed to execute command: {}", e)),
            },
            closed_by_peer: false,
        });
    }

    if let Err(e) = channel.data(stdin.as_bytes()).await {
        warn!("Failed to write session input: {}", e);
    } else if let Err(e) = channel.eof().await {
        debug!("Failed to close session input: {}", e);
    }

    Ok(collect_output(channel).await)
}

/// Read channel messages until the session ends.
async fn collect_output(channel: &mut russh::Channel<client::Msg>) -> SessionOutcome {
    // Pre-allocate buffers to reduce reallocations during output collection
    let mut stdout = Vec::with_capacity(4096);
    let mut stderr = Vec::with_capacity(1024);
    let mut exit_code: Option<u32> = None;
    let mut signal: Option<String> = None;
    let mut rejected = false;
    let mut closed_by_peer = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                stdout.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExtendedData { data, ext }) => {
                // ext == 1 is stderr in SSH protocol
                if ext == 1 {
                    stderr.extend_from_slice(&data);
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = Some(exit_status);
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                signal = Some(match signal_name {
                    russh::Sig::Custom(name) => name,
                    other => format!("{:?}", other),
                });
            }
            Some(ChannelMsg::Failure) => {
                rejected = true;
            }
            Some(ChannelMsg::Eof) => {
                // Continue to wait for exit status if not received yet
                if exit_code.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Close) | None => {
                closed_by_peer = true;
                break;
            }
            Some(_) => {
                // Ignore other message types
            }
        }
    }

    let status = match (exit_code, signal) {
        (Some(code), _) => ExitStatus::Exited(code),
        (None, Some(signal)) => ExitStatus::Signaled(signal),
        (None, None) if rejected => {
            ExitStatus::Aborted("Server rejected the session request".to_string())
        }
        (None, None) => ExitStatus::Missing,
    };

    SessionOutcome {
        output: RawOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            status,
        },
        closed_by_peer,
    }
}
