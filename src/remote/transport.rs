//! Transport seam between the connection registry and the wire.
//!
//! [`Dialer`] turns a [`Server`] into a live, authenticated [`Transport`];
//! a transport runs one command per session. The SSH implementations live in
//! [`client`](super::client).

use async_trait::async_trait;

use super::error::Result;
use super::server::Server;
use super::types::ExitStatus;

/// Output of one session, before any scrubbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// A live authenticated connection to one host.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Run `command` in a fresh interactive session, writing `stdin` to the
    /// session's standard input once the command has started.
    ///
    /// Fails with [`Error::Session`](super::error::Error::Session) when no
    /// session can be set up. Once the command was submitted, problems are
    /// reported through [`RawOutput::status`] instead.
    async fn run(&self, command: &str, stdin: &str) -> Result<RawOutput>;

    /// Tear the connection down.
    async fn close(&self) -> Result<()>;
}

/// Opens authenticated transports.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Transport: Transport;

    /// Dial and authenticate against `server`.
    ///
    /// Fails with [`Error::Connection`](super::error::Error::Connection).
    async fn dial(&self, server: &Server) -> Result<Self::Transport>;
}
