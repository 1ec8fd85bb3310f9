//! Remote execution engine.
//!
//! The pieces stack bottom-up:
//!
//! - [`ConnectionManager`] keeps one authenticated connection per server name,
//!   dialed through a [`Dialer`] ([`SshDialer`] in production).
//! - [`RemoteShellExecutor`] runs a command in a fresh PTY session on that
//!   connection, primes stdin with the server's sudo password, scrubs the echo
//!   and records the [`CommandResult`] in the server's history.
//! - [`RemoteFileResolver`] turns a [`FileQuery`] into a [`ResourceState`] by
//!   running `stat` and `cat` through any [`CommandExecutor`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use remote_file::remote::{
//!     ConnectionManager, FileQuery, HostKeyPolicy, RemoteFileResolver, RemoteShellExecutor,
//!     Server, SshDialer,
//! };
//!
//! # async fn run() -> remote_file::remote::Result<()> {
//! let dialer = SshDialer::new(HostKeyPolicy::KnownHosts("/home/alice/.ssh/known_hosts".into()));
//! let manager = Arc::new(ConnectionManager::new(dialer));
//! let resolver = RemoteFileResolver::new(RemoteShellExecutor::new(manager));
//!
//! let mut server = Server::for_host("10.0.0.5", "alice").with_password("secret123");
//! let state = resolver.resolve(&FileQuery::new("/etc/hostname"), &mut server).await?;
//! println!("{} = {}", state.id, state.content);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod fs;
pub mod replay;
pub mod resolver;
pub mod scrub;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{SshDialer, SshTransport};
pub use connection::{Connection, ConnectionManager};
pub use error::{Error, Result};
pub use executor::{CommandExecutor, RemoteShellExecutor};
pub use replay::ReplayExecutor;
pub use resolver::{FileQuery, RemoteFileResolver};
pub use server::Server;
pub use session::HostKeyPolicy;
pub use transport::{Dialer, RawOutput, Transport};
pub use types::{CommandResult, ConnectionInfo, ExitStatus, ResourceState, Sensitive};
