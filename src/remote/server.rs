//! Server descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use super::config::DEFAULT_SSH_PORT;
use super::types::CommandResult;

/// One remote host: identity, credentials and command history.
///
/// `name` is the key the connection registry uses; `address` is only the
/// dial target. Two descriptors with the same name share one connection.
#[derive(Clone)]
pub struct Server {
    name: String,
    address: String,
    port: u16,
    user: String,
    password: Option<String>,
    private_key_path: Option<PathBuf>,
    sudo_password: Option<String>,
    history: Vec<CommandResult>,
}

impl Server {
    pub fn new(name: impl Into<String>, address: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: DEFAULT_SSH_PORT,
            user: user.into(),
            password: None,
            private_key_path: None,
            sudo_password: None,
            history: Vec::new(),
        }
    }

    /// Descriptor keyed by its own address.
    pub fn for_host(host: impl Into<String>, user: impl Into<String>) -> Self {
        let host = host.into();
        Self::new(host.clone(), host, user)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Password fed to every session's stdin before the command runs.
    pub fn with_sudo_password(mut self, password: impl Into<String>) -> Self {
        self.sudo_password = Some(password.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn private_key_path(&self) -> Option<&Path> {
        self.private_key_path.as_deref()
    }

    pub fn sudo_password(&self) -> Option<&str> {
        self.sudo_password.as_deref()
    }

    /// `address:port`
    pub fn full_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Past command results, oldest first.
    pub fn history(&self) -> &[CommandResult] {
        &self.history
    }

    pub(crate) fn record(&mut self, result: CommandResult) {
        self.history.push(result);
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key_path", &self.private_key_path)
            .field("sudo_password", &self.sudo_password.as_ref().map(|_| "***"))
            .field("history", &self.history.len())
            .finish()
    }
}
