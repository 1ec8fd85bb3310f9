//! Configuration resolution for remote execution.
//!
//! Values follow a three-tier priority:
//!
//! 1. **Parameter** - Explicitly provided function parameter (highest priority)
//! 2. **Environment Variable** - Value from environment variable
//! 3. **Default** - Built-in default value (lowest priority)
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REMOTE_CONNECT_TIMEOUT` | 10s | Dial and handshake timeout in seconds |
//! | `REMOTE_PORT` | 22 | SSH port |
//! | `REMOTE_KNOWN_HOSTS` | - | known_hosts file used to verify host keys |
//! | `REMOTE_HOST_FINGERPRINT` | - | Pinned `SHA256:` host key fingerprint |
//! | `REMOTE_ACCEPT_ANY_HOST_KEY` | false | Skip host key verification |
//!
//! Host key policy has no default: if none of the three policy variables is
//! set and no parameter is given, resolution yields `None`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::session::HostKeyPolicy;

/// Default dial and handshake timeout in seconds
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default SSH port
pub(crate) const DEFAULT_SSH_PORT: u16 = 22;

/// Keepalive interval for established connections
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Unanswered keepalives before a connection is considered dead
pub(crate) const KEEPALIVE_MAX: usize = 3;

/// Terminal type requested for interactive sessions
pub(crate) const PTY_TERM: &str = "xterm";

/// PTY width in characters
pub(crate) const PTY_COLUMNS: u32 = 80;

/// PTY height in rows
pub(crate) const PTY_ROWS: u32 = 40;

/// PTY input and output baud rate
pub(crate) const PTY_BAUD: u32 = 14400;

/// Environment variable name for the connect timeout
pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "REMOTE_CONNECT_TIMEOUT";

/// Environment variable name for the SSH port
pub(crate) const PORT_ENV_VAR: &str = "REMOTE_PORT";

/// Environment variable name for the known_hosts file
pub(crate) const KNOWN_HOSTS_ENV_VAR: &str = "REMOTE_KNOWN_HOSTS";

/// Environment variable name for a pinned host key fingerprint
pub(crate) const HOST_FINGERPRINT_ENV_VAR: &str = "REMOTE_HOST_FINGERPRINT";

/// Environment variable name for disabling host key verification
pub(crate) const ACCEPT_ANY_HOST_KEY_ENV_VAR: &str = "REMOTE_ACCEPT_ANY_HOST_KEY";

/// Resolve the connect timeout with priority: parameter -> env var -> default
pub fn resolve_connect_timeout(timeout_param: Option<u64>) -> Duration {
    // Priority 1: Use parameter if provided
    if let Some(timeout) = timeout_param {
        return Duration::from_secs(timeout);
    }

    // Priority 2: Use environment variable if set
    if let Ok(env_timeout) = env::var(CONNECT_TIMEOUT_ENV_VAR)
        && let Ok(timeout) = env_timeout.parse::<u64>()
    {
        return Duration::from_secs(timeout);
    }

    // Priority 3: Default value
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

/// Resolve the SSH port with priority: parameter -> env var -> default
pub fn resolve_port(port_param: Option<u16>) -> u16 {
    if let Some(port) = port_param {
        return port;
    }

    if let Ok(env_port) = env::var(PORT_ENV_VAR)
        && let Ok(port) = env_port.parse::<u16>()
    {
        return port;
    }

    DEFAULT_SSH_PORT
}

/// Resolve the host key policy with priority: parameter -> env vars.
///
/// Among the environment variables, a known_hosts file wins over a pinned
/// fingerprint, which wins over the accept-any switch.
pub fn resolve_host_key_policy(policy_param: Option<HostKeyPolicy>) -> Option<HostKeyPolicy> {
    if policy_param.is_some() {
        return policy_param;
    }

    if let Ok(path) = env::var(KNOWN_HOSTS_ENV_VAR)
        && !path.is_empty()
    {
        return Some(HostKeyPolicy::KnownHosts(PathBuf::from(path)));
    }

    if let Ok(fingerprint) = env::var(HOST_FINGERPRINT_ENV_VAR)
        && !fingerprint.is_empty()
    {
        return Some(HostKeyPolicy::Fingerprint(fingerprint));
    }

    if let Ok(accept_any) = env::var(ACCEPT_ANY_HOST_KEY_ENV_VAR)
        && (accept_any.eq_ignore_ascii_case("true") || accept_any == "1")
    {
        return Some(HostKeyPolicy::AcceptAny);
    }

    None
}
