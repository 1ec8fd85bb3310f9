//! SSH client handler and host key verification.
//!
//! Every connection is dialed with an explicit [`HostKeyPolicy`]. There is no
//! implicit default: a caller that wants the behaviour of
//! `StrictHostKeyChecking=no` has to ask for [`HostKeyPolicy::AcceptAny`].

use std::path::PathBuf;

use russh::{client, keys};
use tracing::{debug, warn};

/// How server host keys are verified during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Verify against an OpenSSH known_hosts file. Unknown and changed keys
    /// are rejected.
    KnownHosts(PathBuf),
    /// Accept only the key with this SHA256 fingerprint (`SHA256:<base64>`).
    Fingerprint(String),
    /// Accept any host key. Each accepted key is logged with its fingerprint.
    AcceptAny,
}

/// SHA256 fingerprint of a public key in OpenSSH notation.
pub(crate) fn fingerprint(key: &keys::PublicKey) -> String {
    key.fingerprint(keys::HashAlg::Sha256).to_string()
}

/// Client handler for russh that applies a [`HostKeyPolicy`].
pub struct SshClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SshClientHandler {
    pub fn new(host: impl Into<String>, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
        }
    }

    /// Decide whether `key` is trusted for this handler's host.
    pub(crate) fn verify(&self, key: &keys::PublicKey) -> bool {
        let actual = fingerprint(key);
        match &self.policy {
            HostKeyPolicy::AcceptAny => {
                warn!(
                    "Accepting unverified host key {} for {}:{}",
                    actual, self.host, self.port
                );
                true
            }
            HostKeyPolicy::Fingerprint(expected) => {
                let trusted = expected.trim() == actual;
                if !trusted {
                    warn!(
                        "Host key for {}:{} has fingerprint {}, expected {}",
                        self.host, self.port, actual, expected
                    );
                }
                trusted
            }
            HostKeyPolicy::KnownHosts(path) => {
                match keys::check_known_hosts_path(&self.host, self.port, key, path) {
                    Ok(true) => {
                        debug!("Host key for {}:{} found in {:?}", self.host, self.port, path);
                        true
                    }
                    Ok(false) => {
                        warn!(
                            "Host {}:{} ({}) is not listed in {:?}",
                            self.host, self.port, actual, path
                        );
                        false
                    }
                    Err(e) => {
                        warn!(
                            "Host key check for {}:{} against {:?} failed: {}",
                            self.host, self.port, path, e
                        );
                        false
                    }
                }
            }
        }
    }
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.verify(server_public_key))
    }
}
