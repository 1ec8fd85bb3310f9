//! Credentials offered during the SSH handshake.
//!
//! A server descriptor carries at most two credentials: a password and a
//! private key path. [`Credentials::for_server`] turns them into an ordered
//! list, password first. Key material is read and parsed there, so a missing
//! or malformed key fails before any network traffic.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::{client, keys};
use tracing::debug;

use super::fs::read_file;
use super::server::Server;
use super::session::SshClientHandler;

/// One credential from a server descriptor.
pub enum Credential {
    Password(String),
    /// Unencrypted private key. Passphrase-protected keys are not supported.
    PrivateKey {
        path: PathBuf,
        key: Arc<keys::PrivateKey>,
    },
}

impl Credential {
    /// Read and parse the private key at `path`.
    pub async fn load_key(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let bytes = read_file(path)
            .await
            .map_err(|e| format!("Failed to load private key: {}", e))?;
        Self::parse_key(path, &bytes)
    }

    /// Parse already-loaded key material.
    pub fn parse_key(path: impl Into<PathBuf>, material: &[u8]) -> Result<Self, String> {
        let path = path.into();
        let text = std::str::from_utf8(material)
            .map_err(|_| format!("Private key {:?} is not valid UTF-8", path))?;
        let key = keys::decode_secret_key(text, None)
            .map_err(|e| format!("Failed to parse private key {:?}: {}", path, e))?;

        Ok(Credential::PrivateKey {
            path,
            key: Arc::new(key),
        })
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::PrivateKey { .. } => "key",
        }
    }

    /// Offer this credential. `Ok(false)` means the server rejected it.
    async fn offer(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        user: &str,
    ) -> Result<bool, String> {
        let result = match self {
            Credential::Password(password) => handle
                .authenticate_password(user, password)
                .await
                .map_err(|e| format!("Password authentication failed: {}", e))?,
            Credential::PrivateKey { key, .. } => {
                // RSA keys need the strongest hash the server supports.
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                debug!("Using RSA hash algorithm for key auth: {:?}", hash_alg);

                handle
                    .authenticate_publickey(
                        user,
                        keys::PrivateKeyWithHashAlg::new(key.clone(), hash_alg),
                    )
                    .await
                    .map_err(|e| format!("Key authentication failed: {}", e))?
            }
        };
        Ok(result.success())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(***)"),
            Credential::PrivateKey { path, .. } => {
                f.debug_struct("PrivateKey").field("path", path).finish()
            }
        }
    }
}

/// The credentials of one server, in the order they are offered.
#[derive(Debug)]
pub struct Credentials {
    methods: Vec<Credential>,
}

impl Credentials {
    /// Collect the credentials of `server`: password first, then key.
    ///
    /// Fails when the key cannot be read or parsed, or when the server has
    /// neither credential.
    pub async fn for_server(server: &Server) -> Result<Self, String> {
        let mut methods = Vec::with_capacity(2);

        if let Some(password) = server.password() {
            methods.push(Credential::Password(password.to_string()));
        }
        if let Some(key_path) = server.private_key_path() {
            methods.push(Credential::load_key(key_path).await?);
        }

        if methods.is_empty() {
            return Err(
                "No authentication methods configured: server has neither password nor private key"
                    .to_string(),
            );
        }
        Ok(Self { methods })
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.methods.iter().map(Credential::kind).collect()
    }

    /// Offer each credential until the server accepts one.
    ///
    /// A transport error stops the attempt at once; rejections move on to the
    /// next credential.
    pub async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        user: &str,
    ) -> Result<(), String> {
        for credential in &self.methods {
            debug!("Offering {} credential for {}", credential.kind(), user);
            if credential.offer(handle, user).await? {
                debug!("Authenticated {} with {} credential", user, credential.kind());
                return Ok(());
            }
        }

        Err(format!(
            "Authentication failed: server rejected {} for {}",
            self.kinds().join(" and "),
            user
        ))
    }
}
