//! Derives the observable state of a remote file.
//!
//! One command reads both the inode and the body:
//!
//! ```text
//! [sudo ]stat -c '%i' <path>; [sudo ]cat <path>
//! ```
//!
//! The PTY echoes the priming input back as the first stdout line. When the
//! priming password is set the executor's scrub already removed that line;
//! otherwise the first line is the bare echo of a newline and is discarded
//! here. The next line is the inode, and everything after it is the file body.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{Error, Result};
use super::executor::CommandExecutor;
use super::server::Server;
use super::types::{ResourceState, Sensitive};

/// Which file to read and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileQuery {
    pub path: String,
    /// Run `stat` and `cat` through `sudo`
    #[serde(default)]
    pub privileged: bool,
    /// Keep the body out of `content` and out of rendered output
    #[serde(default)]
    pub sensitive: bool,
}

impl FileQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            privileged: false,
            sensitive: false,
        }
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// The shell command that reads inode and body in one session.
    pub fn command(&self) -> String {
        let sudo = if self.privileged { "sudo " } else { "" };
        let path = shell_quote(&self.path);
        format!("{sudo}stat -c '%i' {path}; {sudo}cat {path}")
    }
}

/// Quote `path` for a POSIX shell unless it is made of plain path characters.
fn shell_quote(path: &str) -> String {
    let plain = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+,:@%=~".contains(c));
    if plain {
        path.to_string()
    } else {
        format!("'{}'", path.replace('\'', r"'\''"))
    }
}

/// Split command output into `(inode, body)`.
///
/// `echo_removed` tells whether the priming echo is already gone; if not, the
/// first line is that echo.
fn parse_output(stdout: &str, echo_removed: bool) -> Result<(String, String)> {
    let normalized = stdout.replace("\r\n", "\n");
    let trimmed = normalized.strip_suffix('\n').unwrap_or(&normalized);

    let mut lines = trimmed.split('\n');
    if !echo_removed {
        lines.next();
    }
    let inode = lines
        .next()
        .map(str::trim)
        .ok_or_else(|| Error::UnexpectedOutput("expected an inode line".to_string()))?;
    if inode.is_empty() {
        return Err(Error::UnexpectedOutput("empty inode line".to_string()));
    }

    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((inode.to_string(), body))
}

/// Reads remote files through a [`CommandExecutor`].
pub struct RemoteFileResolver<E> {
    executor: E,
}

impl<E: CommandExecutor> RemoteFileResolver<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Connect to `server` if needed, read the file and build its state.
    pub async fn resolve(&self, query: &FileQuery, server: &mut Server) -> Result<ResourceState> {
        self.executor.connect(server).await?;

        let command = query.command();
        let result = self.executor.execute(server, &command).await?;

        if result.exit_code != 0 {
            return Err(Error::Command {
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        if !result.status.is_observed() {
            return Err(Error::Execution(format!(
                "reading {} on {}: {}",
                query.path,
                server.name(),
                result.status
            )));
        }

        let (inode, body) = parse_output(&result.stdout, result.echo_removed)?;
        debug!("Resolved {} on {} to inode {}", query.path, server.name(), inode);

        let (content, sensitive_content) = if query.sensitive {
            (String::new(), Sensitive::new(body))
        } else {
            (body, Sensitive::default())
        };

        let state = ResourceState {
            id: format!("{}-{}", server.address(), inode),
            path: query.path.clone(),
            privileged: query.privileged,
            sensitive: query.sensitive,
            content,
            sensitive_content,
        };
        info!("Read {} from {} as {}", state.path, server.name(), state.id);
        Ok(state)
    }
}
