//! Removal of the priming password echo from PTY output.
//!
//! Every command gets the priming password on stdin so that `sudo` can read
//! it. With echo enabled the password, and the sudo prompt when one is shown,
//! come back on stdout and must be dropped before anyone sees the output.

/// Text sudo prints before reading a password.
pub const SUDO_PROMPT_MARKER: &str = "[sudo] password for";

/// Scrubbed output and whether anything was removed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrubbed {
    pub stdout: String,
    /// Lines carrying the priming password were dropped
    pub echo_removed: bool,
}

/// Drop the lines that carry the priming password or the sudo prompt.
///
/// When any line carries [`SUDO_PROMPT_MARKER`], every line holding the
/// marker or the password is dropped. Otherwise only a first line holding the
/// password is dropped. Other lines keep their order. An empty password never
/// matches a line.
pub fn scrub(stdout: &str, password: &str) -> Scrubbed {
    let holds_password = |line: &str| !password.is_empty() && line.contains(password);
    let lines: Vec<&str> = stdout.split('\n').collect();
    let total = lines.len();

    let kept: Vec<&str> = if lines.iter().any(|line| line.contains(SUDO_PROMPT_MARKER)) {
        lines
            .into_iter()
            .filter(|line| !line.contains(SUDO_PROMPT_MARKER) && !holds_password(line))
            .collect()
    } else if lines.first().is_some_and(|line| holds_password(line)) {
        lines.into_iter().skip(1).collect()
    } else {
        lines
    };

    Scrubbed {
        echo_removed: !password.is_empty() && kept.len() != total,
        stdout: kept.join("\n"),
    }
}

/// [`scrub`], keeping only the output.
pub fn scrub_priming_echo(stdout: &str, password: &str) -> String {
    scrub(stdout, password).stdout
}
