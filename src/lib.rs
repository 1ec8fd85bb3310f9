//! Remote command execution over SSH.
//!
//! The [`remote`] module keeps one authenticated connection per logical
//! server, runs commands through interactive PTY sessions and derives the
//! state of remote files from their output.

pub mod remote;
