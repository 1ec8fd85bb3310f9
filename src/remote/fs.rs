//! Local filesystem access, limited to loading private-key material.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::error::{Error, Result};

/// Read a local file into memory.
///
/// A missing file is reported as [`Error::FileNotFound`]; any other failure
/// as [`Error::Io`].
pub async fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::FileNotFound(path.to_path_buf())),
        Err(e) => Err(Error::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
