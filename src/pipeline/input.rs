//! Input resolution: turn the operator's path into validated PDF bytes.
//!
//! The whole upload is read into memory and handed to pdfium as a byte
//! buffer. The `%PDF` magic bytes are checked first so a wrong file gives a
//! meaningful error instead of a pdfium parse failure.

use crate::error::DocumentError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An uploaded document, read and checked.
#[derive(Debug, Clone)]
pub struct Upload {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Read a local PDF, validating existence, permission and magic bytes.
pub fn read_upload(path: impl AsRef<Path>) -> Result<Upload, DocumentError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(DocumentError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocumentError::PermissionDenied { path });
        }
        Err(_) => return Err(DocumentError::FileNotFound { path }),
    };

    let mut bytes = Vec::new();
    if let Err(source) = file.read_to_end(&mut bytes) {
        return Err(DocumentError::ReadFailed { path, source });
    }

    check_magic(&path, &bytes)?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(Upload { path, bytes })
}

/// Reject buffers that do not start with `%PDF`.
pub fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(DocumentError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}
