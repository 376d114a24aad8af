//! Binding to the pdfium shared library.
//!
//! Resolution order, first hit wins:
//!
//! 1. `PDFIUM_LIB_PATH`: explicit path to `libpdfium.so` / `.dylib` / `pdfium.dll`.
//! 2. The platform library name next to the running executable.
//! 3. The platform library name in the current working directory.
//! 4. The system library search path.

use crate::error::DocumentError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium following the resolution order above.
pub fn bind_pdfium() -> Result<Pdfium, DocumentError> {
    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            return bind_pdfium_from_path(Path::new(&p));
        }
    }

    for dir in candidate_dirs() {
        let dir = dir.to_string_lossy();
        let lib = PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&*dir));
        if lib.exists() {
            return bind_pdfium_from_path(&lib);
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| DocumentError::PdfiumBindingFailed(e.to_string()))
}

/// Bind to a pdfium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, DocumentError> {
    debug!("Binding pdfium from {}", path.display());
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| {
            DocumentError::PdfiumBindingFailed(format!("'{}': {}", path.display(), e))
        })
}

fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs
}
