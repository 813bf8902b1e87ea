// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File access used by the embedding pipeline.

use std::io::ErrorKind;
use std::path::Path;

use inkpost_core::error::{InkpostError, Result};
use tracing::debug;

/// Read access to image sources.
///
/// A missing file is reported as [`InkpostError::SourceNotFound`], distinct
/// from permission or other I/O failures ([`InkpostError::Io`]).
pub trait SourceReader: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads straight from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => InkpostError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => InkpostError::Io(err),
        })?;
        debug!(path = %path.display(), len = bytes.len(), "source read");
        Ok(bytes)
    }
}
