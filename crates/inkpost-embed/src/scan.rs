// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reference discovery.
//
// `scan` is a pure walk over the document; `resolve` turns the local
// references into on-disk sources and is the only place existence is checked.

use std::path::{Path, PathBuf};

use inkpost_core::error::{InkpostError, Result};
use inkpost_core::{Document, ImageKind, NodeId, SourceType};
use tracing::debug;

use crate::classify::{classify, classify_strict};
use crate::source::SourceReader;

/// An `img` element found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The element the locator came from. Results are written back here.
    pub node: NodeId,
    pub locator: String,
    pub source_type: SourceType,
}

/// A local reference that exists on disk and has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub reference: ImageReference,
    pub absolute_path: PathBuf,
    pub kind: ImageKind,
    pub mime: &'static str,
}

/// Every `img` with a `src`, in document order.
pub fn scan(doc: &Document) -> Vec<ImageReference> {
    doc.descendants()
        .into_iter()
        .filter(|id| doc.tag(*id) == Some("img"))
        .filter_map(|id| {
            let locator = doc.attribute(id, "src")?;
            Some(ImageReference {
                node: id,
                locator: locator.to_string(),
                source_type: SourceType::classify(locator),
            })
        })
        .collect()
}

/// Resolve local references against `base_dir`.
///
/// Non-local references are dropped. The first missing file aborts with
/// [`InkpostError::SourceNotFound`] before anything is read.
pub fn resolve(
    references: &[ImageReference],
    base_dir: &Path,
    reader: &dyn SourceReader,
    strict_formats: bool,
) -> Result<Vec<ResolvedSource>> {
    let mut resolved = Vec::new();
    for reference in references {
        if reference.source_type != SourceType::Local {
            continue;
        }
        let absolute_path = base_dir.join(&reference.locator);
        if !reader.exists(&absolute_path) {
            return Err(InkpostError::SourceNotFound {
                path: absolute_path,
            });
        }
        let class = if strict_formats {
            classify_strict(&absolute_path)?
        } else {
            classify(&absolute_path)
        };
        debug!(
            node = %reference.node,
            path = %absolute_path.display(),
            kind = class.kind.label(),
            "resolved image reference"
        );
        resolved.push(ResolvedSource {
            reference: reference.clone(),
            absolute_path,
            kind: class.kind,
            mime: class.mime,
        });
    }
    Ok(resolved)
}
