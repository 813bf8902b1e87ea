// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extension → (kind, MIME) mapping. Pure string work; files are never opened.

use std::path::Path;

use inkpost_core::ImageKind;
use inkpost_core::error::{InkpostError, Result};

/// MIME used for unknown extensions and for the lossless ladder.
pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
pub const GIF_MIME: &str = "image/gif";
pub const SVG_MIME: &str = "image/svg+xml";

/// Result of classifying a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ImageKind,
    pub mime: &'static str,
}

// New raster sub-formats are added here, never as new `ImageKind` variants.
const FORMAT_TABLE: &[(&str, ImageKind, &str)] = &[
    ("png", ImageKind::StaticRaster, PNG_MIME),
    ("jpg", ImageKind::StaticRaster, JPEG_MIME),
    ("jpeg", ImageKind::StaticRaster, JPEG_MIME),
    ("gif", ImageKind::AnimatedRaster, GIF_MIME),
    ("svg", ImageKind::Vector, SVG_MIME),
    ("webp", ImageKind::StaticRaster, "image/webp"),
    ("avif", ImageKind::StaticRaster, "image/avif"),
    ("tiff", ImageKind::StaticRaster, "image/tiff"),
    ("tif", ImageKind::StaticRaster, "image/tiff"),
];

const FALLBACK: Classification = Classification {
    kind: ImageKind::StaticRaster,
    mime: PNG_MIME,
};

fn lookup(path: &Path) -> Option<Classification> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    FORMAT_TABLE
        .iter()
        .find(|(known, _, _)| *known == ext)
        .map(|(_, kind, mime)| Classification {
            kind: *kind,
            mime: *mime,
        })
}

/// Classify by extension, defaulting unknown formats to PNG-family rasters.
pub fn classify(path: &Path) -> Classification {
    lookup(path).unwrap_or(FALLBACK)
}

/// Like [`classify`], but unknown extensions are an error.
pub fn classify_strict(path: &Path) -> Result<Classification> {
    lookup(path).ok_or_else(|| {
        InkpostError::UnsupportedFormat(
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("(no extension) {}", path.display())),
        )
    })
}
