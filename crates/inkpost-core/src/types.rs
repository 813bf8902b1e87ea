// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for image embedding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Prefix of an inline data locator.
pub const DATA_URI_SCHEME: &str = "data:";

/// Where the bytes behind an image locator live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// A path on disk, relative to the document's base directory.
    Local,
    /// An `http://` or `https://` URL. Left untouched.
    Remote,
    /// Already an inline `data:` URI. Left untouched.
    AlreadyEmbedded,
}

impl SourceType {
    /// Classify a raw locator. `data:` wins over network schemes, and
    /// anything else is treated as a local path.
    pub fn classify(locator: &str) -> Self {
        if locator.starts_with(DATA_URI_SCHEME) {
            Self::AlreadyEmbedded
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            Self::Remote
        } else {
            Self::Local
        }
    }
}

/// Semantic image kind. Each variant has exactly one encoding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    /// Resolution-independent markup (SVG). Embedded verbatim.
    Vector,
    /// Multi-frame raster (GIF). Frames are preserved while shrinking.
    AnimatedRaster,
    /// Everything else. Lossless first, lossy fallback.
    StaticRaster,
}

impl ImageKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::AnimatedRaster => "animated",
            Self::StaticRaster => "static",
        }
    }
}

/// A successfully encoded image, ready to be written into a `src` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOutcome {
    pub mime_type: &'static str,
    pub payload: Vec<u8>,
}

impl EncodingOutcome {
    pub fn new(mime_type: &'static str, payload: Vec<u8>) -> Self {
        Self { mime_type, payload }
    }

    /// Size of the raw (pre-base64) payload.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        format!(
            "{DATA_URI_SCHEME}{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.payload)
        )
    }
}
