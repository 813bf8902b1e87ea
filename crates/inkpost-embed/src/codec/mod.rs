// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec module — the capability surface the encoder depends on, plus the
// production implementation backed by the `image` crate.

pub mod raster;

pub use raster::RasterCodec;

use inkpost_core::error::Result;

/// Dimensions and alpha presence of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
}

/// Output container for one encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless PNG at maximum compression.
    Png,
    /// Lossy JPEG at the given quality (1-100).
    Jpeg { quality: u8 },
    /// GIF with every source frame preserved.
    AnimatedGif,
}

/// Parameters for a single encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    /// Requested output width. Ignored when not smaller than the source.
    pub target_width: u32,
    /// Background to flatten transparency onto before encoding.
    pub background: Option<[u8; 3]>,
}

impl EncodeParams {
    pub fn png(target_width: u32) -> Self {
        Self {
            format: OutputFormat::Png,
            target_width,
            background: None,
        }
    }

    pub fn jpeg(target_width: u32, quality: u8, background: Option<[u8; 3]>) -> Self {
        Self {
            format: OutputFormat::Jpeg { quality },
            target_width,
            background,
        }
    }

    pub fn animated_gif(target_width: u32) -> Self {
        Self {
            format: OutputFormat::AnimatedGif,
            target_width,
            background: None,
        }
    }
}

/// Image decode/encode capability.
///
/// Implementations must be deterministic: the same bytes and params always
/// produce the same output, which is why nothing upstream retries.
pub trait ImageCodec: Send + Sync {
    /// Read dimensions and alpha presence without producing output.
    fn probe(&self, bytes: &[u8]) -> Result<ImageInfo>;

    /// Re-encode `bytes` according to `params`. Never upscales.
    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<Vec<u8>>;
}
