// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size-constrained encoder.
//
// Each image kind has one degradation ladder. Candidates are tried from the
// highest fidelity down and the first one that fits the budget is returned.
// Every ladder is finite: widths shrink by a fixed factor and stop at the
// configured floor.

use inkpost_core::error::{InkpostError, Result};
use inkpost_core::{EmbedConfig, EncodingOutcome, ImageKind};
use tracing::{debug, info, instrument, warn};

use crate::classify::{GIF_MIME, JPEG_MIME, PNG_MIME};
use crate::codec::{EncodeParams, ImageCodec, ImageInfo};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF_SIGNATURE: &[u8] = b"GIF8";

/// Widths to attempt, starting at `start` and multiplying by `factor` until
/// the next width would drop below `floor` or stop shrinking.
///
/// The first element is always `start`, even when it is already below the
/// floor; every later element is strictly smaller than the one before it and
/// at least `floor`.
pub fn shrink_ladder(start: u32, factor: f64, floor: u32) -> Vec<u32> {
    let mut widths = vec![start];
    let mut width = start;
    loop {
        let next = (f64::from(width) * factor).floor() as u32;
        if next < floor || next >= width {
            break;
        }
        widths.push(next);
        width = next;
    }
    widths
}

/// Applies the per-kind ladder against a byte budget.
pub struct BudgetEncoder<'a> {
    codec: &'a dyn ImageCodec,
    config: &'a EmbedConfig,
}

impl<'a> BudgetEncoder<'a> {
    pub fn new(codec: &'a dyn ImageCodec, config: &'a EmbedConfig) -> Self {
        Self { codec, config }
    }

    /// Encode `bytes` so the payload fits `config.budget_bytes`.
    ///
    /// `source_id` only appears in logs and errors.
    #[instrument(skip(self, bytes, mime, kind), fields(kind = kind.label(), len = bytes.len()))]
    pub fn encode(
        &self,
        bytes: &[u8],
        kind: ImageKind,
        mime: &'static str,
        source_id: &str,
    ) -> Result<EncodingOutcome> {
        let outcome = match kind {
            ImageKind::Vector => self.encode_vector(bytes, mime, source_id),
            ImageKind::AnimatedRaster => self.encode_animated(bytes, source_id)?,
            ImageKind::StaticRaster => self.encode_static(bytes, mime, source_id)?,
        };
        info!(
            mime = outcome.mime_type,
            from = bytes.len(),
            to = outcome.len(),
            "image encoded"
        );
        Ok(outcome)
    }

    fn encode_vector(&self, bytes: &[u8], mime: &'static str, source_id: &str) -> EncodingOutcome {
        if bytes.len() > self.config.budget_bytes {
            warn!(
                source = source_id,
                len = bytes.len(),
                budget = self.config.budget_bytes,
                "vector image exceeds budget; embedding verbatim"
            );
        }
        EncodingOutcome::new(mime, bytes.to_vec())
    }

    fn encode_animated(&self, bytes: &[u8], source_id: &str) -> Result<EncodingOutcome> {
        let info = self.probe(bytes, source_id)?;
        let budget = self.config.budget_bytes;

        // A real GIF is its own native-resolution, all-frames candidate.
        // Anything else goes through the encoder so the label stays honest.
        if bytes.starts_with(GIF_SIGNATURE) && bytes.len() <= budget {
            return Ok(EncodingOutcome::new(GIF_MIME, bytes.to_vec()));
        }

        let start = info.width.min(self.config.animated_start_width);
        let mut best = bytes.len();
        for width in shrink_ladder(start, self.config.animated_shrink_factor, self.config.shrink_floor) {
            let out = self.codec.encode(bytes, &EncodeParams::animated_gif(width))?;
            debug!(width, len = out.len(), budget, "animated attempt");
            if out.len() <= budget {
                return Ok(EncodingOutcome::new(GIF_MIME, out));
            }
            best = best.min(out.len());
        }
        Err(self.over_budget(source_id, best))
    }

    fn encode_static(&self, bytes: &[u8], mime: &'static str, source_id: &str) -> Result<EncodingOutcome> {
        let info = self.probe(bytes, source_id)?;
        let budget = self.config.budget_bytes;
        let start = info.width.min(self.config.max_width);

        // A PNG that needs no capping and already fits is its own lossless
        // native candidate.
        if mime == PNG_MIME
            && bytes.starts_with(PNG_SIGNATURE)
            && start == info.width
            && bytes.len() <= budget
        {
            debug!(len = bytes.len(), "PNG source fits budget as-is");
            return Ok(EncodingOutcome::new(PNG_MIME, bytes.to_vec()));
        }

        let widths = shrink_ladder(start, self.config.static_shrink_factor, self.config.shrink_floor);
        let mut best = usize::MAX;

        // Phase A: lossless.
        for &width in &widths {
            let out = self.codec.encode(bytes, &EncodeParams::png(width))?;
            debug!(width, len = out.len(), budget, "lossless attempt");
            if out.len() <= budget {
                return Ok(EncodingOutcome::new(PNG_MIME, out));
            }
            best = best.min(out.len());
        }

        // Phase B: lossy. Transparency is flattened, not preserved.
        let background = info.has_alpha.then_some(self.config.flatten_background);
        for &width in &widths {
            for &quality in &self.config.jpeg_qualities {
                let out = self
                    .codec
                    .encode(bytes, &EncodeParams::jpeg(width, quality, background))?;
                debug!(width, quality, len = out.len(), budget, "lossy attempt");
                if out.len() <= budget {
                    return Ok(EncodingOutcome::new(JPEG_MIME, out));
                }
                best = best.min(out.len());
            }
        }

        Err(self.over_budget(source_id, best))
    }

    fn probe(&self, bytes: &[u8], source_id: &str) -> Result<ImageInfo> {
        let info = self.codec.probe(bytes)?;
        if let Some(minimum) = self.config.min_dimension {
            if info.width < minimum || info.height < minimum {
                return Err(InkpostError::ImageTooSmall {
                    path: source_id.to_string(),
                    width: info.width,
                    height: info.height,
                    minimum,
                });
            }
        }
        Ok(info)
    }

    fn over_budget(&self, source_id: &str, best_size: usize) -> InkpostError {
        InkpostError::OverBudget {
            path: source_id.to_string(),
            best_size,
            budget: self.config.budget_bytes,
        }
    }
}
