// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedding configuration. One value is built at startup and shared read-only
// (behind an `Arc`) by every encode task.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InkpostError, Result};

/// Hard byte ceiling for a single embedded image (2 MiB).
pub const DEFAULT_BUDGET_BYTES: usize = 2 * 1024 * 1024;

/// Minimum width the shrink ladder will step down to.
pub const DEFAULT_SHRINK_FLOOR: u32 = 100;

/// Tuning for the size-constrained encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Maximum payload size, in bytes, of any embedded raster image.
    pub budget_bytes: usize,
    /// Width floor shared by every raster ladder.
    pub shrink_floor: u32,
    /// Per-step width multiplier for static rasters.
    pub static_shrink_factor: f64,
    /// Per-step width multiplier for animated rasters.
    pub animated_shrink_factor: f64,
    /// First re-encode width tried for animated rasters.
    pub animated_start_width: u32,
    /// Static rasters wider than this are capped before the first attempt.
    pub max_width: u32,
    /// Lossy qualities tried at each width, highest first.
    pub jpeg_qualities: Vec<u8>,
    /// RGB background used when flattening transparency for lossy output.
    pub flatten_background: [u8; 3],
    /// Reject rasters whose width or height is below this many pixels.
    pub min_dimension: Option<u32>,
    /// Fail on unknown extensions instead of treating them as PNG.
    pub strict_formats: bool,
    /// Images decoded and encoded at the same time. `None` uses the number
    /// of available CPUs.
    pub max_concurrency: Option<usize>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            shrink_floor: DEFAULT_SHRINK_FLOOR,
            static_shrink_factor: 0.8,
            animated_shrink_factor: 0.7,
            animated_start_width: 1080,
            max_width: 4096,
            jpeg_qualities: vec![85, 70, 50],
            flatten_background: [255, 255, 255],
            min_dimension: None,
            strict_formats: false,
            max_concurrency: None,
        }
    }
}

impl EmbedConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which the ladder could not terminate or could
    /// never produce a candidate.
    pub fn validate(&self) -> Result<()> {
        if self.budget_bytes == 0 {
            return Err(InkpostError::Config("budget_bytes must be positive".into()));
        }
        if self.shrink_floor == 0 {
            return Err(InkpostError::Config("shrink_floor must be positive".into()));
        }
        for (name, factor) in [
            ("static_shrink_factor", self.static_shrink_factor),
            ("animated_shrink_factor", self.animated_shrink_factor),
        ] {
            if !(factor > 0.0 && factor < 1.0) {
                return Err(InkpostError::Config(format!(
                    "{name} must be between 0 and 1 (exclusive), got {factor}"
                )));
            }
        }
        if self.jpeg_qualities.is_empty() {
            return Err(InkpostError::Config("jpeg_qualities must not be empty".into()));
        }
        if let Some(q) = self.jpeg_qualities.iter().find(|q| **q == 0 || **q > 100) {
            return Err(InkpostError::Config(format!(
                "jpeg quality {q} is outside 1..=100"
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(InkpostError::Config("max_concurrency must be positive".into()));
        }
        Ok(())
    }

    /// Resolved limit on concurrent encode tasks. Always at least 1.
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from))
            .max(1)
    }
}
