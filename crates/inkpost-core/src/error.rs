// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Inkpost.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Inkpost operations.
#[derive(Debug, Error)]
pub enum InkpostError {
    // -- Image embedding errors --
    #[error("image file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error(
        "image exceeds {budget} byte budget after all compression attempts: {path} (best {best_size} bytes)"
    )]
    OverBudget {
        path: String,
        best_size: usize,
        budget: usize,
    },

    #[error("image codec failed: {0}")]
    CodecFailure(String),

    #[error("image too small: {path} is {width}x{height}, minimum is {minimum}px")]
    ImageTooSmall {
        path: String,
        width: u32,
        height: u32,
        minimum: u32,
    },

    // -- Diagram rendering --
    #[error("missing capability: {0}")]
    MissingCapability(String),

    #[error("diagram rendering failed: {0}")]
    DiagramRender(String),

    // -- Configuration / runtime --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker task failed: {0}")]
    Task(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InkpostError>;
