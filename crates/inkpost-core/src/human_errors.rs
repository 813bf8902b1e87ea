// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for authors running the converter.
//
// Every technical error is mapped to a plain summary with a concrete next
// step. Nothing in the pipeline retries, so the severity only tells the author
// whether to fix the document, the environment, or the configuration.

use crate::error::InkpostError;

/// Who has to act to clear the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The document (or one of its images) needs editing.
    FixDocument,
    /// A tool or dependency is missing from this machine.
    FixEnvironment,
    /// The configuration file or flags are wrong.
    FixConfig,
    /// Something unexpected; worth a bug report.
    Internal,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert an `InkpostError` into a `HumanError`.
pub fn humanize_error(err: &InkpostError) -> HumanError {
    match err {
        InkpostError::SourceNotFound { path } => HumanError {
            message: format!("An image referenced by the document is missing: {}", path.display()),
            suggestion: "Check the image path. Relative paths are resolved against the document's folder.".into(),
            severity: Severity::FixDocument,
        },

        InkpostError::UnsupportedFormat(ext) => HumanError {
            message: format!("Images of type \"{ext}\" can't be embedded."),
            suggestion: "Convert the image to PNG, JPEG, GIF, or SVG, or turn off strict_formats.".into(),
            severity: Severity::FixDocument,
        },

        InkpostError::OverBudget {
            path,
            best_size,
            budget,
        } => HumanError {
            message: format!(
                "{path} is still too large after compression ({:.1}MB, limit {:.1}MB).",
                mib(*best_size),
                mib(*budget)
            ),
            suggestion: "Crop the image, shorten the animation, or export it at a smaller size.".into(),
            severity: Severity::FixDocument,
        },

        InkpostError::CodecFailure(_) => HumanError {
            message: "One of the images couldn't be read.".into(),
            suggestion: "The file may be damaged or mislabelled. Re-export it from the original editor.".into(),
            severity: Severity::FixDocument,
        },

        InkpostError::ImageTooSmall {
            path,
            width,
            height,
            minimum,
        } => HumanError {
            message: format!("{path} is only {width}x{height} pixels."),
            suggestion: format!("Use an image at least {minimum} pixels on each side."),
            severity: Severity::FixDocument,
        },

        InkpostError::MissingCapability(detail) => HumanError {
            message: "The document contains diagrams, but no diagram renderer is installed.".into(),
            suggestion: format!("Install the mermaid CLI: npm install -g @mermaid-js/mermaid-cli ({detail})"),
            severity: Severity::FixEnvironment,
        },

        InkpostError::DiagramRender(detail) => HumanError {
            message: "A diagram couldn't be rendered.".into(),
            suggestion: format!("Check the diagram syntax. ({detail})"),
            severity: Severity::FixDocument,
        },

        InkpostError::Config(detail) => HumanError {
            message: "The configuration is invalid.".into(),
            suggestion: detail.clone(),
            severity: Severity::FixConfig,
        },

        InkpostError::Serialization(detail) => HumanError {
            message: "A JSON file couldn't be parsed.".into(),
            suggestion: format!("Check the input document and configuration files. ({detail})"),
            severity: Severity::FixConfig,
        },

        InkpostError::Io(io) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check that the paths exist and are accessible. ({io})"),
            severity: Severity::FixEnvironment,
        },

        InkpostError::Task(detail) => HumanError {
            message: "Something went wrong while processing images.".into(),
            suggestion: format!("Please report this. ({detail})"),
            severity: Severity::Internal,
        },
    }
}

fn mib(bytes: usize) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
