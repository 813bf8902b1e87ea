// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render pipeline — load the document tree, render diagrams, embed images,
// write the result.

use std::path::{Path, PathBuf};
use std::time::Instant;

use inkpost_core::error::Result;
use inkpost_core::{Document, EmbedConfig};
use inkpost_embed::{DiagramRenderer, EmbedReport, ImageEmbedder, render_diagrams};
use serde::Serialize;
use tracing::info;

/// Serialisation of the finished document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Html,
    Json,
}

/// What a render needs to know.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Directory relative image paths resolve against. Defaults to the
    /// input file's directory.
    pub base_dir: Option<PathBuf>,
    pub config: EmbedConfig,
}

/// Printed to stdout as JSON after a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub diagrams: usize,
    pub images: EmbedReport,
    pub elapsed_ms: u64,
}

pub async fn render(
    options: &RenderOptions,
    renderer: Option<&dyn DiagramRenderer>,
) -> Result<RenderSummary> {
    let started = Instant::now();
    let raw = std::fs::read_to_string(&options.input)?;
    let mut doc: Document = serde_json::from_str(&raw)?;
    info!(input = %options.input.display(), "document loaded");

    let diagrams = render_diagrams(&mut doc, renderer)?;

    let base_dir = options
        .base_dir
        .clone()
        .unwrap_or_else(|| parent_dir(&options.input));
    let embedder = ImageEmbedder::with_config(options.config.clone());
    let images = embedder.embed(&mut doc, &base_dir).await?;

    let rendered = match options.format {
        OutputFormat::Html => doc.to_html(),
        OutputFormat::Json => serde_json::to_string_pretty(&doc)?,
    };
    std::fs::write(&options.output, rendered)?;
    info!(output = %options.output.display(), "document written");

    Ok(RenderSummary {
        input: options.input.clone(),
        output: options.output.clone(),
        diagrams,
        images,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
