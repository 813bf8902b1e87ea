// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkpost-embed — Inline media for publishing-platform-safe documents.
//
// Finds image references in a document tree, re-encodes local images into
// `data:` URIs that fit a hard byte budget (shrinking and falling back to
// lossy formats only as far as needed), and renders diagram blocks to inline
// PNGs through an optional renderer.

pub mod classify;
pub mod codec;
pub mod diagram;
pub mod encoder;
pub mod orchestrator;
pub mod scan;
pub mod source;

// Re-export the primary structs so callers can use `inkpost_embed::ImageEmbedder` etc.
pub use codec::{ImageCodec, RasterCodec};
pub use diagram::{DiagramRenderer, MmdcRenderer, render_diagrams};
pub use encoder::BudgetEncoder;
pub use orchestrator::{EmbedReport, ImageEmbedder};
pub use source::{FsReader, SourceReader};
