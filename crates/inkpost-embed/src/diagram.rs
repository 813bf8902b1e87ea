// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagram rendering — replaces `pre > code.language-mermaid` blocks with
// inline PNG images.
//
// The renderer is an optional capability resolved once at startup. When a
// document has no diagram blocks the renderer is never touched, so a missing
// or slow-to-start renderer costs nothing.

use std::ffi::OsString;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::ImageReader;
use inkpost_core::error::{InkpostError, Result};
use inkpost_core::{Document, EncodingOutcome, NodeData, NodeId};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::classify::PNG_MIME;

const MERMAID_CLASS: &str = "language-mermaid";
const DIAGRAM_STYLE: &str = "max-width: 100%; height: auto; display: block; margin: 1.5em auto;";

/// Output of a single diagram render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub png: Vec<u8>,
    /// Display width in CSS pixels (the PNG itself may be rendered at 2x).
    pub css_width: Option<u32>,
}

/// Renders a diagram definition to PNG.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, definition: &str) -> Result<RenderedDiagram>;
}

/// A diagram source block found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// The `pre` element to replace.
    pub node: NodeId,
    pub definition: String,
}

/// Every non-empty mermaid block, in document order.
pub fn collect_diagrams(doc: &Document) -> Vec<DiagramBlock> {
    doc.descendants()
        .into_iter()
        .filter(|id| doc.tag(*id) == Some("pre"))
        .filter_map(|pre| {
            let code = doc
                .node(pre)
                .children
                .iter()
                .copied()
                .find(|c| doc.tag(*c) == Some("code"))?;
            if !doc.classes(code).contains(&MERMAID_CLASS) {
                return None;
            }
            let definition = doc.text_content(code).trim().to_string();
            (!definition.is_empty()).then_some(DiagramBlock {
                node: pre,
                definition,
            })
        })
        .collect()
}

/// Render every diagram block and swap it for an `img`. Returns the number
/// of diagrams rendered.
///
/// Without diagrams this returns `Ok(0)` and never consults `renderer`.
/// With diagrams but no renderer it fails with
/// [`InkpostError::MissingCapability`].
#[instrument(skip_all)]
pub fn render_diagrams(doc: &mut Document, renderer: Option<&dyn DiagramRenderer>) -> Result<usize> {
    let blocks = collect_diagrams(doc);
    if blocks.is_empty() {
        return Ok(0);
    }
    let Some(renderer) = renderer else {
        return Err(InkpostError::MissingCapability(format!(
            "{} diagram(s) found but no renderer is available",
            blocks.len()
        )));
    };

    info!(count = blocks.len(), "rendering diagrams");
    for block in &blocks {
        let rendered = renderer.render(&block.definition)?;
        let src = EncodingOutcome::new(PNG_MIME, rendered.png).to_data_uri();
        let mut attributes = vec![
            ("src".to_string(), src),
            ("alt".to_string(), "mermaid diagram".to_string()),
        ];
        if let Some(width) = rendered.css_width {
            attributes.push(("width".to_string(), width.to_string()));
        }
        attributes.push(("style".to_string(), DIAGRAM_STYLE.to_string()));
        doc.replace(
            block.node,
            NodeData::Element {
                tag: "img".to_string(),
                attributes,
            },
        );
        debug!(node = %block.node, "diagram replaced");
    }
    Ok(blocks.len())
}

// -- mermaid CLI ---------------------------------------------------------------

const FONT_FAMILY: &str =
    r#"-apple-system, BlinkMacSystemFont, "PingFang SC", "Hiragino Sans GB", sans-serif"#;

/// Mermaid configuration: soft gray "base" theme with roomy flowcharts.
fn mermaid_config() -> serde_json::Value {
    json!({
        "theme": "base",
        "themeVariables": {
            "primaryColor": "#f6f8fa",
            "primaryTextColor": "#1d1d1f",
            "primaryBorderColor": "#e5e5ea",
            "lineColor": "#86868b",
            "secondaryColor": "#f6f8fa",
            "tertiaryColor": "#ffffff",
            "background": "#ffffff",
            "mainBkg": "#f6f8fa",
            "nodeBorder": "#e5e5ea",
            "nodeTextColor": "#1d1d1f",
            "clusterBkg": "#f6f8fa",
            "clusterBorder": "#e5e5ea",
            "titleColor": "#1d1d1f",
            "edgeLabelBackground": "#f6f8fa",
            "noteBorderColor": "#e5e5ea",
            "noteBkgColor": "#f6f8fa",
            "fontFamily": FONT_FAMILY,
            "fontSize": "14px",
        },
        "flowchart": {
            "curve": "basis",
            "nodeSpacing": 40,
            "rankSpacing": 50,
            "htmlLabels": true,
            "useMaxWidth": true,
            "subGraphTitleMargin": { "top": 15, "bottom": 15 },
            "padding": 20,
        },
    })
}

/// Renders through the mermaid CLI (`mmdc`).
#[derive(Debug, Clone)]
pub struct MmdcRenderer {
    program: PathBuf,
    scale: u32,
    background: String,
}

impl MmdcRenderer {
    pub const PROGRAM: &'static str = "mmdc";

    /// Look up `mmdc` on `PATH`. `None` means the capability is absent.
    pub fn discover() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        let program = std::env::split_paths(&path)
            .map(|dir| dir.join(Self::PROGRAM))
            .find(|candidate| candidate.is_file());
        match program {
            Some(program) => {
                debug!(program = %program.display(), "diagram renderer found");
                Some(Self::with_program(program))
            }
            None => {
                debug!("no diagram renderer on PATH");
                None
            }
        }
    }

    /// Use a specific binary; renders at 2x on white with the gray theme.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            scale: 2,
            background: "white".to_string(),
        }
    }
}

impl MmdcRenderer {
    fn args(&self, input: &Path, output: &Path, config: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.into(),
            "-o".into(),
            output.into(),
            "-c".into(),
            config.into(),
            "-s".into(),
            self.scale.to_string().into(),
            "-b".into(),
            self.background.as_str().into(),
            "-q".into(),
        ]
    }
}

impl DiagramRenderer for MmdcRenderer {
    #[instrument(skip(self, definition), fields(len = definition.len()))]
    fn render(&self, definition: &str) -> Result<RenderedDiagram> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("diagram.mmd");
        let output = workdir.path().join("diagram.png");
        let config = workdir.path().join("config.json");
        std::fs::write(&input, definition)?;
        std::fs::write(&config, serde_json::to_vec(&mermaid_config())?)?;

        let result = Command::new(&self.program)
            .args(self.args(&input, &output, &config))
            .output()
            .map_err(|err| {
                InkpostError::MissingCapability(format!(
                    "failed to launch {}: {err}",
                    self.program.display()
                ))
            })?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(status = %result.status, "diagram renderer failed");
            return Err(InkpostError::DiagramRender(stderr.trim().to_string()));
        }

        let png = std::fs::read(&output)?;
        let css_width = ImageReader::new(Cursor::new(&png))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .map(|(width, _)| width.div_ceil(self.scale));
        Ok(RenderedDiagram { png, css_width })
    }
}
