// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inkpost — render documents into publishing-platform-safe HTML.
//
// Entry point. Initialises logging, resolves the optional diagram renderer,
// runs the render pipeline, and prints a JSON summary.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use inkpost_core::EmbedConfig;
use inkpost_core::error::Result;
use inkpost_core::human_errors::humanize_error;
use inkpost_embed::{DiagramRenderer, MmdcRenderer};

use render::{OutputFormat, RenderOptions};

#[derive(Debug, Parser)]
#[command(name = "inkpost", version, about = "Convert a document tree into publishing-platform-safe HTML")]
struct Cli {
    /// Input document tree (JSON).
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path.
    #[arg(short, long)]
    output: PathBuf,

    /// Output serialisation.
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,

    /// Directory relative image paths are resolved against.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Embedding configuration (JSON).
    #[arg(short, long, env = "INKPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Override the per-image byte budget.
    #[arg(long)]
    budget: Option<usize>,
}

fn load_config(cli: &Cli) -> Result<EmbedConfig> {
    let mut config = match &cli.config {
        Some(path) => EmbedConfig::from_path(path)?,
        None => EmbedConfig::default(),
    };
    if let Some(budget) = cli.budget {
        config.budget_bytes = budget;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: &Cli) -> Result<render::RenderSummary> {
    let options = RenderOptions {
        config: load_config(cli)?,
        input: cli.input.clone(),
        output: cli.output.clone(),
        format: cli.format,
        base_dir: cli.base_dir.clone(),
    };
    let renderer = MmdcRenderer::discover();
    render::render(&options, renderer.as_ref().map(|r| r as &dyn DiagramRenderer)).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Inkpost starting");

    let outcome = run(&cli).await;

    match outcome {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to serialise summary");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::error!(error = %err, "render failed");
            let human = humanize_error(&err);
            eprintln!("Error: {}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}
