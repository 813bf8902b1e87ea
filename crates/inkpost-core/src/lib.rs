// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inkpost — Core types, document tree, and error definitions shared across all
// crates.

pub mod config;
pub mod document;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::EmbedConfig;
pub use document::{Document, NodeData, NodeId};
pub use error::InkpostError;
pub use types::*;
