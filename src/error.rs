//! Error types for the report pipeline.
//!
//! Expected failures are absorbed where they happen (agent, formatter,
//! renderer); only `NoContent` and unexpected faults reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No text available for analysis.")]
    NoContent,

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the language-model collaborator.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to Ollama at {0}")]
    Connect(String),

    #[error("Ollama API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to send request: {0}")]
    Request(String),

    #[error("Failed to parse model response: {0}")]
    Decode(String),

    #[error("Model returned an empty response")]
    Empty,
}

/// Failures of the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to walk record directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Failures of the chart and document renderers.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Chart data has no values")]
    EmptyChart,

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
