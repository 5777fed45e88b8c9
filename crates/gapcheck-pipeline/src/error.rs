use std::fmt;
use std::path::PathBuf;

use gapcheck_ai::IndexError;
use gapcheck_core::ConfigError;
use thiserror::Error;

/// Which input a document-level failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Regulatory,
    InternalPolicy,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regulatory => "regulatory",
            Self::InternalPolicy => "internal policy",
        })
    }
}

/// Conditions that abort a run. Everything else degrades the report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load {role} document {}: no text extracted", .path.display())]
    EmptyDocument { role: DocumentRole, path: PathBuf },

    #[error("failed to build semantic index: {0}")]
    Index(#[from] IndexError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
