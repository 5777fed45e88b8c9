//! Pipeline configuration shared by the library crates and the CLI.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// Oracle capability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Low latency, used for bulk text processing.
    Fast,
    /// Slower, higher judgment quality.
    Reasoning,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Reasoning => "reasoning",
        }
    }
}

/// Which oracle tier each oracle-using stage runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiers {
    pub extraction: Tier,
    pub analysis: Tier,
}

impl Default for StageTiers {
    fn default() -> Self {
        Self {
            extraction: Tier::Fast,
            analysis: Tier::Reasoning,
        }
    }
}

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Leading regulatory chunks sent to the extraction oracle.
    pub extraction_chunk_limit: usize,
    /// Internal-policy chunks retrieved per requirement.
    pub retrieval_top_k: usize,
    /// Concurrent classification calls; 1 analyses requirements one at a time.
    pub analysis_concurrency: usize,
    pub tiers: StageTiers,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            extraction_chunk_limit: 10,
            retrieval_top_k: 3,
            analysis_concurrency: 1,
            tiers: StageTiers::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Zero("chunk_size"));
        }
        if self.extraction_chunk_limit == 0 {
            return Err(ConfigError::Zero("extraction_chunk_limit"));
        }
        if self.retrieval_top_k == 0 {
            return Err(ConfigError::Zero("retrieval_top_k"));
        }
        if self.analysis_concurrency == 0 {
            return Err(ConfigError::Zero("analysis_concurrency"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }
}
