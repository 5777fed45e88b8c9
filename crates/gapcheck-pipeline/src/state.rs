//! Run state and the per-stage updates merged into it.
//!
//! Stages never mutate [`PipelineState`] directly. Each one reads the state,
//! returns a [`StateUpdate`], and the controller folds the update in with
//! [`PipelineState::apply`].

use std::path::{Path, PathBuf};

use gapcheck_core::{Chunk, ExecutiveSummary, GapRecord, Requirement};
use serde::{Deserialize, Serialize};

/// Position in the linear stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Init,
    DocumentsProcessed,
    RequirementsExtracted,
    GapsAnalyzed,
    ReportGenerated,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DocumentsProcessed => "documents_processed",
            Self::RequirementsExtracted => "requirements_extracted",
            Self::GapsAnalyzed => "gaps_analyzed",
            Self::ReportGenerated => "report_generated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub regulatory_doc_path: PathBuf,
    pub internal_doc_path: PathBuf,
    pub regulatory_chunks: Vec<Chunk>,
    pub internal_policy_chunks: Vec<Chunk>,
    pub regulatory_requirements: Vec<Requirement>,
    pub identified_gaps: Vec<GapRecord>,
    pub executive_summary: Option<ExecutiveSummary>,
    pub status: PipelineStatus,
    /// Absorbed degradations, oldest first.
    pub errors: Vec<String>,
}

impl PipelineState {
    pub fn new(regulatory_doc_path: &Path, internal_doc_path: &Path) -> Self {
        Self {
            regulatory_doc_path: regulatory_doc_path.to_path_buf(),
            internal_doc_path: internal_doc_path.to_path_buf(),
            regulatory_chunks: Vec::new(),
            internal_policy_chunks: Vec::new(),
            regulatory_requirements: Vec::new(),
            identified_gaps: Vec::new(),
            executive_summary: None,
            status: PipelineStatus::Init,
            errors: Vec::new(),
        }
    }

    /// Merge a stage's output. Fields the update leaves as `None` are kept;
    /// errors are appended.
    pub fn apply(mut self, update: StateUpdate) -> Self {
        if let Some(chunks) = update.regulatory_chunks {
            self.regulatory_chunks = chunks;
        }
        if let Some(chunks) = update.internal_policy_chunks {
            self.internal_policy_chunks = chunks;
        }
        if let Some(requirements) = update.regulatory_requirements {
            self.regulatory_requirements = requirements;
        }
        if let Some(gaps) = update.identified_gaps {
            self.identified_gaps = gaps;
        }
        if let Some(summary) = update.executive_summary {
            self.executive_summary = Some(summary);
        }
        self.status = update.status;
        self.errors.extend(update.errors);
        self
    }
}

/// Output of one stage.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub status: PipelineStatus,
    pub regulatory_chunks: Option<Vec<Chunk>>,
    pub internal_policy_chunks: Option<Vec<Chunk>>,
    pub regulatory_requirements: Option<Vec<Requirement>>,
    pub identified_gaps: Option<Vec<GapRecord>>,
    pub executive_summary: Option<ExecutiveSummary>,
    pub errors: Vec<String>,
}

impl StateUpdate {
    /// An update that only advances the status.
    pub fn to(status: PipelineStatus) -> Self {
        Self {
            status,
            regulatory_chunks: None,
            internal_policy_chunks: None,
            regulatory_requirements: None,
            identified_gaps: None,
            executive_summary: None,
            errors: Vec::new(),
        }
    }
}

/// The caller-facing outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: PipelineStatus,
    pub executive_summary: ExecutiveSummary,
    pub identified_gaps: Vec<GapRecord>,
    pub regulatory_requirements: Vec<Requirement>,
    pub errors: Vec<String>,
}

impl From<PipelineState> for AnalysisResult {
    fn from(state: PipelineState) -> Self {
        Self {
            status: state.status,
            executive_summary: state.executive_summary.unwrap_or_default(),
            identified_gaps: state.identified_gaps,
            regulatory_requirements: state.regulatory_requirements,
            errors: state.errors,
        }
    }
}
