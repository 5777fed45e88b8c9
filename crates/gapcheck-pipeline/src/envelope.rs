//! JSON response envelope returned to callers of a single analysis request.

use std::path::Path;

use gapcheck_core::{ExecutiveSummary, GapRecord, Requirement};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::state::AnalysisResult;

pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub regulatory_document: String,
    pub internal_document: String,
    /// `YYYY-MM-DD`, local time.
    pub analysis_date: String,
    pub agent_version: String,
    pub request_id: String,
}

impl AnalysisMetadata {
    /// Metadata for a request started now, with a fresh v4 request id.
    pub fn new(regulatory_doc: &Path, internal_doc: &Path) -> Self {
        Self {
            regulatory_document: display_name(regulatory_doc),
            internal_document: display_name(internal_doc),
            analysis_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            agent_version: AGENT_VERSION.to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub analysis_metadata: AnalysisMetadata,
    pub executive_summary: ExecutiveSummary,
    pub gaps: Vec<GapRecord>,
    pub regulatory_requirements: Vec<Requirement>,
    /// Degradations absorbed during the run; omitted when there were none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<ReportData>,
}

impl AnalysisReport {
    pub fn success(metadata: AnalysisMetadata, result: AnalysisResult) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: "Analysis completed successfully".to_string(),
            data: Some(ReportData {
                analysis_metadata: metadata,
                executive_summary: result.executive_summary,
                gaps: result.identified_gaps,
                regulatory_requirements: result.regulatory_requirements,
                warnings: result.errors,
            }),
        }
    }

    pub fn failure(error: &PipelineError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: format!("Analysis failed: {error}"),
            data: None,
        }
    }

    pub fn from_outcome(
        metadata: AnalysisMetadata,
        outcome: Result<AnalysisResult, PipelineError>,
    ) -> Self {
        match outcome {
            Ok(result) => Self::success(metadata, result),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentRole;
    use crate::state::PipelineStatus;

    fn result() -> AnalysisResult {
        AnalysisResult {
            status: PipelineStatus::ReportGenerated,
            executive_summary: ExecutiveSummary::default(),
            identified_gaps: Vec::new(),
            regulatory_requirements: vec![Requirement::extraction_failed()],
            errors: Vec::new(),
        }
    }

    #[test]
    fn metadata_uses_file_names_and_fresh_ids() {
        let a = AnalysisMetadata::new(Path::new("/tmp/up/reg.pdf"), Path::new("/tmp/up/policy.docx"));
        let b = AnalysisMetadata::new(Path::new("reg.pdf"), Path::new("policy.docx"));
        assert_eq!(a.regulatory_document, "reg.pdf");
        assert_eq!(a.internal_document, "policy.docx");
        assert_eq!(a.agent_version, AGENT_VERSION);
        assert_ne!(a.request_id, b.request_id);
        assert!(uuid::Uuid::parse_str(&a.request_id).is_ok());
        assert!(chrono::NaiveDate::parse_from_str(&a.analysis_date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn success_envelope_shape() {
        let metadata = AnalysisMetadata::new(Path::new("reg.txt"), Path::new("int.txt"));
        let report = AnalysisReport::success(metadata, result());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["executive_summary"]["overall_compliance_score"], 0.0);
        assert_eq!(json["data"]["regulatory_requirements"][0]["id"], "ERR-001");
        assert!(json["data"]["gaps"].as_array().unwrap().is_empty());
        assert!(json["data"].get("warnings").is_none());
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let err = PipelineError::EmptyDocument {
            role: DocumentRole::InternalPolicy,
            path: "missing.txt".into(),
        };
        let metadata = AnalysisMetadata::new(Path::new("reg.txt"), Path::new("missing.txt"));
        let report = AnalysisReport::from_outcome(metadata, Err(err));

        assert!(!report.is_success());
        assert!(report.message.starts_with("Analysis failed: "));
        assert!(report.message.contains("internal policy"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["data"].is_null());
    }
}
