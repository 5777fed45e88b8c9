//! Data contract passed between the analysis stages.
//!
//! Field names serialise in snake_case; this is also the shape the oracle is
//! asked to produce, so the same types double as the wire format of the report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Id of the placeholder requirement substituted when extraction fails.
pub const SENTINEL_REQUIREMENT_ID: &str = "ERR-001";

/// A bounded text segment of one source document.
///
/// `start` and `overlap` locate the chunk in its source: the chunk text is
/// `overlap` bytes carried over from the previous chunk followed by new
/// content beginning at byte `start` of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_path: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk that was not repeated from the previous chunk.
    pub fn fresh_text(&self) -> &str {
        self.text.get(self.overlap..).unwrap_or(&self.text)
    }
}

/// Requirement type as reported by the extraction oracle.
///
/// Anything other than the two known types is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementType {
    Mandatory,
    /// Only used by the extraction-failed placeholder.
    Manual,
    Other(String),
}

impl RequirementType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Manual => "manual",
            Self::Other(s) => s,
        }
    }
}

impl Default for RequirementType {
    fn default() -> Self {
        Self::Other("other".to_string())
    }
}

impl From<String> for RequirementType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "mandatory" => Self::Mandatory,
            "manual" => Self::Manual,
            "" => Self::default(),
            _ => Self::Other(s),
        }
    }
}

impl From<RequirementType> for String {
    fn from(t: RequirementType) -> Self {
        match t {
            RequirementType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete regulatory obligation.
///
/// `id` comes from the oracle and is not trusted: it may be empty or repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: RequirementType,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: String,
}

impl Requirement {
    /// The placeholder that stands in for a failed extraction.
    pub fn extraction_failed() -> Self {
        Self {
            id: SENTINEL_REQUIREMENT_ID.to_string(),
            text: "Manual Review Required - Automated extraction failed.".to_string(),
            kind: RequirementType::Manual,
            section: "N/A".to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_REQUIREMENT_ID
    }
}

/// Accept a string, a number, or null where a string is expected.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Error returned when an enum label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// How well the internal policy covers a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Compliant,
    Missing,
    Partial,
    Conflicting,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::Missing => "missing",
            Self::Partial => "partial",
            Self::Conflicting => "conflicting",
        }
    }
}

impl FromStr for CoverageStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compliant" => Ok(Self::Compliant),
            "missing" => Ok(Self::Missing),
            "partial" => Ok(Self::Partial),
            "conflicting" => Ok(Self::Conflicting),
            _ => Err(UnknownLabel {
                kind: "coverage status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(UnknownLabel {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// The oracle's verdict for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub status: CoverageStatus,
    pub coverage_text: String,
    pub severity: Severity,
    /// Always within `[0, 1]`.
    pub confidence_score: f32,
    pub recommendation: String,
}

/// Outcome of comparing one requirement against internal policy evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    pub id: String,
    pub regulatory_reference: Requirement,
    pub internal_coverage: Coverage,
}

impl GapRecord {
    pub fn is_compliant(&self) -> bool {
        self.internal_coverage.status == CoverageStatus::Compliant
    }
}

/// Aggregate view over all gap records of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    /// Percentage of compliant records, rounded to two decimals.
    pub overall_compliance_score: f64,
    pub total_requirements: usize,
    pub gaps_identified: usize,
    pub critical_gaps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_parses_oracle_shape() {
        let json = r#"{"id": "REQ-001", "text": "Keep records for five years.", "type": "mandatory", "section": "3.1"}"#;
        let req: Requirement = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, "REQ-001");
        assert_eq!(req.kind, RequirementType::Mandatory);
        assert_eq!(req.section, "3.1");
    }

    #[test]
    fn requirement_tolerates_missing_and_numeric_fields() {
        let json = r#"{"text": "Appoint a compliance officer.", "section": 4}"#;
        let req: Requirement = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, "");
        assert_eq!(req.section, "4");
        assert_eq!(req.kind.as_str(), "other");
    }

    #[test]
    fn requirement_without_text_is_rejected() {
        let json = r#"{"id": "REQ-002", "type": "mandatory"}"#;
        assert!(serde_json::from_str::<Requirement>(json).is_err());
    }

    #[test]
    fn unknown_requirement_type_is_kept() {
        let req: Requirement =
            serde_json::from_str(r#"{"text": "t", "type": "recommended"}"#).unwrap();
        assert_eq!(req.kind, RequirementType::Other("recommended".into()));
        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["type"], "recommended");
    }

    #[test]
    fn sentinel_is_manual() {
        let sentinel = Requirement::extraction_failed();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.kind, RequirementType::Manual);
        assert_eq!(serde_json::to_value(&sentinel).unwrap()["type"], "manual");
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(" Partial ".parse::<CoverageStatus>(), Ok(CoverageStatus::Partial));
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Critical));
        assert!("compliant | missing".parse::<CoverageStatus>().is_err());
    }

    #[test]
    fn chunk_fresh_text_skips_overlap() {
        let chunk = Chunk {
            text: "tail new content".into(),
            source_path: "doc.txt".into(),
            start: 42,
            overlap: 5,
        };
        assert_eq!(chunk.fresh_text(), "new content");
    }
}
