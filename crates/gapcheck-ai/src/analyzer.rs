//! Per-requirement gap analysis against internal policy.
//!
//! Each requirement gets one retrieval (top-k policy chunks) and one
//! classification call. A failure on one requirement drops that requirement
//! and is reported in [`Analysis::failures`]; the rest of the batch proceeds.

use std::sync::Arc;

use futures::StreamExt;
use gapcheck_core::{Coverage, CoverageStatus, GapRecord, Requirement, Severity, Tier};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::index::SemanticIndex;
use crate::oracle::{GenerateRequest, Oracle};
use crate::structured::{self, StructuredError};

/// Substituted for empty retrieval so the oracle never sees blank context.
pub const NO_CONTEXT_MARKER: &str = "No relevant sections found.";

const DEFAULT_COVERAGE_TEXT: &str = "None";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_RECOMMENDATION: &str = "Review manually.";

/// A verdict is a short JSON object.
const VERDICT_MAX_TOKENS: u32 = 1024;

// ── Prompt templates ──

const SYSTEM_PROMPT: &str = "\
You compare a regulatory requirement against excerpts of an internal policy \
and judge whether the policy covers it.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"status\": \"compliant | missing | partial | conflicting\",
  \"coverage_text\": \"evidence quoted from the internal policy, or 'None'\",
  \"severity\": \"critical | high | medium | low\",
  \"confidence_score\": 0.9,
  \"recommendation\": \"action to take\"
}

Judge only from the excerpts provided. If they do not address the requirement, \
the status is \"missing\".";

fn build_user_prompt(requirement: &Requirement, context: &str) -> String {
    format!(
        "Regulatory requirement ({kind}): \"{text}\"\n\
         \n\
         Internal policy context:\n\
         {context}",
        kind = requirement.kind,
        text = requirement.text,
    )
}

// ── Types ──

/// Raw verdict as returned by the oracle; every field but `status` may be absent.
#[derive(Deserialize)]
struct Verdict {
    status: String,
    #[serde(default)]
    coverage_text: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    confidence_score: Option<serde_json::Value>,
    #[serde(default)]
    recommendation: Option<String>,
}

impl Verdict {
    fn into_coverage(self) -> Result<Coverage, String> {
        let status: CoverageStatus = self.status.parse().map_err(|e| format!("{e}"))?;

        let severity = match self.severity.as_deref().map(str::parse::<Severity>) {
            Some(Ok(s)) => s,
            Some(Err(e)) => {
                debug!(error = %e, "unrecognised severity, using default");
                Severity::default()
            }
            None => Severity::default(),
        };

        let confidence = self
            .confidence_score
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(|c| c as f32)
            .filter(|c| c.is_finite())
            .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0));

        Ok(Coverage {
            status,
            coverage_text: self
                .coverage_text
                .unwrap_or_else(|| DEFAULT_COVERAGE_TEXT.to_string()),
            severity,
            confidence_score: confidence,
            recommendation: self
                .recommendation
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
        })
    }
}

/// A requirement that produced no gap record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub requirement_id: String,
    pub reason: String,
}

/// Gap records in requirement order, plus the requirements that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub gaps: Vec<GapRecord>,
    pub failures: Vec<AnalysisFailure>,
}

/// Classifies each requirement's coverage by the internal policy.
pub struct GapAnalyzer {
    oracle: Arc<dyn Oracle>,
    tier: Tier,
    top_k: usize,
    concurrency: usize,
}

impl GapAnalyzer {
    pub const DEFAULT_TOP_K: usize = 3;

    pub fn new(oracle: Arc<dyn Oracle>, tier: Tier) -> Self {
        Self {
            oracle,
            tier,
            top_k: Self::DEFAULT_TOP_K,
            concurrency: 1,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k.max(1);
        self
    }

    /// Classification calls in flight at once. Output order is unaffected.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Analyze every requirement except the extraction-failed placeholder.
    ///
    /// Never fails as a whole: retrieval or classification errors drop the
    /// affected requirement only.
    pub async fn analyze(&self, requirements: &[Requirement], index: &SemanticIndex) -> Analysis {
        let mut analysis = Analysis::default();

        // Retrieval is local and cheap; do it up front so only oracle calls overlap.
        let mut jobs = Vec::with_capacity(requirements.len());
        for req in requirements {
            if req.is_sentinel() {
                debug!("skipping extraction-failed placeholder");
                continue;
            }
            match self.retrieve_context(req, index) {
                Ok(context) => jobs.push((req, context)),
                Err(reason) => drop_requirement(&mut analysis, req, reason),
            }
        }

        let results: Vec<_> = futures::stream::iter(jobs)
            .map(|(req, context)| async move { (req, self.classify(req, &context).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (req, result) in results {
            match result {
                Ok(coverage) => {
                    info!(id = %req.id, status = coverage.status.as_str(), "analyzed requirement");
                    analysis.gaps.push(GapRecord {
                        id: req.id.clone(),
                        regulatory_reference: req.clone(),
                        internal_coverage: coverage,
                    });
                }
                Err(reason) => drop_requirement(&mut analysis, req, reason),
            }
        }

        info!(
            analyzed = analysis.gaps.len(),
            dropped = analysis.failures.len(),
            "gap analysis complete"
        );
        analysis
    }

    fn retrieve_context(&self, req: &Requirement, index: &SemanticIndex) -> Result<String, String> {
        let hits = index
            .query(&req.text, self.top_k)
            .map_err(|e| format!("retrieval failed: {e}"))?;
        // Blank chunks carry no evidence and are not shown to the oracle.
        let sections: Vec<&str> = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect();
        if sections.is_empty() {
            debug!(id = %req.id, "no relevant policy sections retrieved");
            return Ok(NO_CONTEXT_MARKER.to_string());
        }
        Ok(sections.join("\n"))
    }

    async fn classify(&self, req: &Requirement, context: &str) -> Result<Coverage, String> {
        let request = GenerateRequest::new(build_user_prompt(req, context))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_max_tokens(VERDICT_MAX_TOKENS);
        let verdict: Verdict = structured::generate_json(self.oracle.as_ref(), self.tier, &request)
            .await
            .map_err(|e| match e {
                StructuredError::Oracle(e) => format!("classification call failed: {e}"),
                StructuredError::Format { source, .. } => format!("malformed verdict: {source}"),
            })?;
        verdict.into_coverage()
    }
}

fn drop_requirement(analysis: &mut Analysis, req: &Requirement, reason: String) {
    warn!(id = %req.id, reason = %reason, "requirement dropped from analysis");
    analysis.failures.push(AnalysisFailure {
        requirement_id: req.id.clone(),
        reason,
    });
}
