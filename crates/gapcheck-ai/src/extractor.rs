//! Requirement extraction from regulatory text.
//!
//! Only the leading chunks of the regulatory document are sent to the oracle
//! so the prompt fits its context window; requirements that appear later in
//! a long document are not extracted.

use std::sync::Arc;

use gapcheck_core::{Chunk, Requirement, Tier};
use thiserror::Error;
use tracing::{info, warn};

use crate::oracle::{GenerateRequest, Oracle, OracleError};
use crate::structured::{self, Parsed};

// ── Prompt templates ──

const SYSTEM_PROMPT: &str = "\
You are an expert compliance officer. Your task is to extract actionable \
requirements from the regulatory text you are given.

RULES:
1. Return ONLY a JSON array. No markdown fences, no explanation, just raw JSON.
2. Do not add conversational text.
3. If the text contains no requirements, return an empty array [].

JSON FORMAT:
[
  {
    \"id\": \"REQ-001\",
    \"text\": \"Exact requirement text...\",
    \"type\": \"mandatory\",
    \"section\": \"3.1\"
  }
]";

fn build_user_prompt(context: &str) -> String {
    format!("REGULATORY TEXT:\n{context}")
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("requirement extraction oracle call failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Extracted requirements, plus the reason when the placeholder was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub requirements: Vec<Requirement>,
    pub fallback_reason: Option<String>,
}

/// Turns regulatory chunks into a list of [`Requirement`]s via the oracle.
pub struct RequirementExtractor {
    oracle: Arc<dyn Oracle>,
    tier: Tier,
    chunk_limit: usize,
}

impl RequirementExtractor {
    pub const DEFAULT_CHUNK_LIMIT: usize = 10;

    pub fn new(oracle: Arc<dyn Oracle>, tier: Tier) -> Self {
        Self {
            oracle,
            tier,
            chunk_limit: Self::DEFAULT_CHUNK_LIMIT,
        }
    }

    /// Number of leading chunks included in the prompt.
    pub fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = limit.max(1);
        self
    }

    /// The text actually shown to the oracle.
    pub fn context_window(&self, chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .take(self.chunk_limit)
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Extract requirements in the oracle's order.
    ///
    /// Unparsable output yields the single extraction-failed placeholder
    /// (see [`Requirement::extraction_failed`]); a failed oracle call is an
    /// error. No chunks means no requirements and no oracle call.
    pub async fn extract(&self, chunks: &[Chunk]) -> Result<Extraction, ExtractionError> {
        if chunks.is_empty() {
            return Ok(Extraction {
                requirements: Vec::new(),
                fallback_reason: None,
            });
        }

        if chunks.len() > self.chunk_limit {
            info!(
                total = chunks.len(),
                used = self.chunk_limit,
                "regulatory text truncated for extraction"
            );
        }

        let request = GenerateRequest::new(build_user_prompt(&self.context_window(chunks)))
            .with_system_prompt(SYSTEM_PROMPT);
        let parsed = structured::generate_or(self.oracle.as_ref(), self.tier, &request, || {
            vec![Requirement::extraction_failed()]
        })
        .await?;

        let extraction = match parsed {
            Parsed::Valid(requirements) => Extraction {
                requirements,
                fallback_reason: None,
            },
            Parsed::Fallback { value, reason } => {
                warn!(reason = %reason, "requirement extraction failed; manual review required");
                Extraction {
                    requirements: value,
                    fallback_reason: Some(reason),
                }
            }
        };

        info!(
            count = extraction.requirements.len(),
            fallback = extraction.fallback_reason.is_some(),
            "extracted requirements"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Generation;
    use async_trait::async_trait;
    use gapcheck_core::{RequirementType, SENTINEL_REQUIREMENT_ID};
    use std::sync::Mutex;

    /// Returns a fixed response and records every prompt it receives.
    struct RecordingOracle {
        response: Result<String, String>,
        prompts: Mutex<Vec<(Tier, GenerateRequest)>>,
    }

    impl RecordingOracle {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(msg.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Oracle for RecordingOracle {
        async fn generate(
            &self,
            tier: Tier,
            request: &GenerateRequest,
        ) -> Result<Generation, OracleError> {
            self.prompts.lock().unwrap().push((tier, request.clone()));
            match &self.response {
                Ok(text) => Ok(Generation {
                    text: text.clone(),
                    tokens_used: 10,
                }),
                Err(msg) => Err(OracleError::Unavailable(msg.clone())),
            }
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                text: format!("Article {i}: the firm shall do thing {i}."),
                source_path: "reg.txt".into(),
                start: i * 40,
                overlap: 0,
            })
            .collect()
    }

    #[tokio::test]
    async fn extracts_in_oracle_order() {
        let oracle = RecordingOracle::replying(
            r#"[
                {"id": "REQ-002", "text": "Second listed first.", "type": "mandatory", "section": "2"},
                {"id": "REQ-001", "text": "First listed second.", "type": "mandatory", "section": "1"}
            ]"#,
        );
        let extractor = RequirementExtractor::new(oracle.clone(), Tier::Fast);
        let extraction = extractor.extract(&chunks(2)).await.unwrap();

        assert!(extraction.fallback_reason.is_none());
        let ids: Vec<&str> = extraction.requirements.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["REQ-002", "REQ-001"]);
        assert_eq!(oracle.prompts.lock().unwrap()[0].0, Tier::Fast);
    }

    #[tokio::test]
    async fn garbage_yields_single_sentinel() {
        let oracle = RecordingOracle::replying("Sure! Here are the requirements: none, really.");
        let extractor = RequirementExtractor::new(oracle, Tier::Fast);
        let extraction = extractor.extract(&chunks(1)).await.unwrap();

        assert_eq!(extraction.requirements.len(), 1);
        let sentinel = &extraction.requirements[0];
        assert_eq!(sentinel.id, SENTINEL_REQUIREMENT_ID);
        assert_eq!(sentinel.kind, RequirementType::Manual);
        assert!(extraction.fallback_reason.is_some());
    }

    #[tokio::test]
    async fn empty_array_is_a_real_result() {
        let oracle = RecordingOracle::replying("[]");
        let extractor = RequirementExtractor::new(oracle, Tier::Fast);
        let extraction = extractor.extract(&chunks(3)).await.unwrap();
        assert!(extraction.requirements.is_empty());
        assert!(extraction.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn duplicate_and_missing_ids_pass_through() {
        let oracle = RecordingOracle::replying(
            r#"[{"id": "R1", "text": "a"}, {"id": "R1", "text": "b"}, {"text": "c"}]"#,
        );
        let extractor = RequirementExtractor::new(oracle, Tier::Fast);
        let reqs = extractor.extract(&chunks(1)).await.unwrap().requirements;
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].id, reqs[1].id);
        assert_eq!(reqs[2].id, "");
    }

    #[tokio::test]
    async fn oracle_failure_is_typed() {
        let oracle = RecordingOracle::failing("429 Too Many Requests");
        let extractor = RequirementExtractor::new(oracle, Tier::Fast);
        let err = extractor.extract(&chunks(1)).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Oracle(OracleError::Unavailable(_))));
    }

    #[tokio::test]
    async fn only_leading_chunks_are_sent() {
        let oracle = RecordingOracle::replying("[]");
        let extractor = RequirementExtractor::new(oracle.clone(), Tier::Fast).with_chunk_limit(2);
        extractor.extract(&chunks(5)).await.unwrap();

        let prompts = oracle.prompts.lock().unwrap();
        let user = &prompts[0].1.user_prompt;
        assert!(user.contains("Article 0"));
        assert!(user.contains("Article 1"));
        assert!(!user.contains("Article 2"));
        assert!(prompts[0].1.system_prompt.as_deref().unwrap().contains("JSON array"));
    }

    #[tokio::test]
    async fn no_chunks_skips_oracle() {
        let oracle = RecordingOracle::replying("[]");
        let extractor = RequirementExtractor::new(oracle.clone(), Tier::Fast);
        let extraction = extractor.extract(&[]).await.unwrap();
        assert!(extraction.requirements.is_empty());
        assert_eq!(oracle.calls(), 0);
    }
}
