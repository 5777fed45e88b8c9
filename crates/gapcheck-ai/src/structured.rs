//! Structured generation: invoke the oracle, parse its text as JSON.
//!
//! Models routinely wrap JSON in markdown fences or a sentence of preamble
//! even when told not to. Parsing first tries the raw text, then the fenced
//! body, then the outermost `[...]` and `{...}` spans; the first candidate
//! that deserializes into the target type wins.

use gapcheck_core::Tier;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::oracle::{GenerateRequest, Oracle, OracleError};

/// Longest prefix of raw oracle output kept in logs and errors.
const RAW_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum StructuredError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("malformed oracle output: {source}")]
    Format {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

/// Result of [`generate_or`].
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Valid(T),
    /// The output did not parse and the caller's fallback was substituted.
    Fallback { value: T, reason: String },
}

/// Generate and parse into `T`.
pub async fn generate_json<T: DeserializeOwned>(
    oracle: &dyn Oracle,
    tier: Tier,
    request: &GenerateRequest,
) -> Result<T, StructuredError> {
    let generation = oracle.generate(tier, request).await?;
    parse_json(&generation.text).map_err(|source| {
        warn!(
            error = %source,
            raw = excerpt(&generation.text),
            "oracle output did not match the requested structure"
        );
        StructuredError::Format {
            source,
            raw: generation.text,
        }
    })
}

/// Generate and parse into `T`, substituting `fallback()` when the output is
/// malformed. Oracle call failures are still returned as errors.
pub async fn generate_or<T, F>(
    oracle: &dyn Oracle,
    tier: Tier,
    request: &GenerateRequest,
    fallback: F,
) -> Result<Parsed<T>, OracleError>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match generate_json(oracle, tier, request).await {
        Ok(value) => Ok(Parsed::Valid(value)),
        Err(StructuredError::Format { source, .. }) => Ok(Parsed::Fallback {
            value: fallback(),
            reason: source.to_string(),
        }),
        Err(StructuredError::Oracle(e)) => Err(e),
    }
}

/// Parse oracle text as JSON, tolerating fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    let first_err = match serde_json::from_str(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    let candidates = [
        strip_fences(trimmed),
        outer_span(trimmed, '[', ']'),
        outer_span(trimmed, '{', '}'),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(v) = serde_json::from_str(candidate) {
            return Ok(v);
        }
    }
    Err(first_err)
}

fn strip_fences(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    let end = body.rfind("```")?;
    Some(body[..end].trim())
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

pub(crate) fn excerpt(raw: &str) -> &str {
    match raw.char_indices().nth(RAW_EXCERPT_CHARS) {
        Some((i, _)) => &raw[..i],
        None => raw,
    }
}
