//! Text-generation capability consumed by extraction and analysis.
//!
//! An oracle takes a prompt and returns text. Nothing about the text is
//! guaranteed: callers that need structure go through [`crate::structured`].

use async_trait::async_trait;
use gapcheck_core::Tier;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("oracle returned no content")]
    EmptyResponse,

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// A single prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerateRequest {
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Deterministic (temperature 0) request with the default token budget.
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Raw oracle output.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub tokens_used: u32,
}

/// Text generation at a given capability tier.
///
/// Calls are fallible (network, throttling, timeouts) and block the caller
/// until the implementation's own timeout fires.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn generate(
        &self,
        tier: Tier,
        request: &GenerateRequest,
    ) -> Result<Generation, OracleError>;
}
