//! AI layer: embeddings, semantic retrieval, and oracle-driven requirement
//! extraction and gap analysis.

pub mod analyzer;
pub mod embed;
#[cfg(feature = "onnx")]
mod embedder;
pub mod extractor;
#[cfg(feature = "http")]
pub mod http;
pub mod index;
pub mod oracle;
pub mod structured;

pub use analyzer::{Analysis, AnalysisFailure, GapAnalyzer, NO_CONTEXT_MARKER};
pub use embed::{Embed, HashEmbedder};
#[cfg(feature = "onnx")]
pub use embedder::Embedder;
pub use extractor::{Extraction, ExtractionError, RequirementExtractor};
#[cfg(feature = "http")]
pub use http::{HttpOracle, OracleConfig};
pub use index::{Hit, IndexError, SemanticIndex};
pub use oracle::{GenerateRequest, Generation, Oracle, OracleError};
pub use structured::{Parsed, StructuredError};
