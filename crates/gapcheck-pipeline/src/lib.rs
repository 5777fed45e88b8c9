//! Gap-analysis pipeline: a fixed four-stage sequence from two documents to
//! an executive summary.

mod controller;
mod envelope;
mod error;
mod state;

pub use controller::Pipeline;
pub use envelope::{AGENT_VERSION, AnalysisMetadata, AnalysisReport, ReportData, ResponseStatus};
pub use error::{DocumentRole, PipelineError};
pub use state::{AnalysisResult, PipelineState, PipelineStatus, StateUpdate};
