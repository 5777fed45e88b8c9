pub mod chunker;
pub mod config;
pub mod model;
pub mod report;
pub mod schema;

pub use chunker::chunk_text;
pub use config::{ConfigError, PipelineConfig, StageTiers, Tier};
pub use model::{
    Chunk, Coverage, CoverageStatus, ExecutiveSummary, GapRecord, Requirement, RequirementType,
    SENTINEL_REQUIREMENT_ID, Severity,
};
pub use report::synthesize;
pub use schema::gaps;
