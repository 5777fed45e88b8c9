//! The four-stage controller.

use std::path::Path;
use std::sync::Arc;

use gapcheck_ai::{Embed, GapAnalyzer, Oracle, RequirementExtractor, SemanticIndex};
use gapcheck_core::{Chunk, PipelineConfig, Requirement, chunk_text, synthesize};
use gapcheck_store::{DocumentLoader, FileLoader};
use tracing::{debug, info, warn};

use crate::error::{DocumentRole, PipelineError};
use crate::state::{AnalysisResult, PipelineState, PipelineStatus, StateUpdate};

/// Runs documents → requirements → gaps → report.
///
/// Each run owns its chunks and index; a `Pipeline` may be shared across
/// concurrent runs.
pub struct Pipeline {
    config: PipelineConfig,
    oracle: Arc<dyn Oracle>,
    embedder: Arc<dyn Embed>,
    loader: Arc<dyn DocumentLoader>,
}

impl Pipeline {
    /// Create a pipeline reading documents with a plain [`FileLoader`].
    pub fn new(
        config: PipelineConfig,
        oracle: Arc<dyn Oracle>,
        embedder: Arc<dyn Embed>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            embedder,
            loader: Arc::new(FileLoader::new()),
        })
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all four stages.
    ///
    /// Fails only when a document yields no text or the index cannot be
    /// built; any other problem is recorded in the result's `errors`.
    pub async fn run_analysis(
        &self,
        regulatory_doc: &Path,
        internal_doc: &Path,
    ) -> Result<AnalysisResult, PipelineError> {
        Ok(self.run(regulatory_doc, internal_doc).await?.into())
    }

    /// Like [`run_analysis`](Self::run_analysis) but returns the full state.
    pub async fn run(
        &self,
        regulatory_doc: &Path,
        internal_doc: &Path,
    ) -> Result<PipelineState, PipelineError> {
        info!(
            regulatory = %regulatory_doc.display(),
            internal = %internal_doc.display(),
            "starting gap analysis"
        );
        let state = PipelineState::new(regulatory_doc, internal_doc);

        let update = self.process_documents(&state)?;
        let state = state.apply(update);

        let update = self.extract_requirements(&state).await;
        let state = state.apply(update);

        let update = self.analyze_gaps(&state).await?;
        let state = state.apply(update);

        let update = self.generate_report(&state);
        let state = state.apply(update);

        info!(
            requirements = state.regulatory_requirements.len(),
            gaps = state.identified_gaps.len(),
            degradations = state.errors.len(),
            status = state.status.as_str(),
            "gap analysis finished"
        );
        Ok(state)
    }

    /// Load and chunk both documents. Either one yielding no chunks is fatal.
    pub fn process_documents(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let internal = self.load_chunks(&state.internal_doc_path, DocumentRole::InternalPolicy)?;
        let regulatory = self.load_chunks(&state.regulatory_doc_path, DocumentRole::Regulatory)?;

        let mut update = StateUpdate::to(PipelineStatus::DocumentsProcessed);
        update.internal_policy_chunks = Some(internal);
        update.regulatory_chunks = Some(regulatory);
        Ok(update)
    }

    fn load_chunks(
        &self,
        path: &Path,
        role: DocumentRole,
    ) -> Result<Vec<Chunk>, PipelineError> {
        let text = self.loader.load(path);
        let chunks = chunk_text(
            &text,
            &path.to_string_lossy(),
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(PipelineError::EmptyDocument {
                role,
                path: path.to_path_buf(),
            });
        }
        info!(role = %role, chunks = chunks.len(), "document chunked");
        Ok(chunks)
    }

    /// Extract requirements from the leading regulatory chunks.
    ///
    /// Never fails: unparsable output and oracle failures both become the
    /// extraction-failed placeholder plus an entry in `errors`.
    pub async fn extract_requirements(&self, state: &PipelineState) -> StateUpdate {
        let extractor = RequirementExtractor::new(self.oracle.clone(), self.config.tiers.extraction)
            .with_chunk_limit(self.config.extraction_chunk_limit);

        let mut update = StateUpdate::to(PipelineStatus::RequirementsExtracted);
        let requirements = match extractor.extract(&state.regulatory_chunks).await {
            Ok(extraction) => {
                if let Some(reason) = extraction.fallback_reason {
                    update
                        .errors
                        .push(format!("requirement extraction fell back to manual review: {reason}"));
                }
                extraction.requirements
            }
            Err(e) => {
                warn!(error = %e, "requirement extraction failed; manual review required");
                update.errors.push(e.to_string());
                vec![Requirement::extraction_failed()]
            }
        };
        if requirements.is_empty() {
            info!("no requirements found in regulatory text");
        }
        update.regulatory_requirements = Some(requirements);
        update
    }

    /// Index the internal policy and classify every requirement against it.
    pub async fn analyze_gaps(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let index = SemanticIndex::build(state.internal_policy_chunks.clone(), self.embedder.clone())?;
        debug!(chunks = index.chunk_count(), "internal policy indexed");
        let analyzer = GapAnalyzer::new(self.oracle.clone(), self.config.tiers.analysis)
            .with_top_k(self.config.retrieval_top_k)
            .with_concurrency(self.config.analysis_concurrency);

        let analysis = analyzer.analyze(&state.regulatory_requirements, &index).await;

        let mut update = StateUpdate::to(PipelineStatus::GapsAnalyzed);
        update.errors = analysis
            .failures
            .into_iter()
            .map(|f| format!("requirement {:?} not analyzed: {}", f.requirement_id, f.reason))
            .collect();
        update.identified_gaps = Some(analysis.gaps);
        Ok(update)
    }

    /// Summarize the gap records. Never fails.
    pub fn generate_report(&self, state: &PipelineState) -> StateUpdate {
        let mut update = StateUpdate::to(PipelineStatus::ReportGenerated);
        update.executive_summary = Some(synthesize(&state.identified_gaps));
        update
    }
}
