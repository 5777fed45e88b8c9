//! `gapcheck analyze`: one run, one JSON report.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use gapcheck_ai::{Embed, HashEmbedder, HttpOracle, OracleConfig};
use gapcheck_core::PipelineConfig;
use gapcheck_pipeline::{AnalysisMetadata, AnalysisReport, Pipeline};

use crate::AnalyzeArgs;
use crate::display;

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let config = pipeline_config(&args)?;
    let oracle = HttpOracle::new(OracleConfig {
        base_url: args.oracle.base_url.clone(),
        api_key: args.oracle.api_key.clone(),
        fast_model: args.oracle.fast_model.clone(),
        reasoning_model: args.oracle.reasoning_model.clone(),
        timeout: Duration::from_secs(args.oracle.timeout),
    })
    .context("creating oracle client")?;
    if args.oracle.api_key.is_none() {
        tracing::warn!("no API key set (GAPCHECK_API_KEY); requests are sent unauthenticated");
    }
    let embedder = load_embedder(args.model_dir.as_deref())?;

    let pipeline = Pipeline::new(config, Arc::new(oracle), embedder)?;
    tracing::debug!(config = ?pipeline.config(), "pipeline configured");

    let start = Instant::now();
    let metadata = AnalysisMetadata::new(&args.regulatory, &args.internal);
    let outcome = pipeline
        .run_analysis(&args.regulatory, &args.internal)
        .await;
    let report = AnalysisReport::from_outcome(metadata, outcome);

    if let (Some(path), Some(data)) = (&args.parquet, &report.data) {
        let rows = gapcheck_store::write_gaps_parquet(path, &data.gaps)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("  Wrote {rows} gap records to {}", path.display());
    }

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("  Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    display::print_summary(&report, start.elapsed());
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn pipeline_config(args: &AnalyzeArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    if let Some(k) = args.top_k {
        config.retrieval_top_k = k;
    }
    if let Some(n) = args.concurrency {
        config.analysis_concurrency = n;
    }
    config.validate().context("invalid pipeline configuration")?;
    Ok(config)
}

#[cfg(feature = "onnx")]
fn load_embedder(model_dir: Option<&Path>) -> anyhow::Result<Arc<dyn Embed>> {
    match model_dir {
        Some(dir) => {
            let embedder = gapcheck_ai::Embedder::load(dir)
                .with_context(|| format!("loading embedding model from {}", dir.display()))?;
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(HashEmbedder::default())),
    }
}

#[cfg(not(feature = "onnx"))]
fn load_embedder(model_dir: Option<&Path>) -> anyhow::Result<Arc<dyn Embed>> {
    if let Some(dir) = model_dir {
        anyhow::bail!(
            "--model-dir {} requires gapcheck built with the `onnx` feature",
            dir.display()
        );
    }
    Ok(Arc::new(HashEmbedder::default()))
}
