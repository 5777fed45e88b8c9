mod analyze;
mod display;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gapcheck_ai::http::{DEFAULT_BASE_URL, DEFAULT_FAST_MODEL, DEFAULT_REASONING_MODEL};
use gapcheck_core::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "gapcheck", version, about = "Regulatory gap analysis against internal policy")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a regulatory document against an internal policy.
    Analyze(AnalyzeArgs),
    /// Show how a document is chunked.
    Chunks {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: usize,
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        overlap: usize,
        /// Print each chunk in full instead of a one-line preview.
        #[arg(long)]
        full: bool,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub regulatory: PathBuf,
    #[arg(long)]
    pub internal: PathBuf,

    /// Write the JSON report here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Also export gap records as Parquet.
    #[arg(long)]
    pub parquet: Option<PathBuf>,

    /// JSON pipeline configuration; flags below override it.
    #[arg(long, env = "GAPCHECK_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub chunk_size: Option<usize>,
    #[arg(long)]
    pub chunk_overlap: Option<usize>,
    #[arg(long)]
    pub top_k: Option<usize>,
    /// Concurrent classification calls.
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[command(flatten)]
    pub oracle: OracleArgs,

    /// Directory with `model.onnx` and `tokenizer.json`; hashing embedder when absent.
    #[arg(long, env = "GAPCHECK_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OracleArgs {
    #[arg(long, env = "GAPCHECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    #[arg(long, env = "GAPCHECK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "GAPCHECK_FAST_MODEL", default_value = DEFAULT_FAST_MODEL)]
    pub fast_model: String,
    #[arg(long, env = "GAPCHECK_REASONING_MODEL", default_value = DEFAULT_REASONING_MODEL)]
    pub reasoning_model: String,
    /// Per-request oracle timeout in seconds.
    #[arg(long, env = "GAPCHECK_TIMEOUT", default_value_t = 120)]
    pub timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();
    tracing::debug!("gapcheck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze(args) => analyze::run(args).await,
        Commands::Chunks {
            path,
            size,
            overlap,
            full,
        } => {
            display::print_chunks(&path, size, overlap, full)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
