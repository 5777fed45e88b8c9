//! Human-readable terminal output. Everything here goes to stderr except the
//! chunk listing, which is the command's output.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gapcheck_core::{Chunk, chunk_text};
use gapcheck_pipeline::AnalysisReport;
use gapcheck_store::FileLoader;

const PREVIEW_CHARS: usize = 72;

pub fn print_chunks(path: &Path, size: usize, overlap: usize, full: bool) -> anyhow::Result<()> {
    let text = FileLoader::new()
        .try_load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let chunks = chunk_text(&text, &path.to_string_lossy(), size, overlap);

    eprintln!(
        "  {} chars -> {} chunks (size {size}, overlap {overlap})",
        text.chars().count(),
        chunks.len()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!("{}", chunk_line(i, chunk));
        if full {
            println!("{}\n", chunk.text);
        }
    }
    Ok(())
}

fn chunk_line(i: usize, chunk: &Chunk) -> String {
    format!(
        "[{i:>3}] @{:<7} {:>5} chars (+{} overlap)  {}",
        chunk.start,
        chunk.text.chars().count(),
        chunk.overlap,
        preview(chunk.fresh_text())
    )
}

fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((i, _)) => format!("{}...", &flat[..i]),
        None => flat,
    }
}

pub fn print_summary(report: &AnalysisReport, elapsed: Duration) {
    let Some(data) = &report.data else {
        eprintln!("  {}", report.message);
        return;
    };
    let summary = &data.executive_summary;
    eprintln!();
    eprintln!("  Compliance score   {:.2}%", summary.overall_compliance_score);
    eprintln!("  Requirements       {}", summary.total_requirements);
    eprintln!("  Gaps identified    {}", summary.gaps_identified);
    eprintln!("  Critical gaps      {}", summary.critical_gaps);
    for gap in data.gaps.iter().filter(|g| !g.is_compliant()) {
        eprintln!(
            "    {:<10} {:<12} {:<8} {}",
            gap.id,
            gap.internal_coverage.status.as_str(),
            gap.internal_coverage.severity.as_str(),
            preview(&gap.regulatory_reference.text)
        );
    }
    if !data.warnings.is_empty() {
        eprintln!("  {} degradation(s):", data.warnings.len());
        for w in &data.warnings {
            eprintln!("    - {w}");
        }
    }
    eprintln!("  Done in {:.1}s", elapsed.as_secs_f64());
}
