//! Structure-aware text chunking with overlap.
//!
//! Text is first cut into units at the coarsest boundary that brings every
//! unit under the target size (paragraph, line, sentence, word), falling back
//! to hard character cuts only for a single unbroken run longer than the
//! target. Units are then packed greedily into chunks. Every chunk after the
//! first starts with a tail of the previous chunk, so a clause straddling a
//! boundary appears whole in at least one retrieval window.
//!
//! Sizes are counted in characters, not bytes.

use crate::model::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Boundaries tried in order, coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Split `text` into chunks of at most `target_size` characters.
///
/// `overlap` is clamped below `target_size`. Whitespace-only input yields no
/// chunks. Concatenating [`Chunk::fresh_text`] over the result reproduces
/// `text` exactly.
pub fn chunk_text(text: &str, source_path: &str, target_size: usize, overlap: usize) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let target = target_size.max(1);
    let overlap = overlap.min(target - 1);

    let mut units = Vec::new();
    split_units(text, target, SEPARATORS, &mut units);

    let mut windows: Vec<Window> = Vec::new();
    let mut offset = 0;
    for unit in units {
        let chars = char_len(unit);
        let blank = unit.trim().is_empty();
        // The first chunk carries no overlap and may use the full target.
        let cap = if windows.len() == 1 {
            target
        } else {
            target - overlap
        };
        match windows.last_mut() {
            // Whitespace may use the overlap allowance to join the window it
            // trails, and content may do the same to join blank runs.
            Some(w)
                if w.chars + chars <= cap
                    || ((blank || w.blank) && w.chars + chars <= target) =>
            {
                w.end += unit.len();
                w.chars += chars;
                w.blank &= blank;
            }
            _ => windows.push(Window {
                start: offset,
                end: offset + unit.len(),
                chars,
                blank,
            }),
        }
        offset += unit.len();
    }

    let mut chunks: Vec<Chunk> = Vec::with_capacity(windows.len());
    for Window {
        start, end, chars, ..
    } in windows
    {
        let carry = overlap.min(target.saturating_sub(chars));
        let prefix = match chunks.last() {
            Some(prev) => overlap_tail(&prev.text, carry),
            None => "",
        };

        let mut body = String::with_capacity(prefix.len() + end - start);
        body.push_str(prefix);
        body.push_str(&text[start..end]);
        let overlap_bytes = prefix.len();

        chunks.push(Chunk {
            text: body,
            source_path: source_path.to_string(),
            start,
            overlap: overlap_bytes,
        });
    }

    tracing::debug!(
        source = source_path,
        chars = char_len(text),
        chunks = chunks.len(),
        "chunked document"
    );
    chunks
}

/// Byte range and char count of the new content of one chunk.
struct Window {
    start: usize,
    end: usize,
    chars: usize,
    /// Nothing but whitespace so far.
    blank: bool,
}

fn split_units<'a>(text: &'a str, target: usize, separators: &[&str], out: &mut Vec<&'a str>) {
    if char_len(text) <= target {
        out.push(text);
        return;
    }

    let Some((sep, finer)) = separators.split_first() else {
        hard_split(text, target, out);
        return;
    };

    // Separators stay attached to the unit they end, so units tile the text.
    let pieces: Vec<&str> = text.split_inclusive(sep).collect();
    if pieces.len() == 1 {
        split_units(text, target, finer, out);
        return;
    }
    for piece in pieces {
        split_units(piece, target, finer, out);
    }
}

fn hard_split<'a>(text: &'a str, target: usize, out: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == target {
            out.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
}

/// The last `max_chars` characters of `prev`, advanced past a partial word
/// when the tail would otherwise begin mid-word.
fn overlap_tail(prev: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    let start = prev
        .char_indices()
        .rev()
        .nth(max_chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let tail = &prev[start..];

    let mid_word = prev[..start]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace())
        && tail.chars().next().is_some_and(|c| !c.is_whitespace());
    if !mid_word {
        return tail;
    }
    match tail.find(char::is_whitespace) {
        Some(ws) => {
            let skip = tail[ws..].chars().next().map_or(0, char::len_utf8);
            &tail[ws + skip..]
        }
        None => tail,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk]) -> String {
        chunks.iter().map(Chunk::fresh_text).collect()
    }

    fn sample_policy() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Section {i}. The organisation shall retain records of each customer \
                 verification for no less than five years. Records must be retrievable \
                 within two business days on request by the supervisory authority.\n\n"
            ));
        }
        text
    }

    #[test]
    fn empty_and_whitespace_yield_nothing() {
        assert!(chunk_text("", "a.txt", 1000, 100).is_empty());
        assert!(chunk_text("  \n\n\t ", "a.txt", 1000, 100).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("All staff must complete AML training.", "p.txt", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "All staff must complete AML training.");
        assert_eq!(chunks[0].overlap, 0);
        assert_eq!(chunks[0].source_path, "p.txt");
    }

    #[test]
    fn chunks_respect_target_size() {
        let text = sample_policy();
        let chunks = chunk_text(&text, "p.txt", 1000, 100);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            let n = c.text.chars().count();
            assert!(n <= 1000, "chunk {i} has {n} chars");
        }
    }

    #[test]
    fn fresh_portions_reconstruct_source() {
        let text = sample_policy();
        let chunks = chunk_text(&text, "p.txt", 300, 50);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn overlap_comes_from_previous_chunk_tail() {
        let text = sample_policy();
        let chunks = chunk_text(&text, "p.txt", 400, 80);
        for pair in chunks.windows(2) {
            let carried = &pair[1].text[..pair[1].overlap];
            assert!(carried.chars().count() <= 80);
            assert!(
                pair[0].text.ends_with(carried),
                "overlap {carried:?} is not a tail of the previous chunk"
            );
        }
        assert!(chunks.iter().skip(1).any(|c| c.overlap > 0));
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(600), "b".repeat(600));
        let chunks = chunk_text(&text, "p.txt", 1000, 100);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].fresh_text().ends_with("\n\n"));
        assert!(chunks[1].fresh_text().starts_with('b'));
    }

    #[test]
    fn hard_cuts_only_for_oversized_runs() {
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text, "p.txt", 1000, 100);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 1000));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "Überwachung der Geldwäsche ist Pflicht. ".repeat(60);
        let chunks = chunk_text(&text, "de.txt", 120, 20);
        for c in &chunks {
            assert!(c.text.chars().count() <= 120);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn separator_run_joins_following_content() {
        let text = "aaaa bbbb cccc dddd\n\neeee ffff gggg hh";
        let chunks = chunk_text(text, "p.txt", 20, 5);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert!(!c.fresh_text().trim().is_empty(), "blank chunk {c:?}");
            assert!(c.text.chars().count() <= 20);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn overlap_is_clamped_below_target() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(&text, "p.txt", 10, 50);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
        assert_eq!(reconstruct(&chunks), text);
    }
}
