//! Ephemeral nearest-neighbour index over one document's chunks.
//!
//! Built fresh for every analysis run and dropped with it. Search is exact:
//! the query vector is compared against every chunk vector by cosine
//! similarity, which is cheap at single-document scale.

use std::sync::Arc;

use gapcheck_core::Chunk;
use thiserror::Error;
use tracing::{debug, info};

use crate::embed::{Embed, cosine_sim, normalize};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no content to index")]
    NoContent,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("non-finite value in {0} embedding")]
    NonFinite(String),
}

/// One search result.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub chunk: &'a Chunk,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
}

/// Cosine-similarity index over chunk embeddings.
pub struct SemanticIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    embedder: Arc<dyn Embed>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("chunks", &self.chunks.len())
            .field("dim", &self.embedder.dim())
            .finish()
    }
}

impl SemanticIndex {
    /// Embed `chunks` and index them.
    ///
    /// Fails with [`IndexError::NoContent`] for an empty chunk list rather than
    /// producing an index that can only return empty results.
    pub fn build(chunks: Vec<Chunk>, embedder: Arc<dyn Embed>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::NoContent);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let mut vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| IndexError::Embedding(format!("{e:#}")))?;

        if vectors.len() != chunks.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} vectors, embedder returned {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dim = embedder.dim();
        for (i, v) in vectors.iter_mut().enumerate() {
            if v.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
            if !all_finite(v) {
                return Err(IndexError::NonFinite(format!("chunk {i}")));
            }
            normalize(v);
        }

        info!(chunks = chunks.len(), dim, "built semantic index");
        Ok(Self {
            chunks,
            vectors,
            embedder,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The `k` chunks most similar to `text`, most similar first.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<Hit<'_>>, IndexError> {
        let vector = self
            .embedder
            .embed(text)
            .map_err(|e| IndexError::Embedding(format!("{e:#}")))?;
        self.query_vector(&vector, k)
    }

    /// The `k` chunks nearest to a precomputed query vector.
    ///
    /// Ties keep document order.
    pub fn query_vector(&self, vector: &[f32], k: usize) -> Result<Vec<Hit<'_>>, IndexError> {
        let dim = self.embedder.dim();
        if vector.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
        if !all_finite(vector) {
            return Err(IndexError::NonFinite("query".to_string()));
        }

        let mut query = vector.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_sim(&query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);

        debug!(k, returned = scored.len(), "index query");
        Ok(scored
            .into_iter()
            .map(|(i, score)| Hit {
                chunk: &self.chunks[i],
                score,
            })
            .collect())
    }
}

fn all_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;

    /// Maps each text to a fixed vector by keyword, for exact-score tests.
    struct AxisEmbedder;

    impl Embed for AxisEmbedder {
        fn dim(&self) -> usize {
            3
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match *t {
                    t if t.contains("mixed") => vec![0.7, 0.7, 0.0],
                    t if t.contains("retention") => vec![1.0, 0.0, 0.0],
                    t if t.contains("training") => vec![0.0, 1.0, 0.0],
                    _ => vec![0.0, 0.0, 1.0],
                })
                .collect())
        }
    }

    /// Emits NaN for any text containing "corrupt".
    struct NanEmbedder;

    impl Embed for NanEmbedder {
        fn dim(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("corrupt") {
                        vec![f32::NAN, 0.0]
                    } else {
                        vec![1.0, 0.5]
                    }
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    impl Embed for FailingEmbedder {
        fn dim(&self) -> usize {
            3
        }

        fn embed_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model unavailable")
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_path: "internal.txt".to_string(),
            start: 0,
            overlap: 0,
        }
    }

    fn axis_index() -> SemanticIndex {
        SemanticIndex::build(
            vec![
                chunk("training schedule"),
                chunk("data retention rules"),
                chunk("canteen menu"),
                chunk("mixed retention and training"),
            ],
            Arc::new(AxisEmbedder),
        )
        .unwrap()
    }

    #[test]
    fn empty_build_fails() {
        let err = SemanticIndex::build(vec![], Arc::new(HashEmbedder::default())).unwrap_err();
        assert!(matches!(err, IndexError::NoContent));
    }

    #[test]
    fn query_orders_by_descending_similarity() {
        let index = axis_index();
        let hits = index.query("retention", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.text, "data retention rules");
        assert_eq!(hits[1].chunk.text, "mixed retention and training");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn query_returns_at_most_k() {
        let index = axis_index();
        assert_eq!(index.query("training", 2).unwrap().len(), 2);
        assert_eq!(index.query("training", 10).unwrap().len(), 4);
        assert!(index.query("training", 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_document_order() {
        let index = axis_index();
        // Everything but the canteen chunk is orthogonal to the query.
        let hits = index.query("canteen", 3).unwrap();
        assert_eq!(hits[0].chunk.text, "canteen menu");
        assert_eq!(hits[1].chunk.text, "training schedule");
        assert_eq!(hits[2].chunk.text, "data retention rules");
    }

    #[test]
    fn hits_come_from_indexed_chunks() {
        let chunks = vec![
            chunk("Records are kept for seven years in the archive."),
            chunk("New starters complete compliance training in week one."),
            chunk("Visitors sign in at reception."),
        ];
        let index = SemanticIndex::build(chunks.clone(), Arc::new(HashEmbedder::default())).unwrap();
        let hits = index.query("how long are records kept", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| chunks.contains(h.chunk)));
        assert_eq!(hits[0].chunk.text, chunks[0].text);
    }

    #[test]
    fn embedding_failure_is_typed() {
        let err = SemanticIndex::build(vec![chunk("x")], Arc::new(FailingEmbedder)).unwrap_err();
        assert!(matches!(err, IndexError::Embedding(msg) if msg.contains("model unavailable")));
    }

    #[test]
    fn non_finite_chunk_embedding_rejected() {
        let chunks = (0..200)
            .map(|i| {
                if i % 3 == 0 {
                    chunk(&format!("corrupt {i}"))
                } else {
                    chunk(&format!("c{i}"))
                }
            })
            .collect();
        let err = SemanticIndex::build(chunks, Arc::new(NanEmbedder)).unwrap_err();
        assert!(matches!(err, IndexError::NonFinite(ref what) if what == "chunk 0"));
    }

    #[test]
    fn non_finite_query_rejected() {
        let index = SemanticIndex::build(vec![chunk("c1"), chunk("c2")], Arc::new(NanEmbedder)).unwrap();
        assert_eq!(index.chunk_count(), 2);
        assert!(matches!(index.query("corrupt", 1), Err(IndexError::NonFinite(_))));
        assert!(matches!(
            index.query_vector(&[f32::INFINITY, 0.0], 1),
            Err(IndexError::NonFinite(_))
        ));
    }

    #[test]
    fn zero_vectors_rank_without_panicking() {
        // HashEmbedder maps blank text to the zero vector.
        let chunks = (0..200)
            .map(|i| if i % 3 == 0 { chunk("  ") } else { chunk(&format!("clause {i}")) })
            .collect();
        let index = SemanticIndex::build(chunks, Arc::new(HashEmbedder::new(16))).unwrap();
        let hits = index.query("clause 1", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn wrong_query_dimension_rejected() {
        let index = axis_index();
        let err = index.query_vector(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
