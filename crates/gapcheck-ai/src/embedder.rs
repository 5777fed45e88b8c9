//! ONNX Runtime embedding pipeline for sentence-transformers models.
//!
//! Implements mean-pooled embeddings using all-MiniLM-L6-v2 (384 dimensions),
//! the model the policy retrieval index is tuned for.
//! The model directory must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::embed::{Embed, normalize};

/// Sentence embedding generator using ONNX Runtime.
///
/// Loads a sentence-transformers model (e.g., all-MiniLM-L6-v2) and produces
/// 384-dimensional normalized embeddings suitable for cosine similarity search.
/// The session sits behind a mutex so one loaded model can serve every
/// analysis run in the process.
pub struct Embedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dim: usize,
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        // Infer embedding dimension from model output shape.
        let dim = session
            .outputs()
            .first()
            .and_then(|output| infer_dim(output.dtype()))
            .unwrap_or(384);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        // Configure truncation to model's max length (256 for MiniLM).
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: 256,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        // Configure padding to pad all inputs in a batch to the same length.
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dim,
        })
    }
}

impl Embed for Embedder {
    /// Embedding dimensionality (384 for all-MiniLM-L6-v2).
    fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a batch of texts, returning one normalized vector per input.
    ///
    /// Large inputs (a whole policy document) run through the session in
    /// slices of [`MAX_SESSION_BATCH`] texts.
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_SESSION_BATCH) {
            let batch = self.encode(slice)?;
            embeddings.extend(self.infer(&batch)?);
        }
        Ok(embeddings)
    }
}

/// Texts per ONNX session run.
const MAX_SESSION_BATCH: usize = 64;

/// Tokenized batch laid out as flat `[rows, seq_len]` tensors.
struct EncodedBatch {
    rows: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl Embedder {
    fn encode(&self, texts: &[&str]) -> anyhow::Result<EncodedBatch> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let rows = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut batch = EncodedBatch {
            rows,
            seq_len,
            input_ids: vec![0; rows * seq_len],
            attention_mask: vec![0; rows * seq_len],
            token_type_ids: vec![0; rows * seq_len],
        };

        for (row, encoding) in encodings.iter().enumerate() {
            let base = row * seq_len;
            let columns = encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .zip(encoding.get_type_ids());
            for (j, ((&id, &mask), &tid)) in columns.enumerate() {
                batch.input_ids[base + j] = i64::from(id);
                batch.attention_mask[base + j] = i64::from(mask);
                batch.token_type_ids[base + j] = i64::from(tid);
            }
        }

        Ok(batch)
    }

    fn infer(&self, batch: &EncodedBatch) -> anyhow::Result<Vec<Vec<f32>>> {
        if batch.rows == 0 {
            return Ok(vec![]);
        }

        let shape = [batch.rows as i64, batch.seq_len as i64];
        let ids = Tensor::from_array((shape, batch.input_ids.clone().into_boxed_slice()))?;
        let mask = Tensor::from_array((shape, batch.attention_mask.clone().into_boxed_slice()))?;
        let types = Tensor::from_array((shape, batch.token_type_ids.clone().into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => ids,
            "attention_mask" => mask,
            "token_type_ids" => types,
        ])?;

        // Token embeddings: [rows, seq_len, dim].
        let (output_shape, token_embeddings) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch.rows && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [{}, {}, {}]",
            batch.rows,
            batch.seq_len,
            self.dim
        );

        Ok(mean_pool(batch, token_embeddings, dims[1] as usize, self.dim))
    }
}

/// Attention-masked mean over token embeddings, L2-normalized per row.
fn mean_pool(batch: &EncodedBatch, tokens: &[f32], out_seq_len: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..batch.rows)
        .map(|row| {
            let mut pooled = vec![0.0f32; dim];
            let mut weight = 0.0f32;
            for j in 0..out_seq_len.min(batch.seq_len) {
                let m = batch.attention_mask[row * batch.seq_len + j] as f32;
                if m == 0.0 {
                    continue;
                }
                let offset = (row * out_seq_len + j) * dim;
                for (p, t) in pooled.iter_mut().zip(&tokens[offset..offset + dim]) {
                    *p += t * m;
                }
                weight += m;
            }
            if weight > 0.0 {
                pooled.iter_mut().for_each(|p| *p /= weight);
            }
            normalize(&mut pooled);
            pooled
        })
        .collect()
}

/// Try to infer the embedding dimension from the ONNX model output type.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            // Last dimension is the embedding dim.
            shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
        }
        _ => None,
    }
}
