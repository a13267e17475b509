//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` loads a sentence-transformer ONNX model via ort
//!   and tokenizes with the HuggingFace tokenizers crate. This is the
//!   production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.
//!
//! Both expose a blocking batch contract. The batch runner owns the instance
//! it is given; nothing here is cached process-wide.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

use readmate_core::config::EmbeddingConfig;
use readmate_core::error::{ReadmateError, Result};

/// Default dimension of the mock backend.
pub const DEFAULT_MOCK_DIMENSIONS: usize = 384;

/// Service for turning text into fixed-dimension vectors.
///
/// `encode` returns one vector per input, in input order, and must be
/// deterministic for identical text.
pub trait EmbeddingService: Send + Sync {
    /// Embed every text in `texts`.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Construct the backend named in the configuration.
///
/// `model_dir` is the already-resolved model directory; it is only read by
/// the onnx backend.
pub fn build_embedder(
    config: &EmbeddingConfig,
    model_dir: &Path,
) -> Result<Box<dyn EmbeddingService>> {
    match config.backend.as_str() {
        "mock" => Ok(Box::new(MockEmbedding::with_dimensions(config.dimensions))),
        "onnx" => Ok(Box::new(OnnxEmbeddingService::from_directory(model_dir)?)),
        other => Err(ReadmateError::Config(format!(
            "unknown embedding backend '{}' (expected 'mock' or 'onnx')",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - real ONNX Runtime inference
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed embedding service using a sentence-transformer model.
///
/// Expects a model directory containing:
/// - `model.onnx`: the sentence-transformer ONNX export
/// - `tokenizer.json`: the HuggingFace fast-tokenizer file
///
/// Mean pooling (masked) is applied to produce a single vector per input.
pub struct OnnxEmbeddingService {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load a sentence-transformer model from the given directory.
    pub fn from_directory(model_dir: &Path) -> Result<Self> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )
    }

    /// Load from explicit model and tokenizer file paths.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            return Err(ReadmateError::Embedding(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(ReadmateError::Embedding(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| ReadmateError::Embedding(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| ReadmateError::Embedding(format!("ONNX set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ReadmateError::Embedding(format!("ONNX load model: {}", e)))?;

        // Sentence-transformer output is [batch, seq_len, hidden_dim].
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 1024 })
            .unwrap_or(1024);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ReadmateError::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    /// Tokenize, run inference, and mean-pool the output for one text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(ReadmateError::Embedding("Cannot embed empty text".to_string()));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ReadmateError::Embedding(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let seq_len = input_ids.len();

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| ReadmateError::Embedding(format!("input_ids array: {}", e)))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| ReadmateError::Embedding(format!("attention_mask array: {}", e)))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| ReadmateError::Embedding(format!("token_type_ids array: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| ReadmateError::Embedding(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| ReadmateError::Embedding(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| ReadmateError::Embedding(format!("TensorRef token_type_ids: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ReadmateError::Embedding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| ReadmateError::Embedding(format!("ONNX inference failed: {}", e)))?;

        // Token embeddings as a flat slice: [1, seq_len, hidden_dim].
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ReadmateError::Embedding(format!("Extract embeddings: {}", e)))?;

        let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
            [_, .., last] if *last > 0 => *last as usize,
            dims => {
                return Err(ReadmateError::Embedding(format!(
                    "Unexpected output shape: {:?}",
                    dims
                )))
            }
        };

        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;

        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for (dim, slot) in pooled.iter_mut().enumerate() {
                    *slot += data[offset + dim];
                }
                count += 1.0;
            }
        }

        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        crate::index::l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        crate::index::l2_normalize(&mut result);
        result
    }
}

impl EmbeddingService for MockEmbedding {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                if text.is_empty() {
                    return Err(ReadmateError::Embedding("Cannot embed empty text".to_string()));
                }
                Ok(self.hash_to_vector(text))
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
