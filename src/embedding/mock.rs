use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::client::Embedder;
use super::error::EmbeddingError;

/// In-memory embedder for tests.
///
/// Texts registered with [`MockEmbedder::with_vector`] map to that exact vector; any other
/// text gets a deterministic unit vector derived from its BLAKE3 hash.
#[derive(Debug)]
pub struct MockEmbedder {
    dim: usize,
    fixed: RwLock<HashMap<String, Vec<f32>>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fixed: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Registers a fixed vector for `text` (its length is not checked).
    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.set_vector(text, vector);
        self
    }

    pub fn set_vector(&self, text: &str, vector: Vec<f32>) {
        self.fixed.write().insert(text.to_string(), vector);
    }

    /// Makes every call for `text` fail with a provider error.
    pub fn fail_on(&self, text: &str) {
        self.failing.write().insert(text.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if self.failing.read().contains(text) {
            return Err(EmbeddingError::Status {
                status: 503,
                body: "mock provider unavailable".to_string(),
            });
        }

        if let Some(vector) = self.fixed.read().get(text) {
            return Ok(vector.clone());
        }

        Ok(hashed_unit_vector(text, self.dim))
    }
}

fn hashed_unit_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut reader = blake3::Hasher::new()
        .update(text.as_bytes())
        .finalize_xof();
    let mut bytes = vec![0u8; dim * 2];
    reader.fill(&mut bytes);

    let mut vector: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / i16::MAX as f32)
        .collect();

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}
