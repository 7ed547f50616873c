//! OpenAI-compatible embeddings API types.
//!
//! Reference: https://platform.openai.com/docs/api-reference/embeddings

use serde::{Deserialize, Serialize};

/// Request body for POST /v1/embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    /// Model ID echoed back in the response
    pub model: String,

    /// One string or an array of strings
    pub input: EmbeddingInput,
}

/// The `input` field accepts either a single string or an array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Normalize to a list; a single string becomes a one-element batch.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            EmbeddingInput::Single(s) => vec![s],
            EmbeddingInput::Batch(v) => v,
        }
    }
}

/// Response body for POST /v1/embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    /// Always "list"
    pub object: String,

    /// One entry per input item, in input order
    pub data: Vec<EmbeddingObject>,

    /// Model ID from the request
    pub model: String,
}

/// A single embedding in the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingObject {
    /// Always "embedding"
    pub object: String,

    /// Position of the corresponding input item
    pub index: usize,

    /// The L2-normalized vector
    pub embedding: Vec<f32>,
}

impl EmbeddingsResponse {
    pub fn new(model: String, vectors: Vec<Vec<f32>>) -> Self {
        let data = vectors
            .into_iter()
            .enumerate()
            .map(|(index, embedding)| EmbeddingObject {
                object: "embedding".to_string(),
                index,
                embedding,
            })
            .collect();
        Self {
            object: "list".to_string(),
            data,
            model,
        }
    }
}
