//! HTTP route handlers.

mod embeddings;
mod health;

pub use embeddings::create_embeddings;
pub use health::{health, metrics};
