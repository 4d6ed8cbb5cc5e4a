//! Chat completion against the Hugging Face inference router.

pub mod cleanup;
pub mod client;
pub mod types;

pub use cleanup::PostProcess;
pub use client::{GenerationParams, InferenceClient, ModelCaller, ModelError};
pub use types::{ChatMessage, Role};
