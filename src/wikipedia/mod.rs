//! Grounding context retrieval from the Wikipedia MediaWiki API.

pub mod client;
pub mod types;

pub use client::{RetrievalLimits, RetrieveError, Retriever, WikipediaClient};
pub use types::Passage;
