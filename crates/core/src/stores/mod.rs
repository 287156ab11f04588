pub mod chroma;

pub use chroma::ChromaStore;

use serde::{Deserialize, Serialize};

/// Server-side identity of a collection, resolved once and threaded
/// through add and query calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionHandle {
    pub id: String,
    pub name: String,
}

/// A chunk returned by similarity search, in the store's ranking order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub distance: f64,
}
