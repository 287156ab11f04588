use crate::error::{LlmError, StoreError};
use crate::ingest::ChunkRecord;
use crate::llm::{Completion, GenerationOptions};
use crate::stores::{CollectionHandle, RetrievedChunk};
use async_trait::async_trait;

/// External vector store holding chunks and their embeddings.
///
/// Absence of the named collection is the one recoverable condition and is
/// reported as `Ok(None)`, not as an error.
#[async_trait]
pub trait ChunkStore {
    async fn find_collection(&self, name: &str) -> Result<Option<CollectionHandle>, StoreError>;

    async fn create_collection(&self, name: &str) -> Result<CollectionHandle, StoreError>;

    async fn add_chunks(
        &self,
        collection: &CollectionHandle,
        records: &[ChunkRecord],
    ) -> Result<(), StoreError>;

    async fn query_chunks(
        &self,
        collection: &CollectionHandle,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError>;
}

/// One abstraction over both generation backends: submit a prompt plus
/// options, get back the concatenation of a finite fragment stream.
#[async_trait]
pub trait TextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError>;
}
