use crate::chunking::ChunkerConfig;
use crate::error::{IngestError, RagError, StoreError};
use crate::ingest::{discover_pdf_files, ingest_file};
use crate::llm::GenerationOptions;
use crate::prompt::build_prompt;
use crate::stores::RetrievedChunk;
use crate::traits::{ChunkStore, TextGenerator};
use std::path::Path;
use tracing::info;

/// Drives the two flows of the system against a [`ChunkStore`]:
/// at-most-once folder ingestion, and retrieve-then-generate answering.
pub struct RagCoordinator<S>
where
    S: ChunkStore,
{
    store: S,
    collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// False when the collection already existed and ingestion was skipped.
    pub created: bool,
    pub documents: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub dropped_fragments: usize,
    pub sources: Vec<RetrievedChunk>,
}

impl<S> RagCoordinator<S>
where
    S: ChunkStore + Send + Sync,
{
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Create the collection and ingest every PDF directly inside `folder`.
    ///
    /// When the collection already exists the whole ingestion is skipped,
    /// so re-running against a populated knowledge base performs zero add
    /// calls. A store rejection (including duplicate ids) aborts the run.
    pub async fn bootstrap(
        &self,
        folder: &Path,
        config: ChunkerConfig,
    ) -> Result<BootstrapReport, RagError> {
        if self.store.find_collection(&self.collection).await?.is_some() {
            info!(
                collection = %self.collection,
                "collection already exists, skipping ingestion"
            );
            return Ok(BootstrapReport {
                created: false,
                documents: 0,
                chunks: 0,
            });
        }

        let files = discover_pdf_files(folder);
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no pdf files found in {}",
                folder.display()
            ))
            .into());
        }

        let handle = self.store.create_collection(&self.collection).await?;

        let mut documents = 0;
        let mut chunks = 0;
        for path in files {
            let ingested = ingest_file(&path, config)?;
            info!(
                document = %ingested.fingerprint.document_name,
                chunk_count = ingested.records.len(),
                "indexing document"
            );
            self.store.add_chunks(&handle, &ingested.records).await?;
            documents += 1;
            chunks += ingested.records.len();
        }

        Ok(BootstrapReport {
            created: true,
            documents,
            chunks,
        })
    }

    /// Retrieve the top-k chunks for `question`, assemble the prompt, and
    /// hand it to `generator`. Retrieval order is preserved end to end.
    pub async fn answer<G>(
        &self,
        generator: &G,
        question: &str,
        top_k: usize,
        options: &GenerationOptions,
    ) -> Result<Answer, RagError>
    where
        G: TextGenerator + Send + Sync,
    {
        if question.trim().is_empty() {
            return Err(RagError::InvalidQuery("question is empty".to_string()));
        }

        let handle = self
            .store
            .find_collection(&self.collection)
            .await?
            .ok_or_else(|| {
                RagError::Store(StoreError::Request(format!(
                    "collection {} does not exist, run ingest first",
                    self.collection
                )))
            })?;

        let retrieved = self.store.query_chunks(&handle, question, top_k).await?;
        let texts: Vec<String> = retrieved.iter().map(|chunk| chunk.text.clone()).collect();
        let prompt = build_prompt(question, &texts);

        let completion = generator.generate(&prompt, options).await?;

        Ok(Answer {
            text: completion.text,
            dropped_fragments: completion.dropped_fragments,
            sources: retrieved,
        })
    }
}
