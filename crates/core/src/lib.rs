pub mod chunking;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_pages, normalize_whitespace, ChunkerConfig, PageChunk, DEFAULT_MAX_WORDS};
pub use error::{IngestError, LlmError, RagError, StoreError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{
    chunk_records, digest_file, discover_pdf_files, document_name, ingest_file, ChunkRecord,
    DocumentFingerprint, IngestedDocument,
};
pub use llm::{
    Completion, DecodingMethod, GenerationOptions, HostedConfig, HostedGenerator,
    LlamaServerGenerator,
};
pub use orchestrator::{Answer, BootstrapReport, RagCoordinator};
pub use prompt::build_prompt;
pub use stores::{ChromaStore, CollectionHandle, RetrievedChunk};
pub use traits::{ChunkStore, TextGenerator};
