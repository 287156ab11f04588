use askpdf_core::{
    ChromaStore, ChunkerConfig, DecodingMethod, GenerationOptions, HostedConfig, HostedGenerator,
    LlamaServerGenerator, RagCoordinator, TextGenerator,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "askpdf", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chroma-compatible vector store base URL
    #[arg(long, default_value = "http://localhost:8000")]
    store_url: String,

    /// Collection name holding the knowledge base
    #[arg(long, default_value = "knowledge-base")]
    collection: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create the collection if absent and ingest every PDF in a folder.
    ///
    /// When the collection already exists the run is a no-op, so ingestion
    /// happens at most once per knowledge base.
    Ingest {
        /// Folder scanned (non-recursively) for .pdf files.
        #[arg(long)]
        folder: String,
        /// Maximum words per chunk.
        #[arg(long, default_value = "150")]
        max_words: usize,
    },
    /// Retrieve relevant chunks and ask a generation backend.
    Ask {
        /// The question to answer from the knowledge base.
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Which generation backend to use.
        #[arg(long, value_enum, default_value_t = Backend::Local)]
        backend: Backend,
        #[arg(long, value_enum, default_value_t = Decoding::Greedy)]
        decoding: Decoding,
        #[arg(long, default_value = "300")]
        max_new_tokens: u32,
        #[arg(long, default_value = "0.7")]
        temperature: f32,
        /// llama.cpp-compatible completion server URL (local backend).
        #[arg(long, default_value = "http://localhost:8080")]
        llama_url: String,
        /// Hosted API key (hosted backend).
        #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Hosted API base URL (hosted backend).
        #[arg(long, env = "LLM_API_URL")]
        api_url: Option<String>,
        /// Hosted project identifier (hosted backend).
        #[arg(long, env = "LLM_PROJECT_ID")]
        project_id: Option<String>,
        /// Print the retrieved chunks and their distances.
        #[arg(long, default_value_t = false)]
        show_sources: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// llama.cpp-style local completion server.
    Local,
    /// Bearer-authenticated hosted generation API.
    Hosted,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decoding {
    Greedy,
    Sample,
}

impl From<Decoding> for DecodingMethod {
    fn from(value: Decoding) -> Self {
        match value {
            Decoding::Greedy => DecodingMethod::Greedy,
            Decoding::Sample => DecodingMethod::Sample,
        }
    }
}

fn required(value: Option<String>, flag: &str, env: &str) -> anyhow::Result<String> {
    value.ok_or_else(|| anyhow::anyhow!("missing --{flag} (or {env}) for the hosted backend"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = ChromaStore::new(&cli.store_url).map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let coordinator = RagCoordinator::new(store, &cli.collection);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "askpdf boot"
    );

    match cli.command {
        Command::Ingest { folder, max_words } => {
            let path = std::path::Path::new(&folder);
            let report = coordinator
                .bootstrap(path, ChunkerConfig { max_words })
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if report.created {
                println!(
                    "{} chunks from {} documents ingested at {}",
                    report.chunks,
                    report.documents,
                    Utc::now().to_rfc3339()
                );
            } else {
                println!(
                    "collection {} already populated, nothing ingested",
                    cli.collection
                );
            }
        }
        Command::Ask {
            question,
            top_k,
            backend,
            decoding,
            max_new_tokens,
            temperature,
            llama_url,
            api_key,
            api_url,
            project_id,
            show_sources,
        } => {
            let options = GenerationOptions {
                decoding: decoding.into(),
                max_new_tokens,
                temperature,
            };

            let answer = match backend {
                Backend::Local => {
                    let generator = LlamaServerGenerator::new(&llama_url)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    run_ask(&coordinator, &generator, &question, top_k, &options).await?
                }
                Backend::Hosted => {
                    let config = HostedConfig {
                        api_key: required(api_key, "api-key", "LLM_API_KEY")?,
                        base_url: required(api_url, "api-url", "LLM_API_URL")?,
                        project_id: required(project_id, "project-id", "LLM_PROJECT_ID")?,
                    };
                    let generator = HostedGenerator::new(config)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    run_ask(&coordinator, &generator, &question, top_k, &options).await?
                }
            };

            if show_sources {
                for source in &answer.sources {
                    println!("[distance={:.4}] {}", source.distance, source.text);
                }
            }

            if answer.dropped_fragments > 0 {
                warn!(
                    dropped = answer.dropped_fragments,
                    "answer may be incomplete, some stream events were malformed"
                );
            }

            println!("{}", answer.text);
        }
    }

    Ok(())
}

async fn run_ask<G>(
    coordinator: &RagCoordinator<ChromaStore>,
    generator: &G,
    question: &str,
    top_k: usize,
    options: &GenerationOptions,
) -> anyhow::Result<askpdf_core::Answer>
where
    G: TextGenerator + Send + Sync,
{
    coordinator
        .answer(generator, question, top_k, options)
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))
}
