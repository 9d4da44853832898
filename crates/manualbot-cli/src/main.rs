mod chat;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use manualbot_config::Config;
use manualbot_rag::chunking::{DEFAULT_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS, chunk_text};
use manualbot_rag::completion::OpenAiChat;
use manualbot_rag::embeddings::OpenAiEmbeddings;
use manualbot_rag::ingest::{ingest_corpus, ingest_lines};
use manualbot_rag::pipeline::Pipeline;
use manualbot_rag::store::SupabaseStore;
use manualbot_types::Conversation;

#[derive(Parser)]
#[command(name = "manualbot", about = "Retrieval-augmented manual chatbot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a corpus file into the vector store
    Ingest {
        /// Path to the corpus file
        file: PathBuf,

        /// Pre-chunk the file instead of treating each line as a chunk
        #[arg(long)]
        chunk: bool,

        /// Maximum characters per chunk (with --chunk)
        #[arg(long, default_value_t = DEFAULT_CHUNK_CHARS)]
        chunk_chars: usize,

        /// Characters of overlap between chunks (with --chunk)
        #[arg(long, default_value_t = DEFAULT_OVERLAP_CHARS)]
        overlap_chars: usize,
    },
    /// Ask a single question and print the answer
    Ask {
        /// The question
        question: String,
    },
    /// Start an interactive chat session
    Chat,
}

struct Components {
    pipeline: Arc<Pipeline>,
    embedder: Arc<OpenAiEmbeddings>,
    store: Arc<SupabaseStore>,
}

fn build_components(config: &Config) -> Result<Components> {
    let client = manualbot_rag::http_client(config.request_timeout)?;
    let embedder = Arc::new(OpenAiEmbeddings::new(client.clone(), &config.openai));
    let store = Arc::new(SupabaseStore::new(client.clone(), &config.supabase));
    let completer = Arc::new(OpenAiChat::new(client, &config.openai));

    let pipeline = Arc::new(Pipeline::new(
        embedder.clone(),
        store.clone(),
        completer,
        config.retrieval.clone(),
    ));

    Ok(Components {
        pipeline,
        embedder,
        store,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Serve { port } => {
            let mut server_config = config.server.clone();
            if let Some(port) = port {
                server_config.port = port;
            }
            let components = build_components(&config)?;
            rt.block_on(async {
                manualbot_gateway::start_server(&server_config, components.pipeline)
                    .await
                    .map_err(|e| anyhow::anyhow!("{e}"))
            })?;
        }
        Commands::Ingest {
            file,
            chunk,
            chunk_chars,
            overlap_chars,
        } => {
            let components = build_components(&config)?;
            let report = rt.block_on(async {
                if chunk {
                    let content = tokio::fs::read_to_string(&file).await?;
                    let lines = chunk_text(&content, chunk_chars, overlap_chars);
                    ingest_lines(
                        components.store.as_ref(),
                        components.embedder.as_ref(),
                        lines,
                    )
                    .await
                } else {
                    ingest_corpus(
                        components.store.as_ref(),
                        components.embedder.as_ref(),
                        &file,
                    )
                    .await
                }
            })?;
            println!(
                "Ingested {} chunks ({} lines read, {} duplicates skipped)",
                report.chunks_ingested, report.lines_read, report.duplicates_skipped
            );
        }
        Commands::Ask { question } => {
            let components = build_components(&config)?;
            let reply = rt.block_on(async {
                let mut conversation = Conversation::new();
                components.pipeline.answer(&mut conversation, &question).await
            })?;
            println!("{reply}");
        }
        Commands::Chat => {
            let components = build_components(&config)?;
            rt.block_on(chat::run_chat(components.pipeline))?;
        }
    }

    Ok(())
}
