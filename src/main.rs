use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use heartguard_lib::api::start_server;
use heartguard_lib::config;
use heartguard_lib::pipeline::ingest::pdf::PdfTextExtractor;
use heartguard_lib::pipeline::ingest::web::HttpFetcher;
use heartguard_lib::pipeline::ingest::{CorpusLoader, SourceManifest};
use heartguard_lib::pipeline::processor::run_ingestion;
use heartguard_lib::pipeline::rag::{AssistantConfig, MedicalAssistant};
use heartguard_lib::pipeline::storage::chunker::RecursiveChunker;
use heartguard_lib::pipeline::storage::embedder::build_embedder;
use heartguard_lib::pipeline::storage::orchestrator::IndexBuilder;

#[derive(Parser, Debug)]
#[command(
    name = "heartguard",
    version,
    about = "Protocol advisories for vital-sign events, backed by a local medical reference index"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the source corpus and build the vector index.
    Ingest(IngestArgs),
    /// Print the advisory for one vital-signs event.
    Advise(AdviseArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Vector index directory.
    #[arg(long, env = "HEARTGUARD_INDEX_DIR")]
    index: Option<PathBuf>,

    /// Embedding model directory (used with the onnx-embeddings feature).
    #[arg(long, env = "HEARTGUARD_MODEL_DIR")]
    model_dir: Option<PathBuf>,
}

impl IndexArgs {
    fn index_dir(&self) -> PathBuf {
        self.index.clone().unwrap_or_else(config::index_dir)
    }

    fn model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(config::embedding_model_dir)
    }
}

#[derive(Args, Debug)]
struct RetrievalArgs {
    /// Reference snippets retrieved per advisory.
    #[arg(long, env = "HEARTGUARD_TOP_K", default_value_t = config::RETRIEVAL_TOP_K)]
    top_k: usize,

    /// Maximum characters of retrieved evidence in an advisory.
    #[arg(long, env = "HEARTGUARD_EVIDENCE_CHARS", default_value_t = config::EVIDENCE_CHAR_LIMIT)]
    evidence_chars: usize,
}

impl RetrievalArgs {
    fn assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            top_k: self.top_k,
            evidence_chars: self.evidence_chars,
        }
    }
}

#[derive(Args, Debug)]
struct IngestArgs {
    #[command(flatten)]
    paths: IndexArgs,

    /// JSON source manifest; the reference corpus is used when omitted.
    #[arg(long, env = "HEARTGUARD_SOURCES")]
    sources: Option<PathBuf>,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = config::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, default_value_t = config::DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Seconds before a web source download is abandoned.
    #[arg(long, env = "HEARTGUARD_FETCH_TIMEOUT_SECS", default_value_t = config::DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct AdviseArgs {
    #[command(flatten)]
    paths: IndexArgs,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    /// ECG signal classification, e.g. "TAQUICARDIA VENTRICULAR".
    #[arg(long)]
    classification: String,

    /// Blood pressure as "SYS/DIA".
    #[arg(long)]
    bp: String,

    /// Oxygen saturation as "NN%".
    #[arg(long)]
    spo2: String,

    /// Deployment context, e.g. URBAN or RURAL_REMOTA.
    #[arg(long, default_value = "URBAN")]
    context: String,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    paths: IndexArgs,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "HEARTGUARD_BIND", default_value = config::DEFAULT_BIND_ADDR)]
    bind: SocketAddr,
}

fn main() -> Result<()> {
    heartguard_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let cli = Cli::parse();
    match cli.command {
        Command::Ingest(args) => ingest(args),
        Command::Advise(args) => advise(args),
        Command::Serve(args) => serve(args),
    }
}

fn ingest(args: IngestArgs) -> Result<()> {
    let manifest = match &args.sources {
        Some(path) => SourceManifest::from_file(path)
            .with_context(|| format!("reading source manifest {}", path.display()))?,
        None => SourceManifest::reference_corpus(),
    };

    let fetcher = HttpFetcher::new(config::INGEST_USER_AGENT, args.fetch_timeout_secs)?;
    let loader = CorpusLoader::new(fetcher, PdfTextExtractor);
    let chunker = RecursiveChunker::new(args.chunk_size, args.chunk_overlap)?;
    let embedder = build_embedder(&args.paths.model_dir())?;
    let builder = IndexBuilder::new(chunker, embedder);

    let outcome = run_ingestion(&manifest, &loader, &builder, &args.paths.index_dir())?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn open_assistant(paths: &IndexArgs, retrieval: &RetrievalArgs) -> Result<MedicalAssistant> {
    let embedder = build_embedder(&paths.model_dir());
    let assistant = MedicalAssistant::open(&paths.index_dir(), embedder)?
        .with_config(retrieval.assistant_config());

    let config = assistant.config();
    tracing::info!(
        mode = assistant.mode().as_str(),
        top_k = config.top_k,
        evidence_chars = config.evidence_chars,
        "Assistant ready"
    );
    Ok(assistant)
}

fn advise(args: AdviseArgs) -> Result<()> {
    let assistant = open_assistant(&args.paths, &args.retrieval)?;
    let advice = assistant.advise(&args.classification, &args.bp, &args.spo2, &args.context);
    println!("{advice}");
    Ok(())
}

fn serve(args: ServeArgs) -> Result<()> {
    // Load before the runtime exists: the ONNX session and index I/O are blocking.
    let assistant = Arc::new(open_assistant(&args.paths, &args.retrieval)?);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(async move {
        let mut server = start_server(args.bind, assistant)
            .await
            .with_context(|| format!("binding {}", args.bind))?;
        println!("Listening on http://{}", server.addr);

        tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
        server.shutdown();
        server.wait().await;
        Ok::<(), anyhow::Error>(())
    })
}
