use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triple_extract_core::{
    aggregate, remove_consumed, resolve_sources, run_batch, write_artifact, ArtifactFormat,
    ChatEndpointConfig, ExtractorConfig, OpenAiChatBackend, SamplingParams, TripleExtractor,
    TripleSchema, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_MODULE_IDENTIFIER,
    DEFAULT_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "triple-extract", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// API key sent as a bearer token
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Model identifier
    #[arg(long, default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// File holding the system instruction; the built-in instruction is used otherwise
    #[arg(long, global = true)]
    instruction_file: Option<PathBuf>,

    /// Word budget per chunk
    #[arg(long, default_value_t = 1, global = true)]
    max_words: usize,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.2, global = true)]
    temperature: f32,

    /// Nucleus sampling cutoff
    #[arg(long, default_value_t = 1.0, global = true)]
    top_p: f32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Extract triples from text files into one result file per source.
    Extract {
        /// Source file or folder (searched recursively for .txt and .md).
        #[arg(long, required = true)]
        source: Vec<PathBuf>,
        /// Folder that receives the per-source result files.
        #[arg(long, default_value = "triple_results")]
        results_dir: PathBuf,
    },
    /// Combine the result files of a folder into one artifact.
    Aggregate {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Extract every source, then combine the results.
    Run {
        /// Source file or folder (searched recursively for .txt and .md).
        #[arg(long, required = true)]
        source: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Folder holding the per-source result files.
    #[arg(long, default_value = "triple_results")]
    results_dir: PathBuf,
    /// Combined artifact path.
    #[arg(long)]
    output: PathBuf,
    /// Artifact layout.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
    /// Constant name used by the module format.
    #[arg(long, default_value = DEFAULT_MODULE_IDENTIFIER)]
    identifier: String,
    /// Delete the result files once they are combined.
    #[arg(long, default_value_t = false)]
    remove_consumed: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Module,
}

impl OutputArgs {
    fn artifact_format(&self) -> ArtifactFormat {
        match self.format {
            Format::Json => ArtifactFormat::Json,
            Format::Module => ArtifactFormat::Module {
                identifier: self.identifier.clone(),
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "triple-extract boot"
    );

    match &cli.command {
        Command::Extract {
            source,
            results_dir,
        } => {
            extract_sources(&cli, source, results_dir)?;
        }
        Command::Aggregate { output } => {
            combine_results(output)?;
        }
        Command::Run { source, output } => {
            extract_sources(&cli, source, &output.results_dir)?;
            combine_results(output)?;
        }
    }

    Ok(())
}

fn build_extractor(cli: &Cli) -> anyhow::Result<TripleExtractor<OpenAiChatBackend>> {
    let mut config = ExtractorConfig {
        model: cli.model.clone(),
        sampling: SamplingParams {
            temperature: cli.temperature,
            top_p: cli.top_p,
            ..SamplingParams::default()
        },
        max_words: cli.max_words,
        schema: TripleSchema::default(),
        ..ExtractorConfig::default()
    };

    if let Some(path) = &cli.instruction_file {
        config.system_instruction = fs::read_to_string(path)
            .map_err(|error| anyhow::anyhow!("reading {}: {error}", path.display()))?
            .trim()
            .to_string();
    }

    if cli.api_key.is_none() {
        warn!("no API key configured, requests are sent without authorization");
    }

    let backend = OpenAiChatBackend::new(ChatEndpointConfig {
        base_url: cli.base_url.clone(),
        api_key: cli.api_key.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    })
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    TripleExtractor::new(backend, config).map_err(|error| anyhow::anyhow!(error.to_string()))
}

fn extract_sources(cli: &Cli, sources: &[PathBuf], results_dir: &Path) -> anyhow::Result<()> {
    let extractor = build_extractor(cli)?;

    let mut files = Vec::new();
    for source in sources {
        match resolve_sources(source) {
            Ok(found) => files.extend(found),
            Err(error) => warn!(source = %source.display(), %error, "skipping source"),
        }
    }

    if files.is_empty() {
        println!("0 sources found, nothing to extract");
        return Ok(());
    }

    fs::create_dir_all(results_dir)?;
    info!(sources = files.len(), results_dir = %results_dir.display(), "extracting");

    let report = run_batch(&extractor, &files, results_dir);

    for job in &report.completed {
        println!(
            "{} -> {} ({} chunks, {} triples)",
            job.source_path.display(),
            job.output_path.display(),
            job.chunk_count,
            job.triple_count
        );
    }

    if !report.failed.is_empty() {
        warn!(
            "failed_jobs={} for results_dir={}",
            report.failed.len(),
            results_dir.display()
        );
        for failed in &report.failed {
            warn!(path = %failed.path.display(), reason = %failed.reason, "source job failed");
        }
    }

    Ok(())
}

fn combine_results(args: &OutputArgs) -> anyhow::Result<()> {
    let report = aggregate(&args.results_dir, &TripleSchema::default())
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped result file");
    }

    write_artifact(&args.output, &report.triples, &args.artifact_format())
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    println!(
        "{} triples combined into {} ({} removed for null fields) at {}",
        report.triples.len(),
        args.output.display(),
        report.discarded,
        Utc::now().to_rfc3339()
    );

    if args.remove_consumed {
        let removed =
            remove_consumed(&report).map_err(|error| anyhow::anyhow!(error.to_string()))?;
        info!(removed, "removed consumed result files");
    }

    Ok(())
}
