use crate::artifact::{render_triples, write_atomic};
use crate::backend::GenerationBackend;
use crate::error::ExtractError;
use crate::orchestrator::TripleExtractor;
use chrono::Local;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: [&str; 2] = ["txt", "md"];
const OUTPUT_DIGEST_CHARS: usize = 12;

/// One source text and the result file it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceJob {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

impl SourceJob {
    pub fn new(source_path: &Path, results_dir: &Path) -> Result<Self, ExtractError> {
        let stem = source_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                ExtractError::MissingFileName(format!(
                    "path missing filename: {}",
                    source_path.display()
                ))
            })?;

        let file_name = format!(
            "{stem}-{}-output-{}.json",
            source_digest(source_path),
            Local::now().format("%Y%m%d-%H%M%S")
        );

        Ok(Self {
            source_path: source_path.to_path_buf(),
            output_path: results_dir.join(file_name),
        })
    }
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub chunk_count: usize,
    pub triple_count: usize,
}

pub struct FailedJob {
    pub path: PathBuf,
    pub reason: String,
}

pub struct BatchReport {
    pub completed: Vec<JobReport>,
    pub failed: Vec<FailedJob>,
}

pub fn discover_source_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_source = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SOURCE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_source {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// A file is one source; a folder expands to every text source below it.
pub fn resolve_sources(path: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(ExtractError::InvalidArgument(format!(
            "source does not exist: {}",
            path.display()
        )));
    }

    let files = discover_source_files(path);
    if files.is_empty() {
        return Err(ExtractError::InvalidArgument(format!(
            "no .txt or .md sources found in {}",
            path.display()
        )));
    }

    Ok(files)
}

pub fn run_job<B: GenerationBackend>(
    extractor: &TripleExtractor<B>,
    job: &SourceJob,
) -> Result<JobReport, ExtractError> {
    let text = fs::read_to_string(&job.source_path)?;
    info!(source = %job.source_path.display(), "extracting triples");

    let extraction = extractor.extract(&text)?;
    let rendered = render_triples(&extraction.triples)?;
    write_atomic(&job.output_path, rendered.as_bytes())?;

    info!(
        source = %job.source_path.display(),
        output = %job.output_path.display(),
        chunks = extraction.chunk_count,
        triples = extraction.triples.len(),
        "saved triples"
    );

    Ok(JobReport {
        source_path: job.source_path.clone(),
        output_path: job.output_path.clone(),
        chunk_count: extraction.chunk_count,
        triple_count: extraction.triples.len(),
    })
}

/// Runs every source in order. A failing job is recorded and the batch goes on.
///
/// A source listed more than once runs once, so no two jobs share an output file.
pub fn run_batch<B: GenerationBackend>(
    extractor: &TripleExtractor<B>,
    sources: &[PathBuf],
    results_dir: &Path,
) -> BatchReport {
    let mut completed = Vec::new();
    let mut failed = Vec::new();
    let mut seen = HashSet::new();

    for path in sources {
        let identity = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if !seen.insert(identity) {
            warn!(source = %path.display(), "source listed twice, skipping repeat");
            continue;
        }

        let outcome = SourceJob::new(path, results_dir).and_then(|job| run_job(extractor, &job));

        match outcome {
            Ok(report) => completed.push(report),
            Err(error) => {
                warn!(source = %path.display(), %error, "source job failed");
                failed.push(FailedJob {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    BatchReport { completed, failed }
}

fn source_digest(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..OUTPUT_DIGEST_CHARS].to_string()
}
