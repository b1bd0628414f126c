use crate::error::ExtractError;
use crate::models::Triple;
use crate::schema::TripleSchema;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RESULT_EXTENSION: &str = "json";

pub struct SkippedResult {
    pub path: PathBuf,
    pub reason: String,
}

pub struct AggregateReport {
    pub triples: Vec<Triple>,
    pub discarded: usize,
    pub consumed_files: Vec<PathBuf>,
    pub skipped_files: Vec<SkippedResult>,
}

pub fn discover_result_files(folder: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RESULT_EXTENSION));

        if is_json {
            files.push(path);
        }
    }

    files.sort_unstable();
    Ok(files)
}

pub fn load_result_file(path: &Path) -> Result<Vec<Triple>, ExtractError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Combines every result file in `folder`, keeping the triples whose required
/// fields are all present and non-null.
///
/// Only a failure to list `folder` is an error. Unreadable files are reported
/// in `skipped_files` and the rest of the batch is still combined.
pub fn aggregate(folder: &Path, schema: &TripleSchema) -> Result<AggregateReport, ExtractError> {
    let files = discover_result_files(folder)?;

    let mut loaded = Vec::new();
    let mut consumed_files = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        match load_result_file(&path) {
            Ok(triples) => {
                loaded.extend(triples);
                consumed_files.push(path);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unreadable result file");
                skipped_files.push(SkippedResult {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    let total = loaded.len();
    let triples: Vec<Triple> = loaded
        .into_iter()
        .filter(|triple| {
            let keep = triple.is_complete(schema.required());
            if !keep {
                warn!(triple = ?triple.fields(), "removed triple with missing or null field");
            }
            keep
        })
        .collect();
    let discarded = total - triples.len();

    info!(
        folder = %folder.display(),
        files = consumed_files.len(),
        skipped = skipped_files.len(),
        kept = triples.len(),
        discarded,
        "aggregated result files"
    );

    Ok(AggregateReport {
        triples,
        discarded,
        consumed_files,
        skipped_files,
    })
}

/// Deletes the result files an aggregation loaded. Returns how many were removed.
pub fn remove_consumed(report: &AggregateReport) -> Result<usize, ExtractError> {
    for path in &report.consumed_files {
        fs::remove_file(path)?;
    }
    Ok(report.consumed_files.len())
}
