use crate::error::ExtractError;
use crate::models::Triple;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const DEFAULT_MODULE_IDENTIFIER: &str = "UserData";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    /// Pretty-printed JSON list.
    #[default]
    Json,
    /// The same list bound to a constant: `const <identifier> = [...];`
    Module { identifier: String },
}

pub fn render_triples(triples: &[Triple]) -> Result<String, ExtractError> {
    Ok(serde_json::to_string_pretty(triples)?)
}

pub fn render_artifact(triples: &[Triple], format: &ArtifactFormat) -> Result<String, ExtractError> {
    let json = render_triples(triples)?;

    match format {
        ArtifactFormat::Json => Ok(json),
        ArtifactFormat::Module { identifier } => {
            if !is_identifier(identifier) {
                return Err(ExtractError::InvalidArgument(format!(
                    "not a valid identifier: {identifier:?}"
                )));
            }
            Ok(format!("const {identifier} = {json};"))
        }
    }
}

pub fn write_artifact(
    path: &Path,
    triples: &[Triple],
    format: &ArtifactFormat,
) -> Result<(), ExtractError> {
    let rendered = render_artifact(triples, format)?;
    write_atomic(path, rendered.as_bytes())
}

/// Writes through a temporary sibling file and renames it over `path`, so readers
/// see either the whole content or no file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ExtractError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| ExtractError::Persist {
        path: path.display().to_string(),
        reason: error.error.to_string(),
    })?;

    Ok(())
}

fn is_identifier(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
