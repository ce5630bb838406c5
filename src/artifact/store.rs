// Artifact persistence: atomic save, validating load.
//
// Save writes a temp file next to the destination, fsyncs it, renames it over
// the destination and fsyncs the directory. The destination is either the
// old artifact or the new one, never a mix. Load only ever opens the
// destination path, so a stray temp file from a crash is ignored.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{checksum_of, ModelArtifact, TrainingMetadata, ARTIFACT_FORMAT, ARTIFACT_FORMAT_VERSION};
use crate::error::{ArtifactError, PersistenceError};
use crate::features::FeatureSchema;
use crate::model::RandomForest;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'a str,
    format_version: u32,
    checksum: String,
    schema: &'a FeatureSchema,
    metadata: &'a TrainingMetadata,
    model: &'a RandomForest,
}

/// Just enough to tell what kind of file this is.
#[derive(Deserialize)]
struct Header {
    format: Option<String>,
    format_version: Option<u32>,
}

#[derive(Deserialize)]
struct Envelope {
    checksum: String,
    schema: FeatureSchema,
    metadata: TrainingMetadata,
    model: RandomForest,
}

pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<(), PersistenceError> {
    let corrupt = |reason: String| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    let checksum = artifact
        .checksum()
        .map_err(|e| corrupt(format!("failed to serialize: {e}")))?;
    let body = serde_json::to_vec(&EnvelopeRef {
        format: ARTIFACT_FORMAT,
        format_version: ARTIFACT_FORMAT_VERSION,
        checksum,
        schema: &artifact.schema,
        metadata: &artifact.metadata,
        model: &artifact.model,
    })
    .map_err(|e| corrupt(format!("failed to serialize: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| io(&dir, e))?;

    let tmp = temp_path(path);
    write_synced(&tmp, &body).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io(path, e)
    })?;
    sync_dir(&dir)?;

    info!(
        path = %path.display(),
        bytes = body.len(),
        schema_version = artifact.schema.version,
        "Saved model artifact"
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let bytes = fs::read(path).map_err(|e| io(path, e))?;
    let corrupt = |reason: String| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let header: Header =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(format!("not valid JSON: {e}")))?;
    match (header.format.as_deref(), header.format_version) {
        (Some(ARTIFACT_FORMAT), Some(ARTIFACT_FORMAT_VERSION)) => {}
        (Some(ARTIFACT_FORMAT), Some(v)) => {
            return Err(PersistenceError::UnsupportedFormat {
                path: path.to_path_buf(),
                found: format!("{ARTIFACT_FORMAT} v{v}"),
            }
            .into())
        }
        (found, _) => {
            return Err(PersistenceError::UnsupportedFormat {
                path: path.to_path_buf(),
                found: found.unwrap_or("<none>").to_string(),
            }
            .into())
        }
    }

    let envelope: Envelope = serde_json::from_slice(&bytes)
        .map_err(|e| corrupt(format!("malformed artifact: {e}")))?;
    let actual = checksum_of(&envelope.schema, &envelope.metadata, &envelope.model)
        .map_err(|e| corrupt(format!("failed to re-serialize: {e}")))?;
    if actual != envelope.checksum {
        return Err(corrupt("checksum mismatch".to_string()).into());
    }
    if !envelope.model.is_well_formed() {
        return Err(corrupt("forest structure is inconsistent".to_string()).into());
    }

    let artifact = ModelArtifact::new(envelope.schema, envelope.metadata, envelope.model);
    artifact.validate()?;
    debug!(
        path = %path.display(),
        schema_version = artifact.schema.version,
        trees = artifact.model.n_trees(),
        "Loaded model artifact"
    );
    Ok(artifact)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.json".to_string());
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

fn write_synced(path: &Path, body: &[u8]) -> Result<(), PersistenceError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| io(path, e))?;
    file.write_all(body).map_err(|e| io(path, e))?;
    file.sync_all().map_err(|e| io(path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), PersistenceError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), PersistenceError> {
    Ok(())
}

fn io(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}
