//! Marker snapshot loading and writing
//!
//! The snapshot is a single JSON document holding the marker identifier counter
//! and every stored marker. It is read once at startup and replaced wholesale by
//! the periodic writer. Sessions are never persisted.

use crate::error::SnapshotError;
use livemap_shared::Snapshot;
use log::info;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads the snapshot at `path`
///
/// Returns `Ok(None)` when the file does not exist or is empty. Any other read
/// failure or malformed content is an error.
pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No snapshot at {}, starting empty", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        info!("Snapshot {} is empty, starting empty", path.display());
        return Ok(None);
    }

    let snapshot: Snapshot =
        serde_json::from_slice(&data).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        "Loaded {} markers from {} (CurrentMarkerId {})",
        snapshot.markers.len(),
        path.display(),
        snapshot.current_marker_id
    );

    Ok(Some(snapshot))
}

pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// Replaces the snapshot at `path` with `data`
///
/// The bytes go to a sibling temporary file first, which is then renamed over
/// the target, so readers never observe a partially written snapshot.
pub async fn write(path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
    let tmp_path = temp_path(path);
    let write_err = |source: std::io::Error| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&tmp_path, data).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
