//! # JSON Snapshot Files
//!
//! Whole-file JSON persistence used by the reminder store and the stats ledger.
//! Every write replaces the file atomically: the snapshot goes to a sibling
//! `.tmp` file which is synced and then renamed over the target.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::core::error::{ReminderError, ReminderResult};

fn io_error(path: &Path, source: std::io::Error) -> ReminderError {
    ReminderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create the file with an empty JSON list if it does not exist yet
pub async fn ensure_json_list(path: &Path) -> ReminderResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Creating empty data file {}", path.display());
            write_json_atomic(path, &Vec::<()>::new()).await
        }
        Err(e) => Err(io_error(path, e)),
    }
}

/// Read and parse a JSON file. A parse failure is reported as corruption.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> ReminderResult<T> {
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ReminderError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` and atomically replace `path` with it
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> ReminderResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = temp_path(path);

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    file.write_all(&bytes).await.map_err(|e| io_error(&tmp, e))?;
    file.sync_all().await.map_err(|e| io_error(&tmp, e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
