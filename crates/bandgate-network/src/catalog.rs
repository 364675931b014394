//! Keeps the local sound directory in step with the service's catalog.

use crate::error::ServiceError;
use crate::service::SoundSource;
use crate::types::RemoteSound;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sounds written because no local file existed.
    pub downloaded: Vec<String>,

    /// Sounds rewritten because the local file was older than the remote.
    pub refreshed: Vec<String>,

    /// Sounds already current.
    pub current: Vec<String>,
}

/// Download every remote sound that is missing from `sound_dir` or older
/// locally than its `last_update_timestamp`.
///
/// # Errors
///
/// Stops at the first failed request, undecodable sound or failed write.
pub async fn sync_sounds<S: SoundSource>(
    source: &S,
    sound_dir: &Path,
) -> Result<SyncReport, ServiceError> {
    let sounds = source.list_sounds().await?;
    debug!(count = sounds.len(), dir = %sound_dir.display(), "Syncing sound catalog");

    let mut report = SyncReport::default();
    for sound in sounds {
        let path = local_path(sound_dir, &sound.name)?;
        match local_modified(&path).await? {
            None => {
                info!(sound = %sound.name, "Downloading sound");
                download(source, &sound.name, &path).await?;
                report.downloaded.push(sound.name);
            }
            Some(modified) if is_stale(modified, &sound) => {
                info!(sound = %sound.name, "Local sound out of date, downloading");
                download(source, &sound.name, &path).await?;
                report.refreshed.push(sound.name);
            }
            Some(_) => report.current.push(sound.name),
        }
    }
    Ok(report)
}

fn is_stale(local: DateTime<Utc>, remote: &RemoteSound) -> bool {
    remote
        .last_update_timestamp
        .is_some_and(|updated| local < updated)
}

async fn local_modified(path: &Path) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata.modified()?.into())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn download<S: SoundSource>(source: &S, name: &str, path: &Path) -> Result<(), ServiceError> {
    let sound = source.fetch_sound(name).await?;
    let content = sound.content.as_deref().unwrap_or_default();
    let data = STANDARD
        .decode(content)
        .map_err(|e| ServiceError::Content {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    tokio::fs::write(path, data).await?;
    Ok(())
}

/// Remote names are confined to the sound directory.
fn local_path(sound_dir: &Path, name: &str) -> Result<PathBuf, ServiceError> {
    let file_name = Path::new(name)
        .file_name()
        .filter(|f| *f == std::ffi::OsStr::new(name))
        .ok_or_else(|| ServiceError::Content {
            name: name.to_string(),
            reason: "not a plain file name".to_string(),
        })?;
    Ok(sound_dir.join(file_name))
}
