//! File system placer implementation.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};

use super::config::PlacerConfig;
use super::error::{FsOperation, PlacerError};
use super::locks::DestinationLocks;
use super::naming::{random_letters, NameGenerator, RandomSuffixGenerator};
use super::traits::Placer;
use super::types::{OverwritePolicy, PlacementOutcome, PlacementRequest};

/// What currently sits at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Absent,
    File,
    Directory,
}

/// Looks at `path`, following symlinks.
async fn inspect(path: &Path) -> Result<PathState, PlacerError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(PathState::Directory),
        Ok(_) => Ok(PathState::File),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(PathState::Absent),
        Err(e) => Err(PlacerError::filesystem(FsOperation::Inspect, path, e)),
    }
}

/// Whether a rename failed only because source and target are on different devices.
fn is_cross_device(e: &std::io::Error) -> bool {
    // EXDEV is 18 on Linux and macOS
    e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

/// File system based placer implementation.
///
/// Moves are a single `rename` when source and destination share a volume.
/// Otherwise the payload is copied to a hidden sibling of the destination
/// and renamed into place, so a partial copy is never visible under the
/// final name.
pub struct FsPlacer {
    config: PlacerConfig,
    names: Arc<dyn NameGenerator>,
    locks: DestinationLocks,
}

impl FsPlacer {
    /// Creates a new file system placer with the given configuration.
    pub fn new(config: PlacerConfig) -> Self {
        let names = Arc::new(RandomSuffixGenerator::new(config.suffix_len));
        Self::with_name_generator(config, names)
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    /// Creates a placer with a custom alternate-name strategy.
    pub fn with_name_generator(config: PlacerConfig, names: Arc<dyn NameGenerator>) -> Self {
        Self {
            config,
            names,
            locks: DestinationLocks::new(),
        }
    }

    /// Finds an unused sibling name for `destination`.
    async fn alternate_path(&self, destination: &Path) -> Result<PathBuf, PlacerError> {
        let parent = destination.parent().unwrap_or_else(|| Path::new(""));
        let stem = destination.file_stem().unwrap_or_default();
        let extension = destination.extension();

        for _ in 0..self.config.max_rename_attempts {
            let candidate = parent.join(self.names.candidate(stem, extension));
            if inspect(&candidate).await? == PathState::Absent {
                return Ok(candidate);
            }
            debug!("Alternate name {} is taken", candidate.display());
        }

        Err(PlacerError::NoFreeName {
            path: destination.to_path_buf(),
            attempts: self.config.max_rename_attempts,
        })
    }

    /// Moves `source` to `target`, copying when a rename cannot cross volumes.
    async fn move_file(&self, source: &Path, target: &Path) -> Result<(), PlacerError> {
        match fs::rename(source, target).await {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                debug!(
                    "{} and {} are on different devices, copying",
                    source.display(),
                    target.display()
                );
                self.copy_into_place(source, target).await
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Either the payload vanished or the parent directory is missing.
                if inspect(source).await? == PathState::Absent {
                    Err(PlacerError::SourceMissing {
                        path: source.to_path_buf(),
                    })
                } else {
                    Err(PlacerError::filesystem(FsOperation::Move, target, e))
                }
            }
            Err(e) => Err(PlacerError::filesystem(FsOperation::Move, target, e)),
        }
    }

    /// Copies into a staging file next to `target`, renames it into place and
    /// removes `source`.
    async fn copy_into_place(&self, source: &Path, target: &Path) -> Result<(), PlacerError> {
        let parent = target.parent().unwrap_or_else(|| Path::new(""));
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "payload".to_string());
        let staging = parent.join(format!(".{}.{}.partial", file_name, random_letters(6)));

        if let Err(e) = self.copy_file(source, &staging).await {
            discard(&staging).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, target).await {
            discard(&staging).await;
            return Err(PlacerError::filesystem(FsOperation::Move, target, e));
        }

        if let Err(e) = fs::remove_file(source).await {
            // The payload is already in place; a stray temp file is not fatal.
            warn!(
                "Failed to remove source {} after copy: {}",
                source.display(),
                e
            );
        }

        Ok(())
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PlacerError::SourceMissing {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::filesystem(FsOperation::Copy, destination, e)
            }
        })?;

        let copy_err = |e| PlacerError::filesystem(FsOperation::Copy, destination, e);

        let dest_file = File::create(destination).await.map_err(copy_err)?;

        let buffer_size = self.config.buffer_size.max(1);
        let mut reader = BufReader::with_capacity(buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(buffer_size, dest_file);
        let mut buffer = vec![0u8; buffer_size];
        let mut total_bytes = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(copy_err)?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(copy_err)?;
            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(copy_err)?;
        writer.get_ref().sync_all().await.map_err(copy_err)?;

        Ok(total_bytes)
    }

    async fn place_locked(
        &self,
        request: &PlacementRequest,
    ) -> Result<PlacementOutcome, PlacerError> {
        let PlacementRequest {
            source,
            destination,
            policy,
        } = request;

        if inspect(source).await? == PathState::Absent {
            return Err(PlacerError::SourceMissing {
                path: source.clone(),
            });
        }

        let state = inspect(destination).await?;

        let target = match (policy, state) {
            (_, PathState::Absent) => destination.clone(),
            (OverwritePolicy::Keep, _) => {
                debug!(
                    "Keeping existing {}, payload {} not moved",
                    destination.display(),
                    source.display()
                );
                return Ok(PlacementOutcome::Skipped {
                    existing: destination.clone(),
                });
            }
            (_, PathState::Directory) => {
                return Err(PlacerError::DestinationIsDirectory {
                    path: destination.clone(),
                });
            }
            (OverwritePolicy::Overwrite, PathState::File) => {
                fs::remove_file(destination).await.map_err(|e| {
                    PlacerError::filesystem(FsOperation::Remove, destination, e)
                })?;
                destination.clone()
            }
            (OverwritePolicy::Rename, PathState::File) => {
                self.alternate_path(destination).await?
            }
        };

        self.move_file(source, &target).await?;

        Ok(PlacementOutcome::Placed { path: target })
    }
}

/// Best-effort removal of a staging file.
async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove staging file {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn place(&self, request: PlacementRequest) -> Result<PlacementOutcome, PlacerError> {
        let _guard = if self.config.serialize_destinations {
            Some(self.locks.acquire(&request.destination).await)
        } else {
            None
        };

        self.place_locked(&request).await
    }
}
