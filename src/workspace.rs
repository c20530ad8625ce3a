//! Per-source workspace: saved bodies plus the `index.txt` manifest
//!
//! A workspace is the directory `<output_dir>/<name>/` a source processor fills
//! while its requests complete. The id counter and the index file handle are kept
//! together behind one async mutex, and [`SourceWorkspace::persist`] is the only way
//! to mutate them: it claims the next id, writes `<id>.html` and appends the index
//! line in one critical section. Ids therefore follow completion order and never
//! skip or repeat.

use crate::error::{Error, Result};
use crate::types::{PageId, SavedPage};
use crate::utils::index_path;
use std::path::{Path, PathBuf};
use tokio::fs;
use std::io::SeekFrom;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Name of the manifest inside every workspace
pub const INDEX_FILE: &str = "index.txt";

struct WorkspaceState {
    /// Id the next persisted page receives
    next_id: u64,
    index: fs::File,
    /// Length of `index` up to the last complete line
    index_len: u64,
}

impl WorkspaceState {
    /// Cut the index back to its last complete line and move the cursor there
    async fn rewind_index(&mut self) -> std::io::Result<()> {
        self.index.set_len(self.index_len).await?;
        self.index.seek(SeekFrom::Start(self.index_len)).await?;
        Ok(())
    }
}

/// Transient directory holding one source's fetched pages
pub struct SourceWorkspace {
    name: String,
    dir: PathBuf,
    state: Mutex<WorkspaceState>,
}

impl SourceWorkspace {
    /// Create `<output_dir>/<name>/` and its empty index
    ///
    /// Fails if the directory already exists, so a leftover workspace from an earlier
    /// run is never mixed into a new archive. If the index cannot be created the new
    /// directory is removed again.
    pub async fn create(output_dir: &Path, name: &str) -> Result<Self> {
        let dir = output_dir.join(name);
        fs::create_dir(&dir)
            .await
            .map_err(|e| Error::WorkspaceCreate {
                path: dir.clone(),
                source: e,
            })?;

        let index_file = dir.join(INDEX_FILE);
        let index = match fs::File::create(&index_file).await {
            Ok(f) => f,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir).await {
                    tracing::warn!(path = ?dir, error = %cleanup, "failed to remove workspace");
                }
                return Err(Error::IndexCreate {
                    path: index_file,
                    source: e,
                });
            }
        };

        tracing::debug!(source = name, path = ?dir, "workspace created");
        Ok(Self {
            name: name.to_string(),
            dir,
            state: Mutex::new(WorkspaceState {
                next_id: 1,
                index,
                index_len: 0,
            }),
        })
    }

    /// Workspace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a fetched body and record it in the index
    ///
    /// On a write failure the partial file is removed and the id is not consumed, so
    /// the ids on disk stay contiguous.
    pub async fn persist(&self, url: &str, body: &[u8]) -> Result<SavedPage> {
        let mut state = self.state.lock().await;
        let id = PageId(state.next_id);
        let file_name = id.file_name();
        let path = self.dir.join(&file_name);

        if let Err(e) = fs::write(&path, body).await {
            if let Err(cleanup) = fs::remove_file(&path).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = ?path, error = %cleanup, "failed to remove partial file");
            }
            return Err(Error::Persist {
                url: url.to_string(),
                path,
                source: e,
            });
        }

        let entry = index_path(&self.name, &file_name);
        let line = format!("{}, {}\n", url, entry);
        let appended = async {
            state.index.write_all(line.as_bytes()).await?;
            state.index.flush().await
        }
        .await;
        if let Err(e) = appended {
            // The body is useless without its index line; drop it and keep the id free.
            if let Err(cleanup) = state.rewind_index().await {
                tracing::warn!(source = %self.name, error = %cleanup, "failed to rewind index");
            }
            if let Err(cleanup) = fs::remove_file(&path).await {
                tracing::warn!(path = ?path, error = %cleanup, "failed to remove unindexed file");
            }
            return Err(Error::Persist {
                url: url.to_string(),
                path: self.dir.join(INDEX_FILE),
                source: e,
            });
        }

        state.next_id += 1;
        state.index_len += line.len() as u64;
        Ok(SavedPage {
            id,
            index_path: entry,
        })
    }

    /// Flush and close the index, leaving a stable directory for archiving
    pub async fn finish(self) -> Result<PathBuf> {
        let state = self.state.into_inner();
        state.index.sync_all().await?;
        drop(state);
        Ok(self.dir)
    }
}
