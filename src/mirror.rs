//! The on-disk catalogue of bare mirrors, `<root>/<group>/<repo>.git`.
//!
//! This tree is the only state that survives between runs. Sync-down writes
//! it, sync-up reads it back with [`MirrorStore::scan`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::ParsedConfig;
use crate::error::{MigrateError, TransferOp};
use crate::git::{LocalMirror, Vcs, ORIGIN_REMOTE};
use crate::repository::{GroupSlug, MirrorRecord, RepositoryDescriptor, MIRROR_SUFFIX};
use crate::retry::{retry, RetryPolicy};

/// What [`MirrorStore::materialize`] did to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Materialized {
    Cloned,
    Refreshed,
    /// Already on disk and refreshing was not requested.
    Untouched,
}

pub struct MirrorStore<V> {
    vcs: V,
    config: Arc<ParsedConfig>,
    retry: RetryPolicy,
}

impl<V: Vcs> MirrorStore<V> {
    pub fn new(vcs: V, config: Arc<ParsedConfig>) -> Self {
        MirrorStore {
            vcs,
            config,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.config.mirror.location
    }

    /// Brings one mirror up to date on disk and binds its local handle.
    pub async fn materialize(
        &self,
        record: &mut MirrorRecord,
        refresh: bool,
    ) -> Result<Materialized, MigrateError> {
        let location = record.location.clone();

        let metadata = match tokio::fs::metadata(&location).await {
            Ok(metadata) => Some(metadata),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(MigrateError::io(&location, e)),
        };

        match metadata {
            None => {
                let url = source_url(record)?;
                info!(
                    "Mirroring repo from {}/{} to {}",
                    record.descriptor.group,
                    record.descriptor.display_name,
                    location.display()
                );

                let repository = record.to_string();
                retry(&self.retry, TransferOp::Clone, &repository, || {
                    self.vcs.mirror_clone(url, &location)
                })
                .await?;

                record.state.local = Some(LocalMirror::new(&location));
                Ok(Materialized::Cloned)
            }
            Some(metadata) if metadata.is_dir() => {
                let local = self.open(record).await?;

                let outcome = if refresh {
                    let url = source_url(record)?;
                    info!(
                        "Updating repo {}/{} at {}",
                        record.descriptor.group,
                        record.descriptor.display_name,
                        location.display()
                    );

                    let repository = record.to_string();
                    self.vcs
                        .set_remote_url(&local, ORIGIN_REMOTE, url)
                        .await
                        .map_err(|source| MigrateError::Git {
                            operation: "remote set-url",
                            repository: repository.clone(),
                            source,
                        })?;

                    retry(&self.retry, TransferOp::Fetch, &repository, || {
                        self.vcs.fetch_prune(&local, ORIGIN_REMOTE)
                    })
                    .await?;

                    Materialized::Refreshed
                } else {
                    warn!(
                        "Repo {} already exists but not updating existing repos",
                        record
                    );
                    Materialized::Untouched
                };

                record.state.local = Some(local);
                Ok(outcome)
            }
            Some(_) => Err(MigrateError::NotADirectory(location)),
        }
    }

    async fn open(&self, record: &MirrorRecord) -> Result<LocalMirror, MigrateError> {
        self.vcs
            .open(&record.location)
            .await
            .map_err(|source| MigrateError::Git {
                operation: "open",
                repository: record.to_string(),
                source,
            })
    }

    /// Rebuilds a record for every mirror under the root, without any access
    /// to the source platform.
    pub async fn scan(&self) -> Result<Vec<MirrorRecord>, MigrateError> {
        let root = self.root().to_path_buf();
        if !root.exists() {
            warn!("Mirror root {} does not exist", root.display());
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for group_dir in visible_entries(&root).await? {
            if !group_dir.is_dir() {
                continue;
            }
            let group = GroupSlug::parse(&file_name(&group_dir));

            for repo_dir in visible_entries(&group_dir).await? {
                let dir_name = file_name(&repo_dir);
                let repo_slug = dir_name
                    .strip_suffix(MIRROR_SUFFIX)
                    .unwrap_or(&dir_name)
                    .to_string();

                if self.config.ignore.is_ignored(&group, &repo_slug) {
                    continue;
                }
                debug!("repoDir {} to {}", dir_name, repo_slug);

                let descriptor = RepositoryDescriptor::new(group.clone(), repo_slug);
                let local = self
                    .vcs
                    .open(&repo_dir)
                    .await
                    .map_err(|source| MigrateError::Git {
                        operation: "open",
                        repository: descriptor.to_string(),
                        source,
                    })?;

                records.push(MirrorRecord::from_disk(repo_dir, descriptor, local));
            }
        }

        records.sort_by(|a, b| a.descriptor.cmp(&b.descriptor));
        info!("Found {} repositories to migrate", records.len());
        Ok(records)
    }
}

fn source_url(record: &MirrorRecord) -> Result<&str, MigrateError> {
    record
        .source_clone_url
        .as_deref()
        .ok_or_else(|| MigrateError::MissingCloneUrl(record.to_string()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Entries of `dir` whose names do not start with a dot.
async fn visible_entries(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| MigrateError::io(dir, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MigrateError::io(dir, e))?
    {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }

    paths.sort();
    Ok(paths)
}
