use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::ParsedConfig;
use crate::error::MigrateError;
use crate::git::embed_credentials;
use crate::provider::SourceProvider;
use crate::repository::{GroupSlug, MirrorRecord, RepositoryDescriptor};

/// A repository that survived filtering, with its authenticated clone URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub descriptor: RepositoryDescriptor,
    pub clone_url: String,
}

/// Lists what has to be mirrored from the source platform.
///
/// Listings are memoised per group for the lifetime of the enumerator, which
/// is one run.
pub struct SourceEnumerator<P> {
    provider: P,
    config: Arc<ParsedConfig>,
    cache: HashMap<GroupSlug, Vec<SourceDescriptor>>,
}

impl<P: SourceProvider> SourceEnumerator<P> {
    pub fn new(provider: P, config: Arc<ParsedConfig>) -> Self {
        SourceEnumerator {
            provider,
            config,
            cache: HashMap::new(),
        }
    }

    pub fn list_groups(&self) -> Vec<GroupSlug> {
        self.config.source.groups().cloned().collect()
    }

    pub async fn enumerate(&mut self, group: &GroupSlug) -> Result<Vec<SourceDescriptor>, MigrateError> {
        if let Some(cached) = self.cache.get(group) {
            return Ok(cached.clone());
        }

        let settings = &self.config.source;
        let listed = self
            .provider
            .list_repos(group)
            .await
            .map_err(|e| MigrateError::source(&settings.host, e))?;

        let mut surviving = Vec::new();
        for repo in listed {
            if self.config.ignore.is_ignored_source(group, &repo.slug, repo.is_fork) {
                continue;
            }

            let href = repo
                .http_clone_url()
                .ok_or_else(|| MigrateError::MissingCloneUrl(format!("{}/{}", group, repo.name)))?;
            let clone_url = embed_credentials(href, &settings.username, settings.secret()?)?;

            surviving.push(SourceDescriptor {
                descriptor: RepositoryDescriptor::new(group.clone(), repo.slug)
                    .with_display_name(repo.name),
                clone_url,
            });
        }

        if let Some(allowed) = settings.repo_slugs.get(group.as_str()) {
            surviving.retain(|repo| allowed.contains(&repo.descriptor.repo_slug));
        }

        debug!(
            %group,
            repos = ?surviving.iter().map(|r| r.descriptor.repo_slug.as_str()).collect::<Vec<_>>(),
            "enumerated repositories"
        );

        self.cache.insert(group.clone(), surviving.clone());
        Ok(surviving)
    }

    /// Mirror records for every configured group, creating each group's
    /// directory under the mirror root on the way.
    pub async fn enumerate_records(&mut self) -> Result<Vec<MirrorRecord>, MigrateError> {
        let root = self.config.mirror.location.clone();
        let mut records = Vec::new();

        for group in self.list_groups() {
            let group_dir = root.join(group.as_str());
            tokio::fs::create_dir_all(&group_dir)
                .await
                .map_err(|e| MigrateError::io(&group_dir, e))?;

            let group_name = self
                .provider
                .group_display_name(&group)
                .await
                .map_err(|e| MigrateError::source(&self.config.source.host, e))?;

            let repos = self.enumerate(&group).await?;
            if repos.is_empty() {
                let kind = if group.is_personal() { "user" } else { "project" };
                warn!("No repositories found for {} {}", kind, group);
                continue;
            }

            info!(%group, name = %group_name, count = repos.len(), "found repositories");
            records.extend(
                repos
                    .into_iter()
                    .map(|repo| MirrorRecord::from_source(&root, repo.descriptor, repo.clone_url)),
            );
        }

        Ok(records)
    }
}
