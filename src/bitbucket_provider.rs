//! Bitbucket Server (Stash) REST 1.0 client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::cli::SourceSettings;
use crate::error::MigrateError;
use crate::provider::{CloneLink, SourceProvider, SourceRepo};
use crate::repository::GroupSlug;

const PAGE_LIMIT: u32 = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    values: Vec<T>,
    #[serde(default = "last_page")]
    is_last_page: bool,
    next_page_start: Option<u32>,
}

fn last_page() -> bool {
    true
}

#[derive(Deserialize)]
struct RepoJson {
    slug: String,
    name: String,
    #[serde(default)]
    links: LinksJson,
    origin: Option<serde_json::Value>,
}

#[derive(Default, Deserialize)]
struct LinksJson {
    #[serde(default)]
    clone: Vec<LinkJson>,
}

#[derive(Deserialize)]
struct LinkJson {
    href: String,
    name: String,
}

#[derive(Deserialize)]
struct ProjectJson {
    name: String,
}

impl From<RepoJson> for SourceRepo {
    fn from(repo: RepoJson) -> Self {
        SourceRepo {
            slug: repo.slug,
            name: repo.name,
            clone_links: repo
                .links
                .clone
                .into_iter()
                .map(|link| CloneLink {
                    name: link.name,
                    href: link.href,
                })
                .collect(),
            is_fork: repo.origin.is_some(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BitbucketProvider {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    secret: String,
}

impl BitbucketProvider {
    pub fn new(base_url: Url, username: impl Into<String>, secret: impl Into<String>) -> Self {
        BitbucketProvider {
            client: reqwest::Client::new(),
            base_url,
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Fails when no source secret is configured.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, MigrateError> {
        Ok(Self::new(
            settings.base_url.clone(),
            settings.username.clone(),
            settings.secret()?,
        ))
    }

    fn endpoint(&self, route: &str) -> Result<Url> {
        self.base_url
            .join(route)
            .with_context(|| format!("invalid Bitbucket route {}", route))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.secret))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} was rejected", url))?;

        response
            .json()
            .await
            .with_context(|| format!("unexpected response body from {}", url))
    }
}

#[async_trait]
impl SourceProvider for BitbucketProvider {
    async fn list_repos(&self, group: &GroupSlug) -> Result<Vec<SourceRepo>> {
        let route = format!("rest/api/1.0/projects/{}/repos", group);
        let mut repos = Vec::new();
        let mut start = 0;

        loop {
            let mut url = self.endpoint(&route)?;
            url.query_pairs_mut()
                .append_pair("start", &start.to_string())
                .append_pair("limit", &PAGE_LIMIT.to_string());

            let page: Page<RepoJson> = self.get(url).await?;
            debug!(%group, start, count = page.values.len(), "listed repository page");
            repos.extend(page.values.into_iter().map(SourceRepo::from));

            match page.next_page_start {
                Some(next) if !page.is_last_page => start = next,
                _ => break,
            }
        }

        Ok(repos)
    }

    async fn group_display_name(&self, group: &GroupSlug) -> Result<String> {
        match group {
            GroupSlug::Personal(slug) => Ok(slug.clone()),
            GroupSlug::Project(slug) => {
                let url = self.endpoint(&format!("rest/api/1.0/projects/{}", slug))?;
                let project: ProjectJson = self.get(url).await?;
                Ok(project.name)
            }
        }
    }
}
