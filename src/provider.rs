//! Capabilities the pipeline consumes from the two hosting platforms.

use anyhow::Result;
use async_trait::async_trait;

use crate::cli::AccessLevel;
use crate::repository::GroupSlug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloneLink {
    /// Protocol label advertised by the platform, e.g. `http` or `ssh`.
    pub name: String,
    pub href: String,
}

/// A repository as listed by the source platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRepo {
    pub slug: String,
    pub name: String,
    pub clone_links: Vec<CloneLink>,
    /// Whether the platform reports an origin repository this one was forked from.
    pub is_fork: bool,
}

impl SourceRepo {
    pub fn http_clone_url(&self) -> Option<&str> {
        self.clone_links
            .iter()
            .find(|link| link.name == "http")
            .map(|link| link.href.as_str())
    }
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Every repository of a project or personal namespace.
    async fn list_repos(&self, group: &GroupSlug) -> Result<Vec<SourceRepo>>;

    async fn group_display_name(&self, group: &GroupSlug) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Organization {
    pub id: u64,
    pub login: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// Handle to a repository that exists on the destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationRepo {
    pub name: String,
    pub owner: String,
    pub clone_url: String,
}

#[async_trait]
pub trait DestinationProvider: Send + Sync {
    /// Organisations the authenticated user belongs to.
    async fn organizations(&self) -> Result<Vec<Organization>>;

    async fn teams(&self, org: &str) -> Result<Vec<Team>>;

    async fn org_repos(&self, org: &str) -> Result<Vec<DestinationRepo>>;

    /// Repositories owned by the authenticated user.
    async fn user_repos(&self) -> Result<Vec<DestinationRepo>>;

    /// Private, wiki-less repository under `org`, owned by `team_id`.
    async fn create_org_repo(&self, org: &str, name: &str, team_id: u64)
        -> Result<DestinationRepo>;

    /// Private, wiki-less repository under the authenticated user.
    async fn create_user_repo(&self, name: &str) -> Result<DestinationRepo>;

    /// Current access of `team` on `repo`, `None` when it has none.
    async fn team_permission(
        &self,
        org: &str,
        team: &Team,
        repo: &DestinationRepo,
    ) -> Result<Option<AccessLevel>>;

    async fn grant_team(
        &self,
        org: &str,
        team: &Team,
        repo: &DestinationRepo,
        level: AccessLevel,
    ) -> Result<()>;
}
