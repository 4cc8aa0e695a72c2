//! GitHub / GitHub Enterprise REST v3 client.
//!
//! Routes are relative (`user/orgs`, not `/user/orgs`) so they resolve below
//! an Enterprise base such as `https://host/api/v3/`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{AccessLevel, DestinationSettings};
use crate::provider::{DestinationProvider, DestinationRepo, Organization, Team};

#[derive(Deserialize)]
struct OrgJson {
    id: u64,
    login: String,
}

#[derive(Deserialize)]
struct TeamJson {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    permission: Option<String>,
}

#[derive(Deserialize)]
struct OwnerJson {
    login: String,
}

#[derive(Deserialize)]
struct RepoJson {
    name: String,
    owner: OwnerJson,
    clone_url: String,
}

impl From<RepoJson> for DestinationRepo {
    fn from(repo: RepoJson) -> Self {
        DestinationRepo {
            name: repo.name,
            owner: repo.owner.login,
            clone_url: repo.clone_url,
        }
    }
}

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    private: bool,
    has_wiki: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<u64>,
}

#[derive(Serialize)]
struct GrantBody<'a> {
    permission: &'a str,
}

pub struct GithubProvider {
    octocrab: Octocrab,
}

impl GithubProvider {
    pub fn configure_provider(base_url: &Url, token: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .base_url(base_url.as_str())
            .context("invalid GitHub API URL")?
            .build()
            .context("could not build GitHub client")?;

        Ok(GithubProvider { octocrab })
    }

    pub fn from_settings(settings: &DestinationSettings) -> Result<Self> {
        Self::configure_provider(&settings.base_url, &settings.api_key)
    }

    /// Follows `Link: rel="next"` until the listing is exhausted.
    async fn all_pages<T: DeserializeOwned>(&self, route: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut params: Vec<(&str, &str)> = vec![("per_page", "100")];
        params.extend_from_slice(query);

        let mut page: Page<T> = self
            .octocrab
            .get(route, Some(&params))
            .await
            .with_context(|| format!("GET {} failed", route))?;

        let mut items = std::mem::take(&mut page.items);
        while let Some(mut next) = self
            .octocrab
            .get_page::<T>(&page.next)
            .await
            .with_context(|| format!("GET {} (next page) failed", route))?
        {
            items.append(&mut next.items);
            page = next;
        }

        Ok(items)
    }

    async fn create_repo(&self, route: &str, body: &CreateRepoBody<'_>) -> Result<DestinationRepo> {
        let repo: RepoJson = self
            .octocrab
            .post(route, Some(body))
            .await
            .with_context(|| format!("POST {} ({}) failed", route, body.name))?;

        Ok(repo.into())
    }
}

#[async_trait]
impl DestinationProvider for GithubProvider {
    async fn organizations(&self) -> Result<Vec<Organization>> {
        let orgs: Vec<OrgJson> = self.all_pages("user/orgs", &[]).await?;

        Ok(orgs
            .into_iter()
            .map(|org| Organization {
                id: org.id,
                login: org.login,
            })
            .collect())
    }

    async fn teams(&self, org: &str) -> Result<Vec<Team>> {
        let teams: Vec<TeamJson> = self.all_pages(&format!("orgs/{}/teams", org), &[]).await?;

        Ok(teams
            .into_iter()
            .map(|team| Team {
                id: team.id,
                name: team.name,
                slug: team.slug,
            })
            .collect())
    }

    async fn org_repos(&self, org: &str) -> Result<Vec<DestinationRepo>> {
        let repos: Vec<RepoJson> = self
            .all_pages(&format!("orgs/{}/repos", org), &[("type", "all")])
            .await?;

        Ok(repos.into_iter().map(DestinationRepo::from).collect())
    }

    async fn user_repos(&self) -> Result<Vec<DestinationRepo>> {
        let repos: Vec<RepoJson> = self
            .all_pages("user/repos", &[("affiliation", "owner")])
            .await?;

        Ok(repos.into_iter().map(DestinationRepo::from).collect())
    }

    async fn create_org_repo(
        &self,
        org: &str,
        name: &str,
        team_id: u64,
    ) -> Result<DestinationRepo> {
        let body = CreateRepoBody {
            name,
            private: true,
            has_wiki: false,
            team_id: Some(team_id),
        };

        self.create_repo(&format!("orgs/{}/repos", org), &body).await
    }

    async fn create_user_repo(&self, name: &str) -> Result<DestinationRepo> {
        let body = CreateRepoBody {
            name,
            private: true,
            has_wiki: false,
            team_id: None,
        };

        self.create_repo("user/repos", &body).await
    }

    async fn team_permission(
        &self,
        _org: &str,
        team: &Team,
        repo: &DestinationRepo,
    ) -> Result<Option<AccessLevel>> {
        let teams: Vec<TeamJson> = self
            .all_pages(&format!("repos/{}/{}/teams", repo.owner, repo.name), &[])
            .await?;

        let level = teams
            .into_iter()
            .find(|t| t.id == team.id)
            .and_then(|t| t.permission)
            .and_then(|permission| AccessLevel::from_github(&permission));

        debug!(team = %team.name, repo = %repo.name, ?level, "current team permission");
        Ok(level)
    }

    async fn grant_team(
        &self,
        org: &str,
        team: &Team,
        repo: &DestinationRepo,
        level: AccessLevel,
    ) -> Result<()> {
        let route = format!(
            "orgs/{}/teams/{}/repos/{}/{}",
            org, team.slug, repo.owner, repo.name
        );
        let url = self.octocrab.absolute_url(&route)?;
        let body = GrantBody {
            permission: level.as_github(),
        };

        let response = self
            .octocrab
            ._put(url, Some(&body))
            .await
            .with_context(|| format!("PUT {} failed", route))?;
        octocrab::map_github_error(response)
            .await
            .with_context(|| format!("PUT {} was rejected", route))?;

        Ok(())
    }
}
