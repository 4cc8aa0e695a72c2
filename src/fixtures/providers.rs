use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::cli::AccessLevel;
use crate::provider::{
    CloneLink, DestinationProvider, DestinationRepo, Organization, SourceProvider, SourceRepo, Team,
};
use crate::repository::GroupSlug;

pub fn source_repo(slug: &str, is_fork: bool) -> SourceRepo {
    SourceRepo {
        slug: slug.to_string(),
        name: slug.to_uppercase(),
        clone_links: vec![
            CloneLink {
                name: "ssh".to_string(),
                href: format!("ssh://git@bitbucket.example.com:7999/acme/{}.git", slug),
            },
            CloneLink {
                name: "http".to_string(),
                href: format!("https://bitbucket.example.com/scm/acme/{}.git", slug),
            },
        ],
        is_fork,
    }
}

#[derive(Debug, Default)]
struct SourceState {
    repos: HashMap<String, Vec<SourceRepo>>,
    list_calls: usize,
}

/// Source platform serving canned listings. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    pub fn with_repos(self, group: &str, repos: Vec<SourceRepo>) -> Self {
        self.state
            .lock()
            .unwrap()
            .repos
            .insert(group.to_string(), repos);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[async_trait]
impl SourceProvider for FakeSource {
    async fn list_repos(&self, group: &GroupSlug) -> Result<Vec<SourceRepo>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        state
            .repos
            .get(group.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Project {} does not exist", group))
    }

    async fn group_display_name(&self, group: &GroupSlug) -> Result<String> {
        Ok(match group {
            GroupSlug::Personal(slug) => slug.clone(),
            GroupSlug::Project(slug) => format!("{} project", slug),
        })
    }
}

/// Mutating calls received by [`FakeDestination`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestinationCall {
    CreateOrgRepo {
        org: String,
        name: String,
        team_id: u64,
    },
    CreateUserRepo {
        name: String,
    },
    GrantTeam {
        team_id: u64,
        repository: String,
        level: AccessLevel,
    },
}

#[derive(Debug, Default)]
struct DestinationState {
    organizations: Vec<Organization>,
    teams: Vec<Team>,
    org_repos: Vec<DestinationRepo>,
    user_repos: Vec<DestinationRepo>,
    permissions: HashMap<(u64, String), AccessLevel>,
    calls: Vec<DestinationCall>,
}

/// Destination platform kept in memory. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct FakeDestination {
    state: Arc<Mutex<DestinationState>>,
}

pub const FAKE_USER: &str = "migrator";

fn repo(owner: &str, name: &str) -> DestinationRepo {
    DestinationRepo {
        name: name.to_string(),
        owner: owner.to_string(),
        clone_url: format!("https://github.example.com/{}/{}.git", owner, name),
    }
}

impl FakeDestination {
    pub fn with_org(self, login: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.organizations.len() as u64 + 100;
            state.organizations.push(Organization {
                id,
                login: login.to_string(),
            });
        }
        self
    }

    pub fn with_team(self, id: u64, name: &str) -> Self {
        self.state.lock().unwrap().teams.push(Team {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace('_', "-"),
        });
        self
    }

    pub fn with_org_repo(self, org: &str, name: &str) -> Self {
        self.state.lock().unwrap().org_repos.push(repo(org, name));
        self
    }

    pub fn with_user_repo(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .user_repos
            .push(repo(FAKE_USER, name));
        self
    }

    pub fn set_permission(&self, team_id: u64, repository: &str, level: AccessLevel) {
        self.state
            .lock()
            .unwrap()
            .permissions
            .insert((team_id, repository.to_string()), level);
    }

    pub fn permission(&self, team_id: u64, repository: &str) -> Option<AccessLevel> {
        self.state
            .lock()
            .unwrap()
            .permissions
            .get(&(team_id, repository.to_string()))
            .copied()
    }

    pub fn calls(&self) -> Vec<DestinationCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn grant_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DestinationCall::GrantTeam { .. }))
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().len()
    }

    pub fn org_repo_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .org_repos
            .iter()
            .map(|repo| repo.name.clone())
            .collect()
    }
}

#[async_trait]
impl DestinationProvider for FakeDestination {
    async fn organizations(&self) -> Result<Vec<Organization>> {
        Ok(self.state.lock().unwrap().organizations.clone())
    }

    async fn teams(&self, _org: &str) -> Result<Vec<Team>> {
        Ok(self.state.lock().unwrap().teams.clone())
    }

    async fn org_repos(&self, org: &str) -> Result<Vec<DestinationRepo>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .org_repos
            .iter()
            .filter(|repo| repo.owner == org)
            .cloned()
            .collect())
    }

    async fn user_repos(&self) -> Result<Vec<DestinationRepo>> {
        Ok(self.state.lock().unwrap().user_repos.clone())
    }

    async fn create_org_repo(&self, org: &str, name: &str, team_id: u64) -> Result<DestinationRepo> {
        let mut state = self.state.lock().unwrap();
        if state.org_repos.iter().any(|repo| repo.owner == org && repo.name == name) {
            return Err(anyhow!("name already exists on this account"));
        }
        state.calls.push(DestinationCall::CreateOrgRepo {
            org: org.to_string(),
            name: name.to_string(),
            team_id,
        });
        let created = repo(org, name);
        state.org_repos.push(created.clone());
        Ok(created)
    }

    async fn create_user_repo(&self, name: &str) -> Result<DestinationRepo> {
        let mut state = self.state.lock().unwrap();
        if state.user_repos.iter().any(|repo| repo.name == name) {
            return Err(anyhow!("name already exists on this account"));
        }
        state.calls.push(DestinationCall::CreateUserRepo {
            name: name.to_string(),
        });
        let created = repo(FAKE_USER, name);
        state.user_repos.push(created.clone());
        Ok(created)
    }

    async fn team_permission(
        &self,
        _org: &str,
        team: &Team,
        repo: &DestinationRepo,
    ) -> Result<Option<AccessLevel>> {
        Ok(self.permission(team.id, &repo.name))
    }

    async fn grant_team(
        &self,
        _org: &str,
        team: &Team,
        repo: &DestinationRepo,
        level: AccessLevel,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DestinationCall::GrantTeam {
            team_id: team.id,
            repository: repo.name.clone(),
            level,
        });
        state.permissions.insert((team.id, repo.name.clone()), level);
        Ok(())
    }
}
