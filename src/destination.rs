//! Reconciles the mirror store against the destination platform.
//!
//! Call order matters: [`DestinationReconciler::sign_in`] takes the read-only
//! snapshot of the organisation, then names are assigned over the whole set,
//! then each record is reconciled, permissioned, bound and pushed. In dry-run
//! mode the platform is only read; every mutation is logged and recorded as a
//! planned [`Event`] instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cli::ParsedConfig;
use crate::error::{MigrateError, TransferOp};
use crate::event::Event;
use crate::git::{embed_credentials, LocalMirror, Vcs, TARGET_REMOTE};
use crate::naming::resolve_all;
use crate::provider::{DestinationProvider, DestinationRepo, Organization, Team};
use crate::repository::MirrorRecord;
use crate::retry::{retry, RetryPolicy};

/// Destination state discovered at sign-in and only read afterwards.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub organization: Option<Organization>,
    pub teams: HashMap<String, Team>,
    pub org_repos: HashMap<String, DestinationRepo>,
    pub user_repos: HashMap<String, DestinationRepo>,
}

pub struct DestinationReconciler<D, V> {
    provider: D,
    vcs: V,
    config: Arc<ParsedConfig>,
    dry_run: bool,
    retry: RetryPolicy,
    snapshot: Snapshot,
    events: Mutex<Vec<Event>>,
}

impl<D: DestinationProvider, V: Vcs> DestinationReconciler<D, V> {
    pub fn new(provider: D, vcs: V, config: Arc<ParsedConfig>, dry_run: bool) -> Self {
        DestinationReconciler {
            provider,
            vcs,
            config,
            dry_run,
            retry: RetryPolicy::default(),
            snapshot: Snapshot::default(),
            events: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Mutations applied so far, or planned when running dry.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record_event(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    fn destination_error(&self, err: anyhow::Error) -> MigrateError {
        MigrateError::destination(&self.config.destination.host, err)
    }

    pub async fn sign_in(&mut self) -> Result<(), MigrateError> {
        let settings = &self.config.destination;
        let source = &self.config.source;

        let migrates_projects = source.groups().any(|group| !group.is_personal());
        let migrates_users = source.groups().any(|group| group.is_personal());
        if !migrates_projects && !migrates_users {
            return Err(MigrateError::NoMigrationScope);
        }

        let mut snapshot = Snapshot::default();

        if migrates_projects {
            let organizations = self
                .provider
                .organizations()
                .await
                .map_err(|e| self.destination_error(e))?;
            for org in &organizations {
                debug!("User is a member of organisation {}", org.login);
            }

            let organization = organizations
                .into_iter()
                .find(|org| org.login == settings.org_name)
                .ok_or_else(|| MigrateError::MissingOrganization(settings.org_name.clone()))?;

            let teams = self
                .provider
                .teams(&organization.login)
                .await
                .map_err(|e| self.destination_error(e))?;
            for team in teams {
                debug!("Team: {}", team.name);
                snapshot.teams.insert(team.name.clone(), team);
            }

            if !snapshot.teams.contains_key(&settings.team_owner) {
                return Err(MigrateError::MissingOwnerTeam {
                    team: settings.team_owner.clone(),
                    org: organization.login,
                });
            }

            let repos = self
                .provider
                .org_repos(&organization.login)
                .await
                .map_err(|e| self.destination_error(e))?;
            for repo in repos {
                debug!("* Repository {}", repo.name);
                snapshot.org_repos.insert(repo.name.clone(), repo);
            }

            snapshot.organization = Some(organization);
        }

        if migrates_users {
            let repos = self
                .provider
                .user_repos()
                .await
                .map_err(|e| self.destination_error(e))?;
            for repo in repos {
                debug!("* Repository {}", repo.name);
                snapshot.user_repos.insert(repo.name.clone(), repo);
            }
        }

        info!(
            org = ?snapshot.organization.as_ref().map(|org| org.login.as_str()),
            teams = snapshot.teams.len(),
            repos = snapshot.org_repos.len() + snapshot.user_repos.len(),
            "signed in to {}",
            settings.host
        );

        self.snapshot = snapshot;
        Ok(())
    }

    /// Names every record. Nothing is assigned if any two collide.
    pub fn assign_names(&self, records: &mut [MirrorRecord]) -> Result<(), MigrateError> {
        let names = resolve_all(
            &self.config.destination.naming,
            records.iter().map(|record| &record.descriptor),
        )?;

        for (record, name) in records.iter_mut().zip(names) {
            debug!("{} will be named {}", record, name);
            record.state.destination_name = Some(name);
        }
        Ok(())
    }

    fn organization(&self) -> Result<&Organization, MigrateError> {
        self.snapshot
            .organization
            .as_ref()
            .ok_or_else(|| MigrateError::MissingOrganization(self.config.destination.org_name.clone()))
    }

    fn team(&self, name: &str) -> Result<&Team, MigrateError> {
        self.snapshot
            .teams
            .get(name)
            .ok_or_else(|| MigrateError::UnknownTeam(name.to_string()))
    }

    /// Makes sure the destination repository exists and decides whether its
    /// team permissions need to be (re)applied.
    pub async fn reconcile(&self, record: &mut MirrorRecord) -> Result<(), MigrateError> {
        let name = destination_name(record)?.to_string();
        let personal = record.descriptor.group.is_personal();
        debug!("Repository {}:", name);

        let existing = if personal {
            self.snapshot.user_repos.get(&name)
        } else {
            self.snapshot.org_repos.get(&name)
        };

        let mut set_permissions = true;
        match existing {
            None => {
                info!("Creating new repository {}", name);
                self.record_event(Event::CreateRepository {
                    name: name.clone(),
                    personal,
                });

                if !self.dry_run {
                    let created = if personal {
                        self.provider.create_user_repo(&name).await
                    } else {
                        let org = self.organization()?;
                        let owner = self.team(&self.config.destination.team_owner)?;
                        self.provider.create_org_repo(&org.login, &name, owner.id).await
                    };
                    let created = created.map_err(|e| self.destination_error(e))?;

                    debug!("* Repo created");
                    record.state.destination = Some(created);
                }
            }
            Some(repo) => {
                debug!("* Repo already exists");
                record.state.destination = Some(repo.clone());

                if self.config.destination.skip_permissions_if_repo_exists {
                    set_permissions = false;
                }
            }
        }

        if personal {
            info!("Skip adding any Team permissions for personal repo {}", name);
            set_permissions = false;
        }

        record.state.set_permissions = set_permissions;
        Ok(())
    }

    /// Grants every configured team at least its configured level. Existing
    /// grants are never lowered or revoked.
    pub async fn apply_permissions(&self, record: &MirrorRecord) -> Result<(), MigrateError> {
        if !record.state.set_permissions {
            return Ok(());
        }

        let name = destination_name(record)?;
        let org = self.organization()?;

        for grant in &self.config.destination.grants {
            let team = self.team(&grant.team)?;
            info!(
                "Team {} wants permission {} on {}",
                team.name,
                grant.level.as_github(),
                name
            );

            let event = Event::GrantPermission {
                repository: name.to_string(),
                team: team.name.clone(),
                level: grant.level,
            };

            // A repository a dry run would have created has no grants yet.
            let repo = match (&record.state.destination, self.dry_run) {
                (None, true) => {
                    self.record_event(event);
                    continue;
                }
                _ => bound_repo(record)?,
            };

            let current = self
                .provider
                .team_permission(&org.login, team, repo)
                .await
                .map_err(|e| self.destination_error(e))?;

            if current.map_or(false, |level| level >= grant.level) {
                debug!("Team {} already has {:?} on {}", team.name, current, name);
                continue;
            }

            info!(
                "Adding team {} with permission {} to {}/{}",
                team.name,
                grant.level.as_github(),
                repo.owner,
                repo.name
            );
            if !self.dry_run {
                self.provider
                    .grant_team(&org.login, team, repo, grant.level)
                    .await
                    .map_err(|e| self.destination_error(e))?;
            }
            self.record_event(event);
        }

        Ok(())
    }

    /// Points the mirror's `target` remote at the destination repository.
    pub async fn bind_remote(&self, record: &MirrorRecord) -> Result<(), MigrateError> {
        let name = destination_name(record)?;
        let local = local_mirror(record)?;
        let event = Event::BindRemote {
            repository: name.to_string(),
            remote: TARGET_REMOTE.to_string(),
        };

        if self.dry_run {
            debug!("Create or update remote {} for {}", TARGET_REMOTE, name);
            self.record_event(event);
            return Ok(());
        }

        let repo = bound_repo(record)?;
        let settings = &self.config.destination;
        let url = embed_credentials(&repo.clone_url, &settings.username, &settings.api_key)?;

        let git_error = |operation: &'static str| {
            let repository = record.to_string();
            move |source| MigrateError::Git {
                operation,
                repository,
                source,
            }
        };

        let remotes = self
            .vcs
            .remotes(local)
            .await
            .map_err(git_error("remote"))?;

        if remotes.iter().any(|remote| remote == TARGET_REMOTE) {
            self.vcs
                .set_remote_url(local, TARGET_REMOTE, &url)
                .await
                .map_err(git_error("remote set-url"))?;
        } else {
            debug!("Create remote of {} to {}", TARGET_REMOTE, repo.clone_url);
            self.vcs
                .create_remote(local, TARGET_REMOTE, &url)
                .await
                .map_err(git_error("remote add"))?;
        }

        self.record_event(event);
        Ok(())
    }

    /// Mirror-pushes every ref, deletions included, to `target`.
    pub async fn push(&self, record: &MirrorRecord) -> Result<(), MigrateError> {
        let name = destination_name(record)?;
        let local = local_mirror(record)?;
        let event = Event::Push {
            repository: name.to_string(),
        };

        if self.dry_run {
            info!("Would push repository {}", name);
            self.record_event(event);
            return Ok(());
        }

        info!("Pushing repository {}", name);
        retry(&self.retry, TransferOp::Push, &record.to_string(), || {
            self.vcs.push_mirror(local, TARGET_REMOTE)
        })
        .await?;

        self.record_event(event);
        Ok(())
    }
}

fn destination_name(record: &MirrorRecord) -> Result<&str, MigrateError> {
    record
        .state
        .destination_name
        .as_deref()
        .ok_or_else(|| MigrateError::Unnamed(record.to_string()))
}

fn bound_repo(record: &MirrorRecord) -> Result<&DestinationRepo, MigrateError> {
    record
        .state
        .destination
        .as_ref()
        .ok_or_else(|| MigrateError::Unbound(record.to_string()))
}

fn local_mirror(record: &MirrorRecord) -> Result<&LocalMirror, MigrateError> {
    record
        .state
        .local
        .as_ref()
        .ok_or_else(|| MigrateError::NotMirrored(record.to_string()))
}
