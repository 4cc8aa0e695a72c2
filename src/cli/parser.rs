use std::collections::HashMap;
use std::path::PathBuf;

use reqwest::Url;

use super::common::PermissionGrant;
use super::reader;
use crate::error::MigrateError;
use crate::ignore::IgnoreRuleSet;
use crate::naming::NamingConfig;
use crate::repository::GroupSlug;

/// Validated, immutable run configuration. Built once and handed to every
/// component constructor.
#[derive(Clone, Debug)]
pub struct ParsedConfig {
    pub source: SourceSettings,
    pub ignore: IgnoreRuleSet,
    pub mirror: MirrorSettings,
    pub destination: DestinationSettings,
}

#[derive(Clone, Debug)]
pub struct SourceSettings {
    pub host: String,
    pub base_url: Url,
    pub username: String,
    /// `None` when neither `api_key` nor `PW` is set. Only the clone modes
    /// talk to the source, so only they require it.
    pub secret: Option<String>,
    pub project_slugs: Vec<GroupSlug>,
    pub user_slugs: Vec<GroupSlug>,
    pub repo_slugs: HashMap<String, Vec<String>>,
}

impl SourceSettings {
    pub fn secret(&self) -> Result<&str, MigrateError> {
        self.secret.as_deref().ok_or_else(|| {
            MigrateError::Config("source.api_key is empty and PW is not set".to_string())
        })
    }

    /// Projects first, then personal namespaces, in configuration order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupSlug> {
        self.project_slugs.iter().chain(self.user_slugs.iter())
    }
}

#[derive(Clone, Debug)]
pub struct MirrorSettings {
    pub location: PathBuf,
    pub concurrency: usize,
}

#[derive(Clone, Debug)]
pub struct DestinationSettings {
    pub host: String,
    pub base_url: Url,
    pub username: String,
    pub api_key: String,
    pub org_name: String,
    pub team_owner: String,
    pub grants: Vec<PermissionGrant>,
    pub skip_permissions_if_repo_exists: bool,
    pub naming: NamingConfig,
}

/// `env_password` is the value of `PW`, used when `source.api_key` is empty.
pub fn parse_config(
    config: reader::Config,
    env_password: Option<String>,
) -> Result<ParsedConfig, MigrateError> {
    let reader::Config {
        source,
        ignore,
        mirror,
        destination,
    } = config;

    let secret = if source.api_key.is_empty() {
        env_password.filter(|pw| !pw.is_empty())
    } else {
        Some(source.api_key)
    };

    let project_slugs: Vec<GroupSlug> = source
        .project_slugs
        .iter()
        .map(|slug| GroupSlug::parse(slug))
        .collect();

    let user_slugs = source
        .user_slugs
        .iter()
        .map(|slug| match GroupSlug::parse(slug) {
            personal @ GroupSlug::Personal(_) => Ok(personal),
            GroupSlug::Project(_) => Err(MigrateError::Config(format!(
                "user slug {} must start with ~",
                slug
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let migrates_projects = project_slugs.iter().any(|group| !group.is_personal());
    if migrates_projects {
        for (field, value) in [
            ("destination.org_name", &destination.org_name),
            ("destination.team_prefix", &destination.team_prefix),
            ("destination.team_owner", &destination.team_owner),
        ] {
            if value.is_empty() {
                return Err(MigrateError::Config(format!(
                    "{} is required when project slugs are configured",
                    field
                )));
            }
        }
    }

    let source_base = match &source.api_url {
        Some(url) => url.clone(),
        None => format!("https://{}/", source.host),
    };
    let destination_base = match &destination.api_url {
        Some(url) => url.clone(),
        None => github_api_url(&destination.host),
    };

    let ignore = IgnoreRuleSet::new(&ignore.repos, &ignore.patterns, ignore.forked_repos_in_user)?;

    let grants = destination
        .repo_access
        .into_iter()
        .map(|(level, team)| PermissionGrant { level, team })
        .collect();

    Ok(ParsedConfig {
        source: SourceSettings {
            base_url: parse_base_url("source", &source_base)?,
            host: source.host,
            username: source.username,
            secret,
            project_slugs,
            user_slugs,
            repo_slugs: source.repo_slugs,
        },
        ignore,
        mirror: MirrorSettings {
            location: mirror.location,
            concurrency: mirror.concurrency.unwrap_or(1).max(1),
        },
        destination: DestinationSettings {
            base_url: parse_base_url("destination", &destination_base)?,
            host: destination.host,
            username: destination.username,
            api_key: destination.api_key,
            org_name: destination.org_name,
            team_owner: destination.team_owner,
            grants,
            skip_permissions_if_repo_exists: destination.skip_permissions_if_repo_exists,
            naming: NamingConfig {
                team_prefix: destination.team_prefix,
                use_project_prefix: destination.use_project_prefix,
                project_slug_mappings: destination.project_slug_mappings,
                repo_name_mapping: destination.repo_name_mapping,
            },
        },
    })
}

fn github_api_url(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com/".to_string()
    } else {
        format!("https://{}/api/v3/", host)
    }
}

/// Parses an API base, forcing a trailing slash so relative routes join
/// beneath it instead of replacing its last segment.
fn parse_base_url(section: &str, raw: &str) -> Result<Url, MigrateError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };

    Url::parse(&normalized)
        .map_err(|e| MigrateError::Config(format!("invalid {} API URL {}: {}", section, raw, e)))
}
