//! Destination repository naming.
//!
//! Names are `<team prefix>-[<project prefix>-]<repo slug>`. The project
//! prefix is skipped when the slug already starts with it, so a project
//! `myproject` turns `cat-repo` into `TEAM-myproject-cat-repo` but leaves
//! `myproject-cat` as `TEAM-myproject-cat`.

use std::collections::HashMap;

use crate::error::MigrateError;
use crate::repository::{GroupSlug, RepositoryDescriptor};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamingConfig {
    pub team_prefix: String,
    pub use_project_prefix: bool,
    /// Group slug to the prefix used in its repository names.
    pub project_slug_mappings: HashMap<String, String>,
    /// Group slug to repository slug to a verbatim replacement name.
    pub repo_name_mapping: HashMap<String, HashMap<String, String>>,
}

pub fn destination_name(config: &NamingConfig, group: &GroupSlug, repo_slug: &str) -> String {
    let project = match group {
        GroupSlug::Personal(_) => return repo_slug.to_string(),
        GroupSlug::Project(slug) => slug,
    };

    let mut parts = vec![config.team_prefix.as_str()];

    let project_prefix = config
        .project_slug_mappings
        .get(project)
        .map_or(project.as_str(), String::as_str);

    let remapped = config
        .repo_name_mapping
        .get(project)
        .and_then(|repos| repos.get(repo_slug));

    match remapped {
        Some(name) => parts.push(name),
        None => {
            if config.use_project_prefix && !repo_slug.starts_with(project_prefix) {
                parts.push(project_prefix);
            }
            parts.push(repo_slug);
        }
    }

    parts.join("-")
}

/// Names every descriptor, failing if two different repositories end up with
/// the same name. The check runs over the complete set, never incrementally.
pub fn resolve_all<'a, I>(config: &NamingConfig, descriptors: I) -> Result<Vec<String>, MigrateError>
where
    I: IntoIterator<Item = &'a RepositoryDescriptor>,
{
    let named: Vec<(&RepositoryDescriptor, String)> = descriptors
        .into_iter()
        .map(|d| (d, destination_name(config, &d.group, &d.repo_slug)))
        .collect();

    let mut claimed: HashMap<&str, &RepositoryDescriptor> = HashMap::new();
    for (descriptor, name) in &named {
        if let Some(first) = claimed.insert(name.as_str(), descriptor) {
            if first.group != descriptor.group || first.repo_slug != descriptor.repo_slug {
                return Err(MigrateError::NamingCollision {
                    name: name.clone(),
                    first: first.to_string(),
                    second: descriptor.to_string(),
                });
            }
        }
    }

    Ok(named.into_iter().map(|(_, name)| name).collect())
}
