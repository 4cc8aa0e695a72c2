use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;

use super::common::AccessLevel;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Config {
    pub source: SourceSection,
    #[serde(default)]
    pub ignore: IgnoreSection,
    pub mirror: MirrorSection,
    pub destination: DestinationSection,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SourceSection {
    pub host: String,
    pub api_url: Option<String>,
    pub username: String,
    /// Empty means "take the password from `PW`".
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_slugs: Vec<String>,
    #[serde(default)]
    pub user_slugs: Vec<String>,
    /// Per-group allowlist of repository slugs.
    #[serde(default)]
    pub repo_slugs: HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IgnoreSection {
    pub repos: HashMap<String, Vec<String>>,
    pub patterns: HashMap<String, Vec<String>>,
    pub forked_repos_in_user: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MirrorSection {
    pub location: PathBuf,
    pub concurrency: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DestinationSection {
    pub host: String,
    pub api_url: Option<String>,
    pub username: String,
    pub api_key: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub team_prefix: String,
    #[serde(default)]
    pub team_owner: String,
    #[serde(default)]
    pub repo_access: BTreeMap<AccessLevel, String>,
    #[serde(default = "enabled")]
    pub skip_permissions_if_repo_exists: bool,
    #[serde(default = "enabled")]
    pub use_project_prefix: bool,
    #[serde(default)]
    pub project_slug_mappings: HashMap<String, String>,
    #[serde(default)]
    pub repo_name_mapping: HashMap<String, HashMap<String, String>>,
}

fn enabled() -> bool {
    true
}

pub fn read_config(config: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str(config)
}
