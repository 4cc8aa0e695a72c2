use std::path::Path;

use crate::cli::parser::parse_config;
use crate::cli::reader::read_config;
use crate::cli::ParsedConfig;

/// One project (`ACME`) and one personal namespace (`~jdoe`) migrated into
/// the `SED` organisation, mirrored under `root`.
pub fn parsed_config(root: &Path) -> ParsedConfig {
    let yaml = format!(
        r#"
source:
  host: bitbucket.example.com
  username: jdoe
  api_key: token
  project_slugs:
    - ACME
  user_slugs:
    - "~jdoe"

ignore:
  repos:
    ACME:
      - legacy
  patterns:
    ACME:
      - "^tmp-"
  forked_repos_in_user: true

mirror:
  location: "{root}"

destination:
  host: github.example.com
  username: migrator
  api_key: ghp_token
  org_name: SED
  team_prefix: TEAM
  team_owner: TEAM_Owners
  repo_access:
    admin: TEAM_Owners
    push: TEAM_Integrators
    pull: TEAM_Developers
  skip_permissions_if_repo_exists: true
  use_project_prefix: true
"#,
        root = root.display()
    );

    let raw = read_config(&yaml).unwrap();
    parse_config(raw, None).unwrap()
}

/// [`parsed_config`] with both platforms pointed at a mock server.
pub fn parsed_config_with_api(root: &Path, source_api: &str, destination_api: &str) -> ParsedConfig {
    let mut config = parsed_config(root);
    config.source.base_url = reqwest::Url::parse(&format!("{}/", source_api.trim_end_matches('/'))).unwrap();
    config.destination.base_url =
        reqwest::Url::parse(&format!("{}/", destination_api.trim_end_matches('/'))).unwrap();
    config
}
