use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::info;

use crate::error::MigrateError;
use crate::repository::GroupSlug;

/// Repositories left out of a migration.
///
/// The same rule set is consulted when listing the source platform and when
/// scanning the mirror root, keyed by group slug and repository slug, so both
/// phases agree on what is excluded.
#[derive(Clone, Debug, Default)]
pub struct IgnoreRuleSet {
    names: HashMap<String, HashSet<String>>,
    patterns: HashMap<String, Vec<Regex>>,
    forked_repos_in_user: bool,
}

impl IgnoreRuleSet {
    pub fn new(
        names: &HashMap<String, Vec<String>>,
        patterns: &HashMap<String, Vec<String>>,
        forked_repos_in_user: bool,
    ) -> Result<Self, MigrateError> {
        let names = names
            .iter()
            .map(|(group, repos)| (group.clone(), repos.iter().cloned().collect()))
            .collect();

        let mut compiled = HashMap::new();
        for (group, sources) in patterns {
            let regexes = sources
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| MigrateError::InvalidPattern {
                        group: group.clone(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            compiled.insert(group.clone(), regexes);
        }

        Ok(IgnoreRuleSet {
            names,
            patterns: compiled,
            forked_repos_in_user,
        })
    }

    /// Name and pattern rules only. The mirror scan has nothing else to go on.
    pub fn is_ignored(&self, group: &GroupSlug, repo_slug: &str) -> bool {
        self.matches_rules(group, repo_slug, false)
    }

    /// Full decision for a repository listed by the source platform.
    pub fn is_ignored_source(&self, group: &GroupSlug, repo_slug: &str, is_fork: bool) -> bool {
        self.matches_rules(group, repo_slug, is_fork)
    }

    fn matches_rules(&self, group: &GroupSlug, repo_slug: &str, is_fork: bool) -> bool {
        let by_name = self
            .names
            .get(group.as_str())
            .map_or(false, |repos| repos.contains(repo_slug));

        let by_pattern = || {
            self.patterns
                .get(group.as_str())
                .map_or(false, |regexes| regexes.iter().any(|re| re.is_match(repo_slug)))
        };

        let by_fork = self.forked_repos_in_user && group.is_personal() && is_fork;

        let ignored = by_name || by_fork || by_pattern();
        if ignored {
            info!("Ignored repo {}/{}", group, repo_slug);
        }
        ignored
    }
}
