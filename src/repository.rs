use std::fmt;
use std::path::{Path, PathBuf};

use crate::git::LocalMirror;
use crate::provider::DestinationRepo;

/// Leading character of a personal-namespace slug on the source platform.
pub const PERSONAL_MARKER: char = '~';

/// Directory suffix of every bare mirror under the mirror root.
pub const MIRROR_SUFFIX: &str = ".git";

/// Owning group of a source repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupSlug {
    Project(String),
    Personal(String),
}

impl GroupSlug {
    pub fn parse(slug: &str) -> Self {
        if slug.starts_with(PERSONAL_MARKER) {
            GroupSlug::Personal(slug.to_string())
        } else {
            GroupSlug::Project(slug.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupSlug::Project(slug) | GroupSlug::Personal(slug) => slug,
        }
    }

    pub fn is_personal(&self) -> bool {
        matches!(self, GroupSlug::Personal(_))
    }
}

impl fmt::Display for GroupSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryDescriptor {
    pub group: GroupSlug,
    pub repo_slug: String,
    pub display_name: String,
}

impl RepositoryDescriptor {
    pub fn new(group: GroupSlug, repo_slug: impl Into<String>) -> Self {
        let repo_slug = repo_slug.into();
        RepositoryDescriptor {
            display_name: repo_slug.clone(),
            group,
            repo_slug,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.repo_slug)
    }
}

/// `<root>/<group>/<repo>.git`
pub fn mirror_location(root: &Path, group: &GroupSlug, repo_slug: &str) -> PathBuf {
    root.join(group.as_str())
        .join(format!("{}{}", repo_slug, MIRROR_SUFFIX))
}

/// Progress of one repository through a run. Rebuilt from scratch on every
/// invocation; nothing here is persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MigrationState {
    pub local: Option<LocalMirror>,
    pub destination_name: Option<String>,
    pub destination: Option<DestinationRepo>,
    pub set_permissions: bool,
}

/// One local bare mirror and the repository it stands for.
///
/// `location`, `descriptor` and `source_clone_url` identify the mirror and are
/// never changed after construction; `state` tracks the current run.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorRecord {
    pub location: PathBuf,
    pub descriptor: RepositoryDescriptor,
    /// `None` when the record was rebuilt from disk.
    pub source_clone_url: Option<String>,
    pub state: MigrationState,
}

impl MirrorRecord {
    pub fn from_source(root: &Path, descriptor: RepositoryDescriptor, clone_url: String) -> Self {
        MirrorRecord {
            location: mirror_location(root, &descriptor.group, &descriptor.repo_slug),
            descriptor,
            source_clone_url: Some(clone_url),
            state: MigrationState::default(),
        }
    }

    pub fn from_disk(location: PathBuf, descriptor: RepositoryDescriptor, local: LocalMirror) -> Self {
        MirrorRecord {
            location,
            descriptor,
            source_clone_url: None,
            state: MigrationState {
                local: Some(local),
                ..MigrationState::default()
            },
        }
    }
}

impl fmt::Display for MirrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.descriptor.fmt(f)
    }
}
