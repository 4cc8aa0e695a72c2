use serde::{Deserialize, Serialize};

/// Repository access a team can hold on the destination, weakest first.
///
/// Configuration accepts both the generic names and GitHub's
/// `pull` / `push` / `admin` vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[serde(alias = "pull")]
    Read,
    #[serde(alias = "push")]
    Write,
    Admin,
}

impl AccessLevel {
    pub fn as_github(&self) -> &'static str {
        match self {
            AccessLevel::Read => "pull",
            AccessLevel::Write => "push",
            AccessLevel::Admin => "admin",
        }
    }

    /// Maps a GitHub permission string onto the three managed levels.
    /// `triage` and `maintain` are rounded down.
    pub fn from_github(permission: &str) -> Option<Self> {
        match permission {
            "pull" | "read" | "triage" => Some(AccessLevel::Read),
            "push" | "write" | "maintain" => Some(AccessLevel::Write),
            "admin" => Some(AccessLevel::Admin),
            _ => None,
        }
    }
}

/// A team and the access it must have on every migrated repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionGrant {
    pub level: AccessLevel,
    pub team: String,
}
