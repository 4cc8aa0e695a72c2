use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;

/// The three data-transfer operations that go through the retry executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOp {
    Clone,
    Fetch,
    Push,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferOp::Clone => "clone",
            TransferOp::Fetch => "fetch",
            TransferOp::Push => "push",
        };
        f.write_str(label)
    }
}

/// Every fatal condition of a migration run.
///
/// Nothing here is recovered from: the pipeline stops at the first error and
/// the operator re-runs once the cause is fixed.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{operation} of {repository} failed after {attempts} attempt(s)")]
    TransferFailed {
        operation: TransferOp,
        repository: String,
        attempts: usize,
        #[source]
        source: GitError,
    },

    #[error("git {operation} failed for {repository}")]
    Git {
        operation: &'static str,
        repository: String,
        #[source]
        source: GitError,
    },

    #[error("Organisation {0} not found")]
    MissingOrganization(String),

    #[error("Team owner {team} is not part of the {org} organisation")]
    MissingOwnerTeam { team: String, org: String },

    #[error("Team {0} not found")]
    UnknownTeam(String),

    #[error("Repository {second} wants to be named {name} but {first} maps to this name already")]
    NamingCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Repository {0} has no destination name assigned")]
    Unnamed(String),

    #[error("Repository {0} has no destination repository bound")]
    Unbound(String),

    #[error("Repository {0} has no local mirror")]
    NotMirrored(String),

    #[error("Cannot find clone URL for {0}")]
    MissingCloneUrl(String),

    #[error("Cannot embed credentials into URL {0}")]
    InvalidUrl(String),

    #[error("Repo directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("At least one project slug or user slug must be provided")]
    NoMigrationScope,

    #[error("Failed to connect to host {host}")]
    Unreachable {
        host: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid ignore pattern `{pattern}` for {group}")]
    InvalidPattern {
        group: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("source platform request failed")]
    Source(#[source] anyhow::Error),

    #[error("destination platform request failed")]
    Destination(#[source] anyhow::Error),

    #[error("filesystem error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a source platform failure, see [`MigrateError::destination`].
    pub(crate) fn source(host: &str, source: anyhow::Error) -> Self {
        Self::platform(host, source, MigrateError::Source)
    }

    /// Wraps a destination failure, promoting transport-level failures to
    /// [`MigrateError::Unreachable`] so the message names the host.
    pub(crate) fn destination(host: &str, source: anyhow::Error) -> Self {
        Self::platform(host, source, MigrateError::Destination)
    }

    fn platform(host: &str, source: anyhow::Error, other: fn(anyhow::Error) -> Self) -> Self {
        let unreachable = source.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .map_or(false, |e| e.is_connect() || e.is_timeout())
        });

        if unreachable {
            MigrateError::Unreachable {
                host: host.to_string(),
                source,
            }
        } else {
            other(source)
        }
    }
}
