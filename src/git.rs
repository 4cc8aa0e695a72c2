//! Local git primitives.
//!
//! The pipeline only ever needs a handful of operations on a bare mirror, so
//! they are collected behind the [`Vcs`] trait. [`GitCli`] implements it by
//! shelling out to the system `git` binary through [`tokio::process`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::MigrateError;

/// Remote the mirror clone was taken from.
pub const ORIGIN_REMOTE: &str = "origin";

/// Remote pointing at the destination repository.
pub const TARGET_REMOTE: &str = "target";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn `git {command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl GitError {
    /// Whether retrying the same command could succeed.
    ///
    /// A command that ran and failed may have hit a network hiccup; a command
    /// that could not be spawned at all will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitError::Failed { .. })
    }
}

/// Handle to a bare mirror on local disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalMirror {
    pub path: PathBuf,
}

impl LocalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalMirror { path: path.into() }
    }
}

#[async_trait]
pub trait Vcs: Send + Sync {
    /// `git clone --mirror` without persisting credentials in a helper.
    async fn mirror_clone(&self, url: &str, path: &Path) -> Result<(), GitError>;

    /// Open an existing repository, failing if `path` is not one.
    async fn open(&self, path: &Path) -> Result<LocalMirror, GitError>;

    async fn remotes(&self, repo: &LocalMirror) -> Result<Vec<String>, GitError>;

    async fn create_remote(&self, repo: &LocalMirror, name: &str, url: &str)
        -> Result<(), GitError>;

    async fn set_remote_url(
        &self,
        repo: &LocalMirror,
        name: &str,
        url: &str,
    ) -> Result<(), GitError>;

    async fn fetch_prune(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError>;

    /// Push every ref, including deletions.
    async fn push_mirror(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError>;
}

#[derive(Clone, Debug)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        GitCli {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        GitCli {
            program: program.into(),
        }
    }

    fn command(&self, repo: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(path) = repo {
            cmd.arg("-C").arg(path);
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    /// Runs the command and returns its stdout. `label` is what shows up in
    /// errors and logs, so it must never contain a URL.
    async fn run(mut cmd: Command, label: &str) -> Result<String, GitError> {
        debug!(command = label, "spawning git");

        let output = cmd.output().await.map_err(|source| GitError::Spawn {
            command: label.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Failed {
                command: label.to_string(),
                status: output.status.to_string(),
                stderr: redact(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Vcs for GitCli {
    #[instrument(skip(self, url), fields(dest = %path.display()))]
    async fn mirror_clone(&self, url: &str, path: &Path) -> Result<(), GitError> {
        let mut cmd = self.command(None);
        cmd.arg("clone")
            .arg("--mirror")
            .arg("--config")
            .arg("credential.helper=")
            .arg(url)
            .arg(path);

        Self::run(cmd, "clone --mirror").await.map(|_| ())
    }

    async fn open(&self, path: &Path) -> Result<LocalMirror, GitError> {
        let mut cmd = self.command(Some(path));
        cmd.arg("rev-parse").arg("--git-dir");

        Self::run(cmd, "rev-parse --git-dir").await?;
        Ok(LocalMirror::new(path))
    }

    async fn remotes(&self, repo: &LocalMirror) -> Result<Vec<String>, GitError> {
        let mut cmd = self.command(Some(&repo.path));
        cmd.arg("remote");

        let stdout = Self::run(cmd, "remote").await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn create_remote(
        &self,
        repo: &LocalMirror,
        name: &str,
        url: &str,
    ) -> Result<(), GitError> {
        let mut cmd = self.command(Some(&repo.path));
        cmd.arg("remote").arg("add").arg(name).arg(url);

        Self::run(cmd, &format!("remote add {}", name))
            .await
            .map(|_| ())
    }

    async fn set_remote_url(
        &self,
        repo: &LocalMirror,
        name: &str,
        url: &str,
    ) -> Result<(), GitError> {
        let mut cmd = self.command(Some(&repo.path));
        cmd.arg("remote").arg("set-url").arg(name).arg(url);

        Self::run(cmd, &format!("remote set-url {}", name))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(repo = %repo.path.display()))]
    async fn fetch_prune(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError> {
        let mut cmd = self.command(Some(&repo.path));
        cmd.arg("fetch").arg("--prune").arg(remote);

        Self::run(cmd, &format!("fetch --prune {}", remote))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(repo = %repo.path.display()))]
    async fn push_mirror(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError> {
        let mut cmd = self.command(Some(&repo.path));
        cmd.arg("push").arg("--mirror").arg(remote);

        Self::run(cmd, &format!("push --mirror {}", remote))
            .await
            .map(|_| ())
    }
}

/// Rewrites an advertised HTTP(S) URL so that it carries `username` and
/// `secret` as userinfo.
pub fn embed_credentials(url: &str, username: &str, secret: &str) -> Result<String, MigrateError> {
    let invalid = || MigrateError::InvalidUrl(redact(url));

    let mut parsed = Url::parse(url).map_err(|_| invalid())?;
    parsed.set_username(username).map_err(|_| invalid())?;
    parsed.set_password(Some(secret)).map_err(|_| invalid())?;

    Ok(parsed.to_string())
}

/// Matches `scheme://user[:password]@`.
static USERINFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*://)[^/@\s]+@").expect("static regex is valid")
});

/// Masks the userinfo part of every URL in `text`.
pub fn redact(text: &str) -> String {
    USERINFO.replace_all(text, "${scheme}***@").into_owned()
}
