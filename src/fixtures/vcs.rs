use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::git::{GitError, LocalMirror, Vcs};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, path: PathBuf },
    Open { path: PathBuf },
    Remotes { path: PathBuf },
    CreateRemote { path: PathBuf, name: String, url: String },
    SetRemoteUrl { path: PathBuf, name: String, url: String },
    Fetch { path: PathBuf, remote: String },
    Push { path: PathBuf, remote: String },
}

#[derive(Debug, Default)]
struct VcsState {
    calls: Vec<VcsCall>,
    remotes: HashMap<PathBuf, Vec<String>>,
    failing_clones: usize,
    failing_fetches: usize,
    failing_pushes: usize,
}

/// Records git operations instead of running them. A successful clone
/// creates the target directory so later scans find it. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct FakeVcs {
    state: Arc<Mutex<VcsState>>,
}

fn transfer_failure(command: &str) -> GitError {
    GitError::Failed {
        command: command.to_string(),
        status: "exit status: 128".to_string(),
        stderr: "fatal: the remote end hung up unexpectedly".to_string(),
    }
}

impl FakeVcs {
    /// The next `n` clones fail.
    pub fn failing_clones(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_clones = n;
        self
    }

    pub fn failing_fetches(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_fetches = n;
        self
    }

    pub fn failing_pushes(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_pushes = n;
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&VcsCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    pub fn pushed(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                VcsCall::Push { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: VcsCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

/// Decrements `budget` and reports whether this attempt should fail.
fn consume(budget: &mut usize) -> bool {
    if *budget > 0 {
        *budget -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn mirror_clone(&self, url: &str, path: &Path) -> Result<(), GitError> {
        self.record(VcsCall::Clone {
            url: url.to_string(),
            path: path.to_path_buf(),
        });

        if consume(&mut self.state.lock().unwrap().failing_clones) {
            return Err(transfer_failure("clone --mirror"));
        }

        std::fs::create_dir_all(path).map_err(|source| GitError::Spawn {
            command: "clone --mirror".to_string(),
            source,
        })?;
        self.state
            .lock()
            .unwrap()
            .remotes
            .insert(path.to_path_buf(), vec!["origin".to_string()]);
        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<LocalMirror, GitError> {
        self.record(VcsCall::Open {
            path: path.to_path_buf(),
        });

        if path.is_dir() {
            Ok(LocalMirror::new(path))
        } else {
            Err(GitError::Failed {
                command: "rev-parse --git-dir".to_string(),
                status: "exit status: 128".to_string(),
                stderr: "fatal: not a git repository".to_string(),
            })
        }
    }

    async fn remotes(&self, repo: &LocalMirror) -> Result<Vec<String>, GitError> {
        self.record(VcsCall::Remotes {
            path: repo.path.clone(),
        });

        Ok(self
            .state
            .lock()
            .unwrap()
            .remotes
            .get(&repo.path)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_remote(&self, repo: &LocalMirror, name: &str, url: &str) -> Result<(), GitError> {
        self.record(VcsCall::CreateRemote {
            path: repo.path.clone(),
            name: name.to_string(),
            url: url.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        let remotes = state.remotes.entry(repo.path.clone()).or_default();
        if remotes.iter().any(|remote| remote == name) {
            return Err(GitError::Failed {
                command: format!("remote add {}", name),
                status: "exit status: 3".to_string(),
                stderr: format!("error: remote {} already exists.", name),
            });
        }
        remotes.push(name.to_string());
        Ok(())
    }

    async fn set_remote_url(&self, repo: &LocalMirror, name: &str, url: &str) -> Result<(), GitError> {
        self.record(VcsCall::SetRemoteUrl {
            path: repo.path.clone(),
            name: name.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    async fn fetch_prune(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError> {
        self.record(VcsCall::Fetch {
            path: repo.path.clone(),
            remote: remote.to_string(),
        });

        if consume(&mut self.state.lock().unwrap().failing_fetches) {
            return Err(transfer_failure("fetch --prune"));
        }
        Ok(())
    }

    async fn push_mirror(&self, repo: &LocalMirror, remote: &str) -> Result<(), GitError> {
        self.record(VcsCall::Push {
            path: repo.path.clone(),
            remote: remote.to_string(),
        });

        if consume(&mut self.state.lock().unwrap().failing_pushes) {
            return Err(transfer_failure("push --mirror"));
        }
        Ok(())
    }
}
