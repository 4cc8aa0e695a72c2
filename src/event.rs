use crate::cli::AccessLevel;

/// A mutation of destination or local remote state, recorded whether it was
/// applied or only planned by a dry run.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum Event {
    CreateRepository {
        name: String,
        personal: bool,
    },
    GrantPermission {
        repository: String,
        team: String,
        level: AccessLevel,
    },
    BindRemote {
        repository: String,
        remote: String,
    },
    Push {
        repository: String,
    },
}
