//! Mode dispatch.
//!
//! `clone` and `clone_update` only talk to the source platform and the mirror
//! root; `push` only talks to the mirror root and the destination platform.
//! The two directions share nothing but the directory tree.

use std::sync::Arc;

use futures::stream::{self, TryStreamExt};
use tracing::{debug, info};

use crate::bitbucket_provider::BitbucketProvider;
use crate::cli::{Mode, ParsedConfig};
use crate::destination::DestinationReconciler;
use crate::error::MigrateError;
use crate::event::Event;
use crate::git::{GitCli, Vcs};
use crate::github_provider::GithubProvider;
use crate::mirror::{Materialized, MirrorStore};
use crate::provider::{DestinationProvider, SourceProvider};
use crate::repository::MirrorRecord;
use crate::source::SourceEnumerator;

/// Result of a push run: the final records and what was done (or would have
/// been done, when dry) to get there.
#[derive(Debug)]
pub struct SyncUpOutcome {
    pub records: Vec<MirrorRecord>,
    pub events: Vec<Event>,
}

/// Enumerates the source platform and brings every surviving repository's
/// mirror up to date.
pub async fn sync_down<P, V>(
    config: Arc<ParsedConfig>,
    source: P,
    vcs: V,
    refresh: bool,
) -> Result<Vec<MirrorRecord>, MigrateError>
where
    P: SourceProvider,
    V: Vcs,
{
    let mut enumerator = SourceEnumerator::new(source, config.clone());
    let mut records = enumerator.enumerate_records().await?;
    info!("Found {} repositories to mirror", records.len());

    let store = MirrorStore::new(vcs, config.clone());
    let store = &store;

    stream::iter(records.iter_mut().map(Ok))
        .try_for_each_concurrent(config.mirror.concurrency, move |record| async move {
            let outcome = store.materialize(record, refresh).await?;
            if outcome != Materialized::Untouched {
                debug!("{} {:?}", record, outcome);
            }
            Ok::<_, MigrateError>(())
        })
        .await?;

    Ok(records)
}

/// Rebuilds records from the mirror root and makes the destination match.
pub async fn sync_up<D, V>(
    config: Arc<ParsedConfig>,
    destination: D,
    vcs: V,
    dry_run: bool,
) -> Result<SyncUpOutcome, MigrateError>
where
    D: DestinationProvider,
    V: Vcs + Clone,
{
    let store = MirrorStore::new(vcs.clone(), config.clone());
    let mut records = store.scan().await?;

    let mut reconciler = DestinationReconciler::new(destination, vcs, config.clone(), dry_run);
    reconciler.sign_in().await?;
    reconciler.assign_names(&mut records)?;

    for record in records.iter_mut() {
        reconciler.reconcile(record).await?;
        reconciler.apply_permissions(record).await?;
    }

    for record in &records {
        reconciler.bind_remote(record).await?;
    }

    let reconciler = &reconciler;
    stream::iter(records.iter().map(Ok))
        .try_for_each_concurrent(config.mirror.concurrency, move |record| reconciler.push(record))
        .await?;

    let events = reconciler.events();
    Ok(SyncUpOutcome { records, events })
}

pub async fn run(mode: Mode, config: Arc<ParsedConfig>, dry_run: bool) -> anyhow::Result<()> {
    let vcs = GitCli::default();

    match mode {
        Mode::Clone | Mode::CloneUpdate => {
            let source = BitbucketProvider::from_settings(&config.source)?;
            let records = sync_down(config, source, vcs, mode == Mode::CloneUpdate).await?;
            info!("Mirrored {} repositories", records.len());
        }
        Mode::Push => {
            let destination = GithubProvider::from_settings(&config.destination)?;
            let outcome = sync_up(config, destination, vcs, dry_run).await?;

            let verb = if dry_run { "Planned" } else { "Applied" };
            for event in &outcome.events {
                debug!("{} {:?}", verb, event);
            }
            info!(
                "{} {} changes for {} repositories",
                verb,
                outcome.events.len(),
                outcome.records.len()
            );
        }
    }

    Ok(())
}
