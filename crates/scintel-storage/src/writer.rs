use crate::error::Result;
use crate::hash::content_hash;
use crate::store::SnapshotStore;
use scintel_common::types::{PillarResult, PillarStatus, Snapshot, SnapshotStatus};

/// What happened to a run's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The merged snapshot replaced the current one.
    Published { version: u64, status: SnapshotStatus },
    /// Nothing fresh was fetched; the current file was left untouched.
    PreservedPrevious { version: u64 },
    /// Nothing fresh was fetched and there is no current file.
    NothingToPersist,
}

impl WriteOutcome {
    /// A snapshot is on disk after this outcome.
    pub fn has_snapshot(&self) -> bool {
        !matches!(self, WriteOutcome::NothingToPersist)
    }
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOutcome::Published { version, status } => {
                write!(f, "published v{version} ({status})")
            }
            WriteOutcome::PreservedPrevious { version } => write!(f, "preserved v{version}"),
            WriteOutcome::NothingToPersist => write!(f, "nothing to persist"),
        }
    }
}

/// Decides whether a run's snapshot replaces the published one.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    store: SnapshotStore,
}

impl SnapshotWriter {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Persist `new`, back-filling failed pillars from `previous`.
    ///
    /// A snapshot without a single fresh pillar is never written: the
    /// previous file stays byte-identical.
    pub fn write(&self, new: Snapshot, previous: Option<&Snapshot>) -> Result<WriteOutcome> {
        if !new.has_fresh_pillar() {
            return Ok(match previous {
                Some(prev) => {
                    tracing::warn!(
                        version = prev.version,
                        "No pillar produced fresh data, keeping previous snapshot"
                    );
                    WriteOutcome::PreservedPrevious {
                        version: prev.version,
                    }
                }
                None => {
                    tracing::warn!("No pillar produced fresh data and no previous snapshot exists");
                    WriteOutcome::NothingToPersist
                }
            });
        }

        let merged = merge_with_previous(new, previous)?;
        self.store.publish(&merged)?;

        tracing::info!(
            version = merged.version,
            status = %merged.status,
            hash = merged.content_hash.as_deref().unwrap_or("-"),
            path = %self.store.path().display(),
            "Snapshot published"
        );
        Ok(WriteOutcome::Published {
            version: merged.version,
            status: merged.status,
        })
    }
}

/// Carry usable data from `previous` into the failed pillars of `new`,
/// then recompute the rollup status and content hash.
pub fn merge_with_previous(mut new: Snapshot, previous: Option<&Snapshot>) -> Result<Snapshot> {
    if let Some(prev) = previous {
        carry_pillar(&mut new.macro_pillar, &prev.macro_pillar, prev.version);
        if carry_pillar(&mut new.peers, &prev.peers, prev.version) {
            new.peer_group = prev.peer_group.clone();
        }
        if carry_pillar(&mut new.suppliers, &prev.suppliers, prev.version) {
            new.supplier_watchlist = prev.supplier_watchlist.clone();
        }
    }

    new.status = new.rollup_status();
    let statuses = new.pillar_statuses();
    if let Some(health) = new.health.as_mut() {
        health.pillars = statuses.into_iter().collect();
    }
    new.content_hash = Some(content_hash(&new)?);
    Ok(new)
}

/// Previous pillar data is worth carrying when it exists and did not come
/// from a failed fetch.
fn is_carryable<P>(pillar: &PillarResult<P>) -> bool {
    pillar.data.is_some() && pillar.status != PillarStatus::Error
}

/// Returns true when data was carried into `pillar`.
fn carry_pillar<P: Clone>(
    pillar: &mut PillarResult<P>,
    prev: &PillarResult<P>,
    prev_version: u64,
) -> bool {
    let rewrite_status = match pillar.status {
        PillarStatus::Error => true,
        PillarStatus::Skipped => false,
        _ => return false,
    };
    if !is_carryable(prev) {
        return false;
    }

    if rewrite_status {
        pillar.status = PillarStatus::Fallback;
    }
    pillar.rag_score = prev.rag_score;
    pillar.data = prev.data.clone();
    pillar.last_fetched = prev.last_fetched;
    pillar.carried_from_version = prev.carried_from_version.or(Some(prev_version));
    true
}
