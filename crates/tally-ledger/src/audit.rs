//! Recount and repair of target counters.
//!
//! The counters on a target are derived data: they must equal the number of
//! active up and down records. [`TallyAuditor`] recomputes them from the
//! records, reports any drift, and can write the recount back.

use serde::Serialize;
use tally_store::{TargetCensus, TargetStore, VoteStore};
use tally_types::{Tally, TargetRef, TargetType};

use crate::error::{LedgerError, LedgerResult};

/// Result of auditing one target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub target: TargetRef,
    /// Counters as stored on the target when the audit ran.
    pub stored: Tally,
    /// Counters recomputed from active vote records.
    pub recounted: Tally,
    pub active_votes: usize,
    pub discrepancies: Vec<Discrepancy>,
    /// `true` if the stored counters were overwritten with the recount.
    pub repaired: bool,
}

impl AuditReport {
    /// Returns `true` if the stored counters matched the records.
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// A specific mismatch found during an audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub stored: i64,
    pub expected: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    UpvoteDrift,
    DownvoteDrift,
    NegativeCounter,
}

/// Counter auditor.
pub struct TallyAuditor;

impl TallyAuditor {
    /// Recount one target from a single consistent read of its counters
    /// and records.
    pub fn audit<S>(store: &S, target: &TargetRef) -> LedgerResult<AuditReport>
    where
        S: VoteStore + TargetStore + ?Sized,
    {
        Self::census(store, target).map(|(report, _)| report)
    }

    /// Recount one target and overwrite its counters if they drifted.
    ///
    /// The write is a compare-and-set on the version the recount was taken
    /// at. Any commit after the recount, even one that nets to zero, makes
    /// the write fail and the recount run again.
    pub fn repair<S>(store: &S, target: &TargetRef, max_attempts: u32) -> LedgerResult<AuditReport>
    where
        S: VoteStore + TargetStore + ?Sized,
    {
        for _ in 0..max_attempts.max(1) {
            let (mut report, version) = Self::census(store, target)?;
            if report.is_consistent() {
                return Ok(report);
            }
            if store.compare_and_set_tally(target, version, report.recounted)? {
                tracing::info!(
                    target_ref = %target,
                    stored_up = report.stored.upvotes,
                    stored_down = report.stored.downvotes,
                    upvotes = report.recounted.upvotes,
                    downvotes = report.recounted.downvotes,
                    "repaired vote counters"
                );
                report.repaired = true;
                return Ok(report);
            }
            tracing::debug!(target_ref = %target, "counters moved during repair, retrying");
        }
        Err(LedgerError::Unavailable(format!(
            "could not repair counters on {target}"
        )))
    }

    /// Audit every target of a type, optionally repairing drift.
    pub fn audit_all<S>(
        store: &S,
        target_type: TargetType,
        repair: bool,
        max_attempts: u32,
    ) -> LedgerResult<Vec<AuditReport>>
    where
        S: VoteStore + TargetStore + ?Sized,
    {
        store
            .targets(target_type)?
            .iter()
            .map(|target| {
                if repair {
                    Self::repair(store, target, max_attempts)
                } else {
                    Self::audit(store, target)
                }
            })
            .collect()
    }

    fn census<S>(store: &S, target: &TargetRef) -> LedgerResult<(AuditReport, u64)>
    where
        S: VoteStore + TargetStore + ?Sized,
    {
        let TargetCensus {
            tally,
            version,
            votes,
        } = store
            .census(target)?
            .ok_or_else(|| LedgerError::NotFound(target.clone()))?;

        let mut recounted = Tally::default();
        for record in &votes {
            recounted.record(record.direction);
        }
        let report = AuditReport {
            target: target.clone(),
            stored: tally,
            recounted,
            active_votes: votes.len(),
            discrepancies: compare(tally, recounted),
            repaired: false,
        };
        Ok((report, version))
    }
}

fn compare(stored: Tally, recounted: Tally) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    if stored.upvotes != recounted.upvotes {
        out.push(Discrepancy {
            kind: DiscrepancyKind::UpvoteDrift,
            stored: stored.upvotes,
            expected: recounted.upvotes,
        });
    }
    if stored.downvotes != recounted.downvotes {
        out.push(Discrepancy {
            kind: DiscrepancyKind::DownvoteDrift,
            stored: stored.downvotes,
            expected: recounted.downvotes,
        });
    }
    if !stored.is_consistent() {
        let worst = stored.upvotes.min(stored.downvotes);
        out.push(Discrepancy {
            kind: DiscrepancyKind::NegativeCounter,
            stored: worst,
            expected: 0,
        });
    }
    out
}
