//! The three-way vote state transition.
//!
//! Given the record a user currently holds (if any) and the direction they
//! requested, [`plan`] decides between:
//!
//! | existing           | requested | result                          |
//! |--------------------|-----------|---------------------------------|
//! | none               | d         | insert record, `d` counter +1   |
//! | d                  | d         | delete record, `d` counter -1   |
//! | d                  | !d        | flip record, `d` -1 and `!d` +1 |
//!
//! The record write and counter delta travel together in one
//! [`VoteTransaction`], so a switch is never visible half-applied.

use chrono::{DateTime, Utc};
use tally_store::VoteTransaction;
use tally_types::{Direction, TallyDelta, VoteKey, VoteRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Cast,
    Retract,
    Switch,
}

/// A planned change, ready to commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub txn: VoteTransaction,
    /// The caller's vote after the transition commits.
    pub user_vote: Option<Direction>,
}

pub fn plan(
    existing: Option<&VoteRecord>,
    key: VoteKey,
    requested: Direction,
    now: DateTime<Utc>,
) -> Transition {
    match existing {
        None => Transition {
            kind: TransitionKind::Cast,
            txn: VoteTransaction::insert(
                VoteRecord::new(key, requested, now),
                TallyDelta::cast(requested),
            ),
            user_vote: Some(requested),
        },
        Some(record) if record.direction == requested => Transition {
            kind: TransitionKind::Retract,
            txn: VoteTransaction::delete(key, record.revision, TallyDelta::retract(requested)),
            user_vote: None,
        },
        Some(record) => Transition {
            kind: TransitionKind::Switch,
            txn: VoteTransaction::update(
                record.switched(requested, now),
                record.revision,
                TallyDelta::switch(record.direction, requested),
            ),
            user_vote: Some(requested),
        },
    }
}
