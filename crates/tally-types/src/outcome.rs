use serde::{Deserialize, Serialize};

use crate::tally::Tally;
use crate::vote::Direction;

/// What a caller gets back after casting a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub vote_count: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<Direction>,
}

impl VoteOutcome {
    pub fn new(tally: Tally, user_vote: Option<Direction>) -> Self {
        Self {
            vote_count: tally.vote_count(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            user_vote,
        }
    }

    pub fn tally(&self) -> Tally {
        Tally::new(self.upvotes, self.downvotes)
    }
}
