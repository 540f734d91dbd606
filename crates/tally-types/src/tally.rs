use serde::{Deserialize, Serialize};

use crate::vote::Direction;

/// Denormalized vote counters stored on a target.
///
/// Counters are signed so that drift from a broken writer is representable
/// and can be detected and repaired instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl Tally {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    /// Net score: `upvotes - downvotes`.
    pub fn vote_count(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    /// `false` when either counter went negative.
    pub fn is_consistent(&self) -> bool {
        self.upvotes >= 0 && self.downvotes >= 0
    }

    pub fn apply(self, delta: TallyDelta) -> Self {
        Self {
            upvotes: self.upvotes + delta.up,
            downvotes: self.downvotes + delta.down,
        }
    }

    /// Count one active vote in `direction`.
    pub fn record(&mut self, direction: Direction) {
        *self = self.apply(TallyDelta::cast(direction));
    }
}

/// A signed adjustment applied to a [`Tally`] in a single atomic step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TallyDelta {
    pub up: i64,
    pub down: i64,
}

impl TallyDelta {
    pub fn new(up: i64, down: i64) -> Self {
        Self { up, down }
    }

    pub fn cast(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(1, 0),
            Direction::Down => Self::new(0, 1),
        }
    }

    pub fn retract(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(-1, 0),
            Direction::Down => Self::new(0, -1),
        }
    }

    pub fn switch(from: Direction, to: Direction) -> Self {
        let r = Self::retract(from);
        let c = Self::cast(to);
        Self::new(r.up + c.up, r.down + c.down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn vote_count_is_net() {
        assert_eq!(Tally::new(10, 2).vote_count(), 8);
    }

    #[test]
    fn switch_moves_one_vote() {
        let t = Tally::new(11, 2).apply(TallyDelta::switch(Direction::Up, Direction::Down));
        assert_eq!(t, Tally::new(10, 3));
    }

    #[test]
    fn negative_counters_are_inconsistent() {
        let t = Tally::default().apply(TallyDelta::retract(Direction::Down));
        assert_eq!(t.downvotes, -1);
        assert!(!t.is_consistent());
    }

    fn direction() -> impl Strategy<Value = Direction> {
        prop_oneof![Just(Direction::Up), Just(Direction::Down)]
    }

    proptest! {
        #[test]
        fn cast_then_retract_is_identity(up in 0i64..1000, down in 0i64..1000, d in direction()) {
            let start = Tally::new(up, down);
            let end = start.apply(TallyDelta::cast(d)).apply(TallyDelta::retract(d));
            prop_assert_eq!(start, end);
        }

        #[test]
        fn switch_preserves_total(up in 0i64..1000, down in 0i64..1000, d in direction()) {
            let start = Tally::new(up + 1, down + 1);
            let end = start.apply(TallyDelta::switch(d, d.opposite()));
            prop_assert_eq!(start.upvotes + start.downvotes, end.upvotes + end.downvotes);
        }
    }
}
