use std::ops::{Add, AddAssign};

use crate::model::entity::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Committed from a piece's top-`capacity` candidates.
    Definite,
    /// Committed while scanning a piece's widened window.
    Relaxation,
    /// Committed while resolving a conflict elsewhere.
    Resolution,
}

/// Whose ranking list lost an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Piece,
    Dancer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Committed { dancer: Id, piece: Id, stage: Stage },
    Pruned { side: Side, owner: Id, removed: Id },
    /// A piece filled up and vanished from a dancer's list.
    Purged { piece: Id, dancer: Id },
    Conflict { dancer: Id, piece: Id, alternates: usize },
    RoundFinished { round: usize, alternates: usize, outcome: RoundOutcome },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub commits: usize,
    pub prunes: usize,
    pub purges: usize,
}

impl RoundOutcome {
    /// Nothing changed in the market.
    pub fn is_quiet(&self) -> bool {
        self.commits == 0 && self.prunes == 0 && self.purges == 0
    }
}

impl Add for RoundOutcome {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        RoundOutcome {
            commits: self.commits + rhs.commits,
            prunes: self.prunes + rhs.prunes,
            purges: self.purges + rhs.purges,
        }
    }
}

impl AddAssign for RoundOutcome {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
