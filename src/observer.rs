//! Hooks into the allocator's decision points.

use tracing::debug;

use crate::action::Event;
use crate::market::Market;

pub trait Observer {
    fn observe(&mut self, _market: &Market, _event: &Event) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Records every event in order.
impl Observer for Vec<Event> {
    fn observe(&mut self, _market: &Market, event: &Event) {
        self.push(event.clone());
    }
}

/// Emits every decision as a debug-level `tracing` event, with names
/// resolved from the market.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&mut self, market: &Market, event: &Event) {
        let dancer_name = |id| market.dancer(id).map(|d| d.full_name()).unwrap_or_default();
        let piece_name = |id| market.piece(id).map(|p| p.name.clone()).unwrap_or_default();
        match event {
            Event::Committed { dancer, piece, stage } => debug!(
                dancer = %dancer_name(*dancer),
                piece = %piece_name(*piece),
                ?stage,
                "assigned dancer"
            ),
            Event::Pruned { side, owner, removed } => debug!(
                ?side,
                owner = *owner,
                removed = *removed,
                "pruned ranking"
            ),
            Event::Purged { piece, dancer } => debug!(
                piece = %piece_name(*piece),
                dancer = %dancer_name(*dancer),
                "piece is full, removing it from dancer's list"
            ),
            Event::Conflict { dancer, piece, alternates } => debug!(
                dancer = %dancer_name(*dancer),
                piece = %piece_name(*piece),
                alternates = *alternates,
                "resolving conflict"
            ),
            Event::RoundFinished { round, alternates, outcome } => debug!(
                round = *round,
                alternates = *alternates,
                commits = outcome.commits,
                prunes = outcome.prunes,
                purges = outcome.purges,
                "round finished"
            ),
        }
    }
}
