//! Casting engine.
//!
//! Runs in two phases over a [`Market`]:
//!
//! 1. **Definites**: every piece commits the dancers in its top `capacity`
//!    whose own top choices agree.
//! 2. **Relaxation**: repeated rounds scan each open piece's ranking list,
//!    widened by an alternates allowance that grows on the [`Schedule`].
//!    A dancer blocked only because they prefer other pieces triggers
//!    conflict resolution: the pieces they prefer are settled first (filled,
//!    or proven out of reach), walking transitively through the dancers
//!    ranked ahead of them there.
//!
//! Conflict resolution runs on an explicit depth-first work stack. Each
//! `(dancer, other, piece)` task expands at most once per conflict, so
//! cyclic preference structures cannot recurse forever.

use std::collections::HashSet;
use std::mem;

use tracing::{debug, info};

use crate::action::{Event, RoundOutcome, Side, Stage};
use crate::config::Schedule;
use crate::market::Market;
use crate::model::entity::Id;
use crate::observer::{NoopObserver, Observer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub definite: RoundOutcome,
    pub relaxation: RoundOutcome,
    /// Relaxation rounds actually run.
    pub rounds: usize,
    /// Alternates allowance in the last round run.
    pub alternates: usize,
    /// Stopped before the round budget because nothing could change.
    pub stopped_early: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Task {
    /// Settle `other_piece`, which `dancer` prefers over `piece`.
    OtherPiece { dancer: Id, other_piece: Id, piece: Id },
    /// Settle `other_dancer`, ranked ahead of `dancer` by `piece`.
    OtherDancer { dancer: Id, other_dancer: Id, piece: Id },
    /// Try `dancer` at `piece` again with the round's alternates.
    Retry { dancer: Id, piece: Id },
}

pub struct Allocator<O: Observer = NoopObserver> {
    market: Market,
    schedule: Schedule,
    observer: O,
    tally: RoundOutcome,
}

impl Allocator<NoopObserver> {
    pub fn new(market: Market, schedule: Schedule) -> Self {
        Allocator::with_observer(market, schedule, NoopObserver)
    }
}

impl<O: Observer> Allocator<O> {
    pub fn with_observer(market: Market, schedule: Schedule, observer: O) -> Self {
        Allocator {
            market,
            schedule,
            observer,
            tally: RoundOutcome::default(),
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_market(self) -> Market {
        self.market
    }

    /// Runs both phases to completion.
    pub fn run(&mut self) -> RunSummary {
        info!(
            dancers = self.market.dancers().count(),
            pieces = self.market.pieces().count(),
            "starting allocation"
        );

        let definite = self.assign_definites();
        info!(commits = definite.commits, prunes = definite.prunes, "definite assignments done");

        let mut summary = RunSummary { definite, ..RunSummary::default() };
        let mut alternates = 0;
        for round in 0..self.schedule.rounds {
            alternates = self.schedule.next_alternates(round, alternates);
            let outcome = self.assign_rest(alternates);
            self.emit(Event::RoundFinished { round, alternates, outcome });
            summary.relaxation += outcome;
            summary.rounds = round + 1;
            summary.alternates = alternates;

            if outcome.is_quiet() && self.market.windows_saturated(alternates) {
                debug!(round, alternates, "no further assignment possible");
                summary.stopped_early = true;
                break;
            }
        }

        info!(
            rounds = summary.rounds,
            alternates = summary.alternates,
            commits = summary.relaxation.commits,
            unassigned = self.market.unassigned().count(),
            "relaxation done"
        );
        summary
    }

    /// Commits each piece's unambiguous top-`capacity` candidates.
    pub fn assign_definites(&mut self) -> RoundOutcome {
        for piece in self.market.piece_ids() {
            let top = match self.market.piece(piece) {
                Some(p) => p.window(0).to_vec(),
                None => continue,
            };
            for dancer in top {
                if self.market.piece_rules_out(piece, dancer) {
                    self.prune_dancer(piece, dancer);
                    continue;
                }
                self.try_commit(dancer, piece, 0, Stage::Definite);
            }
        }
        mem::take(&mut self.tally)
    }

    /// One relaxation round over every open piece.
    pub fn assign_rest(&mut self, alternates: usize) -> RoundOutcome {
        for piece in self.market.piece_ids() {
            let window = match self.market.piece(piece) {
                Some(p) if !p.full() => p.window(alternates).to_vec(),
                _ => continue,
            };
            for dancer in window {
                let Some(p) = self.market.piece(piece) else {
                    break;
                };
                if !p.ranks(dancer) || p.holds(dancer) {
                    continue;
                }
                if self.market.piece_rules_out(piece, dancer) {
                    self.prune_dancer(piece, dancer);
                    continue;
                }
                if self.try_commit(dancer, piece, alternates, Stage::Relaxation) {
                    continue;
                }
                self.resolve(dancer, piece, alternates);
            }
        }
        mem::take(&mut self.tally)
    }

    /// `dancer` is ranked by `piece` but still holds out for pieces they
    /// prefer; settle those first, retrying `piece` after each.
    fn resolve(&mut self, dancer: Id, piece: Id, alternates: usize) {
        self.emit(Event::Conflict { dancer, piece, alternates });
        let ahead = match self.market.dancer(dancer) {
            Some(d) => match d.rank_of(piece) {
                Some(rank) => d.piece_rankings()[..rank].to_vec(),
                None => return,
            },
            None => return,
        };

        let mut stack = Vec::with_capacity(ahead.len() * 2);
        for other_piece in ahead.into_iter().rev() {
            stack.push(Task::Retry { dancer, piece });
            stack.push(Task::OtherPiece { dancer, other_piece, piece });
        }

        let mut visited = HashSet::new();
        while let Some(task) = stack.pop() {
            match task {
                Task::Retry { dancer, piece } => {
                    self.try_commit(dancer, piece, alternates, Stage::Resolution);
                }
                Task::OtherPiece { dancer, other_piece, piece } => {
                    if visited.insert(task) {
                        self.settle_other_piece(dancer, other_piece, piece, alternates, &mut stack);
                    }
                }
                Task::OtherDancer { dancer, other_dancer, piece } => {
                    if visited.insert(task) {
                        self.settle_other_dancer(dancer, other_dancer, piece, alternates, &mut stack);
                    }
                }
            }
        }
    }

    fn settle_other_piece(
        &mut self,
        dancer: Id,
        other_piece: Id,
        piece: Id,
        alternates: usize,
        stack: &mut Vec<Task>,
    ) {
        self.emit(Event::Conflict { dancer, piece: other_piece, alternates });
        if self.market.dancer_rules_out(dancer, other_piece) {
            self.prune_piece(dancer, other_piece);
            self.try_commit(dancer, piece, alternates, Stage::Resolution);
            return;
        }

        // The dancer is only an alternate there: settle whoever is ahead.
        let ahead = match self.market.piece(other_piece) {
            Some(p) => match p.rank_of(dancer) {
                Some(rank) => p.dancer_rankings()[..rank].to_vec(),
                None => return,
            },
            None => return,
        };
        if self.try_commit(dancer, other_piece, 0, Stage::Resolution) {
            return;
        }
        for other_dancer in ahead.into_iter().rev() {
            stack.push(Task::OtherDancer { dancer, other_dancer, piece: other_piece });
        }
    }

    fn settle_other_dancer(
        &mut self,
        dancer: Id,
        other_dancer: Id,
        piece: Id,
        alternates: usize,
        stack: &mut Vec<Task>,
    ) {
        if !self.market.piece(piece).map_or(false, |p| p.ranks(other_dancer)) {
            return;
        }
        self.emit(Event::Conflict { dancer: other_dancer, piece, alternates });
        if self.market.piece_rules_out(piece, other_dancer) {
            self.prune_dancer(piece, other_dancer);
            self.try_commit(dancer, piece, alternates, Stage::Resolution);
            return;
        }

        // The competitor is holding out for pieces of their own.
        let ahead = match self.market.dancer(other_dancer) {
            Some(d) => match d.rank_of(piece) {
                Some(rank) => d.piece_rankings()[..rank].to_vec(),
                None => return,
            },
            None => return,
        };
        if self.try_commit(other_dancer, piece, 0, Stage::Resolution) {
            return;
        }
        for other_piece in ahead.into_iter().rev() {
            stack.push(Task::OtherPiece { dancer: other_dancer, other_piece, piece });
        }
    }

    fn try_commit(&mut self, dancer: Id, piece: Id, alternates: usize, stage: Stage) -> bool {
        if !self.market.is_eligible(dancer, piece, alternates) {
            return false;
        }
        let purged = self.market.commit(dancer, piece);
        self.tally.commits += 1;
        self.emit(Event::Committed { dancer, piece, stage });
        for other in purged {
            self.tally.purges += 1;
            self.emit(Event::Purged { piece, dancer: other });
        }
        true
    }

    fn prune_dancer(&mut self, piece: Id, dancer: Id) {
        if self.market.drop_dancer(piece, dancer) {
            self.tally.prunes += 1;
            self.emit(Event::Pruned { side: Side::Piece, owner: piece, removed: dancer });
        }
    }

    fn prune_piece(&mut self, dancer: Id, piece: Id) {
        if self.market.drop_piece(dancer, piece) {
            self.tally.prunes += 1;
            self.emit(Event::Pruned { side: Side::Dancer, owner: dancer, removed: piece });
        }
    }

    fn emit(&mut self, event: Event) {
        self.observer.observe(&self.market, &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::condition::Quota;
    use crate::model::entity::Dancer;
    use crate::model::piece::Piece;

    fn allocator(dancers: Vec<Dancer>, pieces: Vec<Piece>) -> Allocator<Vec<Event>> {
        let market = Market::new(dancers, pieces).unwrap();
        Allocator::with_observer(market, Schedule::default(), Vec::new())
    }

    fn assigned(allocator: &Allocator<Vec<Event>>, dancer: Id) -> Vec<Id> {
        allocator.market().dancer(dancer).unwrap().assigned_pieces().to_vec()
    }

    #[test]
    fn definites_fill_top_ranked_seats() {
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "A", "a", "F", 1, vec![10]),
                Dancer::new(2, "B", "b", "F", 1, vec![10]),
                Dancer::new(3, "C", "c", "F", 1, vec![10]),
            ],
            vec![Piece::new(10, "P", 2, vec![1, 2, 3], None)],
        );

        let outcome = allocator.assign_definites();
        assert_eq!(outcome.commits, 2);
        assert_eq!(outcome.purges, 1);

        let piece = allocator.market().piece(10).unwrap();
        assert!(piece.full());
        assert_eq!(piece.assigned_dancers(), &[1, 2]);
        assert!(!allocator.market().dancer(3).unwrap().ranks(10));
        assert!(allocator.observer().contains(&Event::Committed { dancer: 1, piece: 10, stage: Stage::Definite }));

        allocator.run();
        assert!(assigned(&allocator, 3).is_empty());
    }

    #[test]
    fn quota_keeps_out_excluded_category() {
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "X", "x", "M", 1, vec![10]),
                Dancer::new(2, "Y", "y", "F", 1, vec![10]),
            ],
            vec![Piece::new(10, "Q", 1, vec![1, 2], Quota::from_declared(1, [("F", 1), ("M", 0)]))],
        );

        let summary = allocator.run();
        assert!(assigned(&allocator, 1).is_empty());
        assert_eq!(assigned(&allocator, 2), vec![10]);
        // Y only enters the window once alternates reach one.
        assert_eq!(summary.definite.commits, 0);
        assert!(summary.stopped_early);
        assert_eq!(summary.rounds, 37);
    }

    #[test]
    fn relaxation_moves_past_full_first_choice() {
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "E", "e", "F", 1, vec![10]),
                Dancer::new(2, "D", "d", "F", 1, vec![10, 20]),
            ],
            vec![
                Piece::new(10, "P1", 1, vec![1], None),
                Piece::new(20, "P2", 1, vec![2], None),
            ],
        );

        allocator.assign_definites();
        assert!(allocator.market().piece(10).unwrap().full());
        assert!(assigned(&allocator, 2).is_empty());

        let outcome = allocator.assign_rest(0);
        assert_eq!(outcome.commits, 1);
        assert_eq!(assigned(&allocator, 2), vec![20]);
        assert!(allocator.observer().contains(&Event::Pruned { side: Side::Dancer, owner: 2, removed: 10 }));
        assert!(allocator.observer().contains(&Event::Committed { dancer: 2, piece: 20, stage: Stage::Resolution }));
    }

    #[test]
    fn cyclic_preferences_terminate_and_resolve() {
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "D1", "x", "F", 1, vec![10, 20]),
                Dancer::new(2, "D2", "y", "F", 1, vec![20, 10]),
            ],
            vec![
                Piece::new(10, "P1", 1, vec![2, 1], None),
                Piece::new(20, "P2", 1, vec![1, 2], None),
            ],
        );

        assert!(allocator.assign_rest(0).is_quiet());
        allocator.run();
        assert_eq!(assigned(&allocator, 1), vec![10]);
        assert_eq!(assigned(&allocator, 2), vec![20]);
    }

    #[test]
    fn resolution_settles_competitor_first() {
        // W holds out for P1, where Z is ranked ahead but is waiting on a P3
        // that is already full.
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "Z", "z", "F", 1, vec![30, 10]),
                Dancer::new(2, "W", "w", "F", 1, vec![10, 5]),
                Dancer::new(3, "Y", "y", "F", 1, vec![30]),
            ],
            vec![
                Piece::new(5, "P2", 1, vec![2], None),
                Piece::new(10, "P1", 1, vec![1, 2], None),
                Piece::new(30, "P3", 1, vec![3], None),
            ],
        );

        let definite = allocator.assign_definites();
        assert_eq!(definite.commits, 1);
        assert_eq!(assigned(&allocator, 3), vec![30]);

        let outcome = allocator.assign_rest(0);
        assert_eq!(outcome.commits, 2);
        assert_eq!(assigned(&allocator, 1), vec![10]);
        assert_eq!(assigned(&allocator, 2), vec![5]);

        let events = allocator.observer();
        assert!(events.contains(&Event::Pruned { side: Side::Dancer, owner: 1, removed: 30 }));
        assert!(events.contains(&Event::Purged { piece: 10, dancer: 2 }));
        let commits: Vec<&Event> = events
            .iter()
            .filter(|event| matches!(event, Event::Committed { stage: Stage::Resolution, .. }))
            .collect();
        assert_eq!(
            commits,
            vec![
                &Event::Committed { dancer: 1, piece: 10, stage: Stage::Resolution },
                &Event::Committed { dancer: 2, piece: 5, stage: Stage::Resolution },
            ]
        );
    }

    #[test]
    fn competitor_already_cast_is_pruned_before_retry() {
        // Z is ranked ahead of W at P1 but filled her one slot at P3 during
        // the definite phase, so P1 still lists her.
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "Z", "z", "F", 1, vec![30, 10]),
                Dancer::new(2, "W", "w", "F", 1, vec![10, 5]),
            ],
            vec![
                Piece::new(5, "P2", 1, vec![2], None),
                Piece::new(10, "P1", 1, vec![1, 2], None),
                Piece::new(30, "P3", 1, vec![1], None),
            ],
        );

        allocator.assign_definites();
        assert_eq!(assigned(&allocator, 1), vec![30]);
        assert_eq!(allocator.market().piece(10).unwrap().dancer_rankings(), &[1, 2]);

        let outcome = allocator.assign_rest(0);
        assert_eq!(outcome.commits, 1);
        assert_eq!(assigned(&allocator, 2), vec![10]);
        assert!(allocator.market().piece(5).unwrap().assigned_dancers().is_empty());

        let events = allocator.observer();
        let pruned = Event::Pruned { side: Side::Piece, owner: 10, removed: 1 };
        let at = events.iter().position(|event| *event == pruned).unwrap();
        assert_eq!(
            events[at + 1],
            Event::Committed { dancer: 2, piece: 10, stage: Stage::Resolution }
        );
    }

    #[test]
    fn extra_rounds_after_run_change_nothing() {
        let mut allocator = allocator(
            vec![
                Dancer::new(1, "A", "a", "F", 2, vec![10, 20]),
                Dancer::new(2, "B", "b", "M", 1, vec![20, 10]),
                Dancer::new(3, "C", "c", "F", 1, vec![10]),
            ],
            vec![
                Piece::new(10, "P1", 1, vec![3, 1, 2], None),
                Piece::new(20, "P2", 2, vec![2, 1], None),
            ],
        );

        allocator.run();
        for alternates in [0, 5, 200] {
            assert_eq!(allocator.assign_rest(alternates).commits, 0);
        }
    }
}
