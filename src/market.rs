//! The dancer and piece maps plus the primitive predicates and mutations the
//! allocator is built from.
//!
//! Ranking lists and assignment sets are only ever changed through the
//! crate-private operations here, so every mutation is funnelled through the
//! allocator that owns the market.

use std::collections::BTreeMap;

use itertools::Itertools;
use thiserror::Error;

use crate::model::entity::{Dancer, Id};
use crate::model::piece::Piece;
use crate::tally::CategoryCounter;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketError {
    #[error("dancer {0} appears more than once")]
    DuplicateDancer(Id),
    #[error("piece {0} appears more than once")]
    DuplicatePiece(Id),
    #[error("dancer {dancer} ranks unknown piece {piece}")]
    UnknownPiece { dancer: Id, piece: Id },
    #[error("piece {piece} ranks unknown dancer {dancer}")]
    UnknownDancer { piece: Id, dancer: Id },
    #[error("{owner} ranks {id} more than once")]
    RepeatedRanking { owner: Id, id: Id },
}

#[derive(Debug, Clone, Default)]
pub struct Market {
    dancers: BTreeMap<Id, Dancer>,
    pieces: BTreeMap<Id, Piece>,
}

impl Market {
    pub fn new(
        dancers: impl IntoIterator<Item = Dancer>,
        pieces: impl IntoIterator<Item = Piece>,
    ) -> Result<Market, MarketError> {
        let mut dancer_map = BTreeMap::new();
        for dancer in dancers {
            let id = dancer.id;
            if dancer_map.insert(id, dancer).is_some() {
                return Err(MarketError::DuplicateDancer(id));
            }
        }
        let mut piece_map = BTreeMap::new();
        for piece in pieces {
            let id = piece.id;
            if piece_map.insert(id, piece).is_some() {
                return Err(MarketError::DuplicatePiece(id));
            }
        }

        for dancer in dancer_map.values() {
            if let Some(piece) = dancer.piece_rankings().iter().duplicates().next() {
                return Err(MarketError::RepeatedRanking { owner: dancer.id, id: *piece });
            }
            if let Some(piece) = dancer.piece_rankings().iter().find(|id| !piece_map.contains_key(*id)) {
                return Err(MarketError::UnknownPiece { dancer: dancer.id, piece: *piece });
            }
        }
        for piece in piece_map.values() {
            if let Some(dancer) = piece.dancer_rankings().iter().duplicates().next() {
                return Err(MarketError::RepeatedRanking { owner: piece.id, id: *dancer });
            }
            if let Some(dancer) = piece.dancer_rankings().iter().find(|id| !dancer_map.contains_key(*id)) {
                return Err(MarketError::UnknownDancer { piece: piece.id, dancer: *dancer });
            }
        }

        Ok(Market { dancers: dancer_map, pieces: piece_map })
    }

    pub fn dancer(&self, id: Id) -> Option<&Dancer> {
        self.dancers.get(&id)
    }

    pub fn piece(&self, id: Id) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn dancers(&self) -> impl Iterator<Item = &Dancer> {
        self.dancers.values()
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn piece_ids(&self) -> Vec<Id> {
        self.pieces.keys().copied().collect()
    }

    /// Dancers that wanted pieces but ended up with none.
    pub fn unassigned(&self) -> impl Iterator<Item = &Dancer> {
        self.dancers
            .values()
            .filter(|dancer| dancer.assigned_pieces().is_empty() && dancer.remaining() > 0)
    }

    pub fn into_parts(self) -> (BTreeMap<Id, Dancer>, BTreeMap<Id, Piece>) {
        (self.dancers, self.pieces)
    }

    /// Whether `dancer` could join `piece` right now, with the piece's
    /// acceptance window widened by `alternates`.
    pub fn is_eligible(&self, dancer: Id, piece: Id, alternates: usize) -> bool {
        let (Some(d), Some(p)) = (self.dancers.get(&dancer), self.pieces.get(&piece)) else {
            return false;
        };
        !d.done()
            && !p.full()
            && !p.holds(dancer)
            && self.quota_allows(p, d)
            && p.window(alternates).contains(&dancer)
            && d.top_choices().contains(&piece)
    }

    pub fn quota_allows(&self, piece: &Piece, dancer: &Dancer) -> bool {
        let Some(quota) = &piece.quota else {
            return true;
        };
        let cast: CategoryCounter = piece
            .assigned_dancers()
            .iter()
            .filter_map(|id| self.dancers.get(id))
            .map(|other| other.gender.as_str())
            .collect();
        cast.get(&dancer.gender) < quota.max_for(&dancer.gender)
    }

    /// From the piece's side: `dancer` can never be cast in `piece`.
    pub fn piece_rules_out(&self, piece: Id, dancer: Id) -> bool {
        let (Some(d), Some(p)) = (self.dancers.get(&dancer), self.pieces.get(&piece)) else {
            return true;
        };
        (!p.holds(dancer) && (!d.ranks(piece) || d.done())) || p.full()
    }

    /// From the dancer's side: `piece` will never take `dancer`.
    pub fn dancer_rules_out(&self, dancer: Id, piece: Id) -> bool {
        let Some(p) = self.pieces.get(&piece) else {
            return true;
        };
        !p.holds(dancer) && (p.full() || !p.ranks(dancer))
    }

    /// Casts `dancer` in `piece`. Once the piece is full it is struck from the
    /// list of every dancer it still ranks; the ids of the dancers that lost
    /// it are returned.
    pub(crate) fn commit(&mut self, dancer: Id, piece: Id) -> Vec<Id> {
        let (Some(d), Some(p)) = (self.dancers.get_mut(&dancer), self.pieces.get_mut(&piece)) else {
            return Vec::new();
        };
        d.take_piece(piece);
        p.take_dancer(dancer);
        if !p.full() {
            return Vec::new();
        }

        let ranked = p.dancer_rankings().to_vec();
        ranked
            .into_iter()
            .filter(|id| {
                self.dancers
                    .get_mut(id)
                    .map_or(false, |other| other.forget_piece(piece))
            })
            .collect()
    }

    /// Removes `dancer` from `piece`'s ranking list.
    pub(crate) fn drop_dancer(&mut self, piece: Id, dancer: Id) -> bool {
        self.pieces
            .get_mut(&piece)
            .map_or(false, |p| p.forget_dancer(dancer))
    }

    /// Removes `piece` from `dancer`'s ranking list.
    pub(crate) fn drop_piece(&mut self, dancer: Id, piece: Id) -> bool {
        self.dancers
            .get_mut(&dancer)
            .map_or(false, |d| d.forget_piece(piece))
    }

    /// Every piece that can still take someone already sees its whole list.
    pub(crate) fn windows_saturated(&self, alternates: usize) -> bool {
        self.pieces
            .values()
            .filter(|piece| !piece.full())
            .all(|piece| piece.capacity + alternates >= piece.dancer_rankings().len())
    }
}
