use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use audition_match::{Dancer, Id, Market, Piece, Quota};

/// A randomly generated audition, plus the rankings as first submitted.
pub struct Audition {
    pub market: Market,
    pub dancer_rankings: BTreeMap<Id, Vec<Id>>,
    pub piece_rankings: BTreeMap<Id, Vec<Id>>,
}

pub fn random_audition(seed: u64) -> Audition {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n_pieces: Id = rng.gen_range(1..=6);
    let n_dancers: Id = rng.gen_range(1..=20);
    let piece_ids: Vec<Id> = (1..=n_pieces).collect();
    let dancer_ids: Vec<Id> = (100..100 + n_dancers).collect();

    let dancers: Vec<Dancer> = dancer_ids
        .iter()
        .map(|&id| {
            let gender = if rng.gen_bool(0.5) { "F" } else { "M" };
            let ranked = rng.gen_range(0..=piece_ids.len());
            let rankings: Vec<Id> = piece_ids.choose_multiple(&mut rng, ranked).copied().collect();
            let wanted = rng.gen_range(1..=3);
            Dancer::new(id, format!("D{id}"), "Test", gender, wanted, rankings)
        })
        .collect();

    let pieces: Vec<Piece> = piece_ids
        .iter()
        .map(|&id| {
            let capacity = rng.gen_range(1..=5);
            let ranked = rng.gen_range(0..=dancer_ids.len());
            let rankings: Vec<Id> = dancer_ids.choose_multiple(&mut rng, ranked).copied().collect();
            let quota = if rng.gen_bool(0.5) {
                let female = rng.gen_range(0..=capacity);
                Quota::from_declared(capacity, [("F", female), ("M", capacity - female)])
            } else {
                None
            };
            Piece::new(id, format!("Piece {id}"), capacity, rankings, quota)
        })
        .collect();

    let dancer_rankings = dancers.iter().map(|d| (d.id, d.piece_rankings().to_vec())).collect();
    let piece_rankings = pieces.iter().map(|p| (p.id, p.dancer_rankings().to_vec())).collect();
    let market = Market::new(dancers, pieces).unwrap();
    Audition { market, dancer_rankings, piece_rankings }
}

pub fn assignments(market: &Market) -> Vec<(Id, Vec<Id>)> {
    market.dancers().map(|d| (d.id, d.assigned_pieces().to_vec())).collect()
}
