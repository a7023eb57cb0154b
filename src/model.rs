pub mod entity {
    pub type Id = u32;
    pub type Category = String;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Contact {
        pub email: String,
        pub phone: String,
    }

    impl Default for Contact {
        fn default() -> Self {
            Contact {
                email: "no email".to_string(),
                phone: "no phone".to_string(),
            }
        }
    }

    /// An auditioning dancer and the pieces they ranked, most wanted first.
    ///
    /// `piece_rankings` only ever shrinks and `assigned_pieces` only ever grows;
    /// both are mutated exclusively through [`crate::market::Market`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct Dancer {
        pub id: Id,
        pub first_name: String,
        pub last_name: String,
        pub gender: Category,
        pub contact: Contact,
        initial_wanted: usize,
        remaining: usize,
        piece_rankings: Vec<Id>,
        assigned_pieces: Vec<Id>,
    }

    impl Dancer {
        pub fn new(
            id: Id,
            first_name: impl Into<String>,
            last_name: impl Into<String>,
            gender: impl Into<Category>,
            num_pieces: usize,
            piece_rankings: Vec<Id>,
        ) -> Dancer {
            Dancer {
                id,
                first_name: first_name.into(),
                last_name: last_name.into(),
                gender: gender.into(),
                contact: Contact::default(),
                initial_wanted: num_pieces,
                remaining: num_pieces,
                piece_rankings,
                assigned_pieces: Vec::new(),
            }
        }

        pub fn with_contact(mut self, contact: Contact) -> Dancer {
            self.contact = contact;
            self
        }

        pub fn full_name(&self) -> String {
            format!("{} {}", self.first_name, self.last_name)
        }

        /// Number of pieces the dancer still wants.
        pub fn remaining(&self) -> usize {
            self.remaining
        }

        pub fn initial_wanted(&self) -> usize {
            self.initial_wanted
        }

        pub fn done(&self) -> bool {
            self.remaining == 0
        }

        pub fn piece_rankings(&self) -> &[Id] {
            &self.piece_rankings
        }

        /// Pieces ahead of the remaining-want cutoff.
        pub fn top_choices(&self) -> &[Id] {
            &self.piece_rankings[..self.remaining.min(self.piece_rankings.len())]
        }

        pub fn assigned_pieces(&self) -> &[Id] {
            &self.assigned_pieces
        }

        pub fn ranks(&self, piece: Id) -> bool {
            self.piece_rankings.contains(&piece)
        }

        pub fn rank_of(&self, piece: Id) -> Option<usize> {
            self.piece_rankings.iter().position(|id| *id == piece)
        }

        pub fn is_assigned(&self, piece: Id) -> bool {
            self.assigned_pieces.contains(&piece)
        }

        pub(crate) fn take_piece(&mut self, piece: Id) {
            self.assigned_pieces.push(piece);
            self.forget_piece(piece);
            self.remaining = self.remaining.saturating_sub(1);
        }

        pub(crate) fn forget_piece(&mut self, piece: Id) -> bool {
            match self.rank_of(piece) {
                Some(index) => {
                    self.piece_rankings.remove(index);
                    true
                }
                None => false,
            }
        }
    }
}


pub mod piece {
    use super::condition::Quota;
    use super::entity::Id;

    /// A piece being cast, with the choreographer's ranking of dancers.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Piece {
        pub id: Id,
        pub name: String,
        pub capacity: usize,
        pub quota: Option<Quota>,
        dancer_rankings: Vec<Id>,
        assigned_dancers: Vec<Id>,
    }

    impl Piece {
        pub fn new(
            id: Id,
            name: impl Into<String>,
            capacity: usize,
            dancer_rankings: Vec<Id>,
            quota: Option<Quota>,
        ) -> Piece {
            Piece {
                id,
                name: name.into(),
                capacity,
                quota,
                dancer_rankings,
                assigned_dancers: Vec::new(),
            }
        }

        pub fn full(&self) -> bool {
            self.assigned_dancers.len() >= self.capacity
        }

        pub fn dancer_rankings(&self) -> &[Id] {
            &self.dancer_rankings
        }

        /// Ranking list truncated to `capacity + alternates` entries.
        pub fn window(&self, alternates: usize) -> &[Id] {
            let len = (self.capacity + alternates).min(self.dancer_rankings.len());
            &self.dancer_rankings[..len]
        }

        pub fn assigned_dancers(&self) -> &[Id] {
            &self.assigned_dancers
        }

        pub fn ranks(&self, dancer: Id) -> bool {
            self.dancer_rankings.contains(&dancer)
        }

        pub fn rank_of(&self, dancer: Id) -> Option<usize> {
            self.dancer_rankings.iter().position(|id| *id == dancer)
        }

        pub fn holds(&self, dancer: Id) -> bool {
            self.assigned_dancers.contains(&dancer)
        }

        pub(crate) fn take_dancer(&mut self, dancer: Id) {
            self.assigned_dancers.push(dancer);
        }

        pub(crate) fn forget_dancer(&mut self, dancer: Id) -> bool {
            match self.rank_of(dancer) {
                Some(index) => {
                    self.dancer_rankings.remove(index);
                    true
                }
                None => false,
            }
        }
    }
}

pub mod condition {
    use std::collections::BTreeMap;
    use std::fmt;
    use super::entity::Category;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GenderConstraint {
        pub min: usize,
        pub max: usize,
    }

    /// Per-category headcount limits for one piece.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Quota(pub BTreeMap<Category, GenderConstraint>);

    impl Quota {
        /// Builds a quota from declared category totals. Choreographers that
        /// leave the breakdown incomplete get no quota at all.
        pub fn from_declared<C: Into<Category>>(
            total: usize,
            declared: impl IntoIterator<Item = (C, usize)>,
        ) -> Option<Quota> {
            let declared: Vec<(Category, usize)> = declared
                .into_iter()
                .map(|(category, count)| (category.into(), count))
                .collect();
            if declared.is_empty() || declared.iter().map(|(_, count)| count).sum::<usize>() != total {
                return None;
            }
            let limits = declared
                .into_iter()
                .map(|(category, count)| (category, GenderConstraint { min: count, max: count }))
                .collect();
            Some(Quota(limits))
        }

        /// Categories the quota never mentions get no seats.
        pub fn max_for(&self, category: &str) -> usize {
            self.0.get(category).map_or(0, |constraint| constraint.max)
        }
    }

    impl fmt::Display for Quota {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut first = true;
            for (category, constraint) in &self.0 {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                if constraint.min == constraint.max {
                    write!(f, "{}: {}", category, constraint.max)?;
                } else {
                    write!(f, "{}: {}-{}", category, constraint.min, constraint.max)?;
                }
            }
            Ok(())
        }
    }
}
