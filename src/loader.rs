//! Reads a semester's audition spreadsheets into a [`Market`].
//!
//! Three CSV exports are expected, each with a header row:
//!
//! - `CHOREO_<tag>.csv`: `id,name,total,male,female` then the dancer ids in
//!   the choreographer's rank order.
//! - `DANCER_<tag>.csv`: `date,first,last,id,gender,num_pieces`, one rank
//!   cell per piece (column `k` is piece `k + 1`), then `agreement`.
//! - `SIGN_IN_<tag>.csv`: `date,id,last,first,class_year,email,semesters,phone`.
//!
//! The rows are assumed to have been checked when the audition sheets were
//! printed; only unparseable cells and dangling ids are reported.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use itertools::Itertools;
use thiserror::Error;
use tracing::info;

use crate::market::{Market, MarketError};
use crate::model::condition::Quota;
use crate::model::entity::{Contact, Dancer, Id};
use crate::model::piece::Piece;

const DANCER_LEADING_COLUMNS: usize = 6;
const DANCER_TRAILING_COLUMNS: usize = 1;
const CHOREO_LEADING_COLUMNS: usize = 5;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{origin}: {source}")]
    Csv { origin: String, source: csv::Error },
    #[error("{origin} line {line}: invalid {field} {value:?}")]
    InvalidField { origin: String, line: u64, field: &'static str, value: String },
    #[error(transparent)]
    Market(#[from] MarketError),
}

/// The three input files for one semester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterFiles {
    pub choreographers: PathBuf,
    pub dancers: PathBuf,
    pub sign_in: PathBuf,
}

impl SemesterFiles {
    pub fn new(dir: &Path, semester: &str) -> SemesterFiles {
        SemesterFiles {
            choreographers: dir.join(format!("CHOREO_{semester}.csv")),
            dancers: dir.join(format!("DANCER_{semester}.csv")),
            sign_in: dir.join(format!("SIGN_IN_{semester}.csv")),
        }
    }

    pub fn load(&self) -> Result<Market, LoadError> {
        let contacts = read_contacts(open(&self.sign_in)?, &origin(&self.sign_in))?;
        let dancers = read_dancers(open(&self.dancers)?, &origin(&self.dancers), &contacts)?;
        let pieces = read_pieces(open(&self.choreographers)?, &origin(&self.choreographers))?;
        info!(dancers = dancers.len(), pieces = pieces.len(), "loaded audition preferences");
        Ok(Market::new(dancers, pieces)?)
    }
}

fn origin(path: &Path) -> String {
    path.display().to_string()
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|err| LoadError::Csv {
        origin: origin(path),
        source: err.into(),
    })
}

fn records<R: io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

struct Row<'a> {
    origin: &'a str,
    record: StringRecord,
}

impl Row<'_> {
    fn line(&self) -> u64 {
        self.record.position().map_or(0, |position| position.line())
    }

    fn text(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("")
    }

    fn parse<T: std::str::FromStr>(&self, index: usize, field: &'static str) -> Result<T, LoadError> {
        let value = self.text(index);
        value.parse().map_err(|_| LoadError::InvalidField {
            origin: self.origin.to_string(),
            line: self.line(),
            field,
            value: value.to_string(),
        })
    }
}

fn rows<'a, R: io::Read>(reader: R, origin: &'a str) -> Result<Vec<Row<'a>>, LoadError> {
    records(reader)
        .into_records()
        .map(|record| {
            record
                .map(|record| Row { origin, record })
                .map_err(|source| LoadError::Csv { origin: origin.to_string(), source })
        })
        .collect()
}

/// Email and phone per dancer id from the sign-in sheet.
pub fn read_contacts<R: io::Read>(reader: R, origin: &str) -> Result<HashMap<Id, Contact>, LoadError> {
    let mut contacts = HashMap::new();
    for row in rows(reader, origin)? {
        let id: Id = row.parse(1, "id")?;
        let contact = Contact {
            email: row.text(5).to_string(),
            phone: row.text(7).to_string(),
        };
        contacts.insert(id, contact);
    }
    Ok(contacts)
}

pub fn read_dancers<R: io::Read>(
    reader: R,
    origin: &str,
    contacts: &HashMap<Id, Contact>,
) -> Result<Vec<Dancer>, LoadError> {
    let mut dancers = Vec::new();
    for row in rows(reader, origin)? {
        let id: Id = row.parse(3, "id")?;
        let num_pieces: usize = row.parse(5, "num_pieces")?;

        let end = row.record.len().saturating_sub(DANCER_TRAILING_COLUMNS).max(DANCER_LEADING_COLUMNS);
        let mut ranked = Vec::new();
        for column in DANCER_LEADING_COLUMNS..end {
            if row.text(column).is_empty() {
                continue;
            }
            let rank: u32 = row.parse(column, "rank")?;
            let piece = (column - DANCER_LEADING_COLUMNS + 1) as Id;
            ranked.push((rank, piece));
        }
        let piece_rankings = ranked
            .into_iter()
            .sorted_by_key(|(rank, _)| *rank)
            .map(|(_, piece)| piece)
            .collect();

        let contact = contacts.get(&id).cloned().unwrap_or_default();
        let dancer = Dancer::new(id, row.text(1), row.text(2), row.text(4), num_pieces, piece_rankings)
            .with_contact(contact);
        dancers.push(dancer);
    }
    Ok(dancers)
}

pub fn read_pieces<R: io::Read>(reader: R, origin: &str) -> Result<Vec<Piece>, LoadError> {
    let mut pieces = Vec::new();
    for row in rows(reader, origin)? {
        let id: Id = row.parse(0, "id")?;
        let total: usize = row.parse(2, "total")?;
        let male: usize = row.parse(3, "male")?;
        let female: usize = row.parse(4, "female")?;

        let mut dancer_rankings = Vec::new();
        for column in CHOREO_LEADING_COLUMNS..row.record.len() {
            if !row.text(column).is_empty() {
                dancer_rankings.push(row.parse::<Id>(column, "dancer id")?);
            }
        }

        let quota = Quota::from_declared(total, [("F", female), ("M", male)]);
        pieces.push(Piece::new(id, row.text(1), total, dancer_rankings, quota));
    }
    Ok(pieces)
}
