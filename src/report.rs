//! Plain-text casting results for choreographers and the board.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;
use tracing::info;

use crate::market::Market;
use crate::model::entity::Dancer;
use crate::model::piece::Piece;
use crate::tally::CategoryCounter;

const RULE: &str = "********************";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub pieces: usize,
    pub filled_pieces: usize,
    pub assigned_dancers: usize,
    pub unassigned_dancers: usize,
}

impl ReportSummary {
    pub fn of(market: &Market) -> ReportSummary {
        ReportSummary {
            pieces: market.pieces().count(),
            filled_pieces: market.pieces().filter(|piece| piece.full()).count(),
            assigned_dancers: market
                .dancers()
                .filter(|dancer| !dancer.assigned_pieces().is_empty())
                .count(),
            unassigned_dancers: market.unassigned().count(),
        }
    }
}

fn roster<'a>(market: &'a Market, piece: &Piece) -> Vec<&'a Dancer> {
    piece
        .assigned_dancers()
        .iter()
        .filter_map(|id| market.dancer(*id))
        .sorted_by_key(|dancer| dancer.id)
        .collect()
}

fn roster_line(dancer: &Dancer) -> String {
    format!("{} ; {} ; {}", dancer.id, dancer.full_name(), dancer.contact.email)
}

pub fn piece_file_name(piece: &Piece) -> String {
    format!("{} - {}.txt", piece.id, piece.name.replace('/', "_"))
}

/// The sheet handed to a piece's choreographer.
pub fn render_piece(market: &Market, piece: &Piece) -> String {
    let dancers = roster(market, piece);
    let genders: CategoryCounter = dancers.iter().map(|dancer| dancer.gender.as_str()).collect();
    let constraints = match &piece.quota {
        Some(quota) => quota.to_string(),
        None => "no gender constraints".to_string(),
    };

    let mut lines = vec![
        RULE.to_string(),
        format!("{} ({})", piece.name, piece.id),
        format!("Desired: {} dancers ({})", piece.capacity, constraints),
        format!(
            "Matched: {} dancers ({} female, {} male)",
            dancers.len(),
            genders.get("F"),
            genders.get("M")
        ),
        RULE.to_string(),
    ];
    lines.extend(dancers.iter().map(|dancer| roster_line(dancer)));
    lines.push(RULE.to_string());
    lines.push("Emails to copy:".to_string());
    lines.push(dancers.iter().map(|dancer| &dancer.contact.email).join(", "));
    lines.push(RULE.to_string());
    lines.push("List of names:".to_string());
    lines.extend(dancers.iter().map(|dancer| dancer.full_name()));
    lines.push(RULE.to_string());
    lines.push("List of emails:".to_string());
    lines.extend(dancers.iter().map(|dancer| dancer.contact.email.clone()));
    lines.push(RULE.to_string());
    lines.push("List of audition numbers:".to_string());
    lines.extend(dancers.iter().map(|dancer| dancer.id.to_string()));

    lines.join("\n") + "\n"
}

/// Dancers who wanted a piece and got none, with their contact details.
pub fn render_unassigned(market: &Market) -> String {
    let unassigned: Vec<&Dancer> = market.unassigned().collect();
    let mut lines: Vec<String> = unassigned
        .iter()
        .map(|dancer| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                dancer.id,
                dancer.full_name(),
                dancer.gender,
                dancer.contact.email,
                dancer.contact.phone
            )
        })
        .collect();
    lines.push(RULE.to_string());
    lines.push("Emails to copy:".to_string());
    lines.push(unassigned.iter().map(|dancer| &dancer.contact.email).join(", "));
    lines.join("\n") + "\n"
}

/// Every piece with its roster.
pub fn render_assigned(market: &Market) -> String {
    let mut out = String::new();
    for piece in market.pieces() {
        out.push_str(&format!("{} ; {}\n", piece.name, piece.id));
        for dancer in roster(market, piece) {
            out.push_str(&roster_line(dancer));
            out.push('\n');
        }
        out.push_str("\n\n");
    }
    out
}

/// Writes one sheet per piece plus `unassigned.txt` and `assigned.txt`.
pub fn write_reports(market: &Market, dir: &Path) -> Result<ReportSummary, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    for piece in market.pieces() {
        write(&dir.join(piece_file_name(piece)), &render_piece(market, piece))?;
    }
    write(&dir.join("unassigned.txt"), &render_unassigned(market))?;
    write(&dir.join("assigned.txt"), &render_assigned(market))?;

    let summary = ReportSummary::of(market);
    info!(
        dir = %dir.display(),
        pieces = summary.pieces,
        filled = summary.filled_pieces,
        assigned = summary.assigned_dancers,
        unassigned = summary.unassigned_dancers,
        "wrote reports"
    );
    Ok(summary)
}

fn write(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
