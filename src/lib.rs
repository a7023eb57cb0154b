//! Audition casting: assigns dancers to pieces from both sides' rankings.
//!
//! A [`loader::SemesterFiles`] reads the spreadsheets into a [`Market`], an
//! [`Allocator`] casts it, and [`report::write_reports`] renders the result.

pub mod action;
pub mod allocator;
pub mod config;
pub mod loader;
pub mod market;
pub mod model;
pub mod observer;
pub mod report;
pub mod tally;

pub use action::{Event, RoundOutcome, Side, Stage};
pub use allocator::{Allocator, RunSummary};
pub use config::{Config, ConfigError, Schedule};
pub use loader::{LoadError, SemesterFiles};
pub use market::{Market, MarketError};
pub use model::condition::{GenderConstraint, Quota};
pub use model::entity::{Category, Contact, Dancer, Id};
pub use model::piece::Piece;
pub use observer::{NoopObserver, Observer, TracingObserver};
pub use report::{write_reports, ReportError, ReportSummary};
