use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// When and how far the alternates window widens during relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schedule {
    /// Relaxation rounds to run at most.
    pub rounds: usize,
    /// Rounds up to and including this one never widen the window.
    pub warmup: usize,
    /// After warmup, widen on every round divisible by this.
    pub interval: usize,
    pub max_alternates: Option<usize>,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            rounds: 500,
            warmup: 30,
            interval: 5,
            max_alternates: None,
        }
    }
}

impl Schedule {
    /// Alternates to use in `round`, given the value used in the round before.
    pub fn next_alternates(&self, round: usize, alternates: usize) -> usize {
        let widen = round > self.warmup && self.interval > 0 && round % self.interval == 0;
        let next = if widen { alternates + 1 } else { alternates };
        match self.max_alternates {
            Some(cap) => next.min(cap),
            None => next,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub schedule: Schedule,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schedule: Schedule::default(),
            output_dir: PathBuf::from("piece_assignments"),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_first_widens_at_round_35() {
        let schedule = Schedule::default();
        let mut alternates = 0;
        let mut widened_at = Vec::new();
        for round in 0..schedule.rounds {
            let next = schedule.next_alternates(round, alternates);
            if next != alternates {
                widened_at.push(round);
            }
            alternates = next;
        }
        assert_eq!(widened_at.first(), Some(&35));
        assert_eq!(widened_at[1], 40);
        assert_eq!(alternates, 93);
    }

    #[test]
    fn cap_limits_alternates() {
        let schedule = Schedule { max_alternates: Some(2), ..Schedule::default() };
        assert_eq!(schedule.next_alternates(35, 2), 2);
        assert_eq!(schedule.next_alternates(35, 1), 2);
        assert_eq!(schedule.next_alternates(36, 1), 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("[schedule]\nrounds = 80\n").unwrap();
        assert_eq!(config.schedule.rounds, 80);
        assert_eq!(config.schedule.warmup, 30);
        assert_eq!(config.output_dir, PathBuf::from("piece_assignments"));

        assert!(Config::from_toml("bogus = 1").is_err());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audition.toml");
        fs::write(&path, "output_dir = \"out\"\n[schedule]\ninterval = 2\nmax_alternates = 4\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.schedule.interval, 2);
        assert_eq!(config.schedule.max_alternates, Some(4));

        let missing = Config::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
