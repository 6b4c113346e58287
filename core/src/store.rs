use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Score;

/// Persistence collaborator for the single best-score value.
///
/// Loaded once when the engine is built and written back only when a won
/// round beats the stored value.
pub trait ScoreStore {
    /// Reads the persisted best score, `0` when nothing was stored yet.
    fn load(&self) -> Result<Score>;

    /// Persists a new best score.
    fn save(&mut self, best: Score) -> Result<()>;
}

/// In-process store with no persistence, for tests and throwaway sessions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MemoryScoreStore {
    best: Score,
}

impl MemoryScoreStore {
    pub const fn new(best: Score) -> Self {
        Self { best }
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> Result<Score> {
        Ok(self.best)
    }

    fn save(&mut self, best: Score) -> Result<()> {
        self.best = best;
        Ok(())
    }
}

/// File-backed store holding the best score as a bare JSON integer.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonScoreStore {
    path: PathBuf,
}

impl JsonScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for JsonScoreStore {
    fn load(&self) -> Result<Score> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&mut self, best: Score) -> Result<()> {
        fs::write(&self.path, serde_json::to_string(&best)?)?;
        Ok(())
    }
}
