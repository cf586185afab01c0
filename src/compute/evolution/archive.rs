//! Level archive for persisting evolved levels and run summaries.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::schema::{Level, LevelParseError, RunSummary};

/// File the per-generation best level is written to.
pub const LATEST_FILE: &str = "last.txt";

/// Archive errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse level {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: LevelParseError,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory of level text files.
#[derive(Debug, Clone)]
pub struct LevelArchive {
    dir: PathBuf,
}

impl LevelArchive {
    /// Open an archive, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, name: &str, contents: &str) -> Result<PathBuf, ArchiveError> {
        let path = self.dir.join(name);
        fs::write(&path, contents).map_err(|e| ArchiveError::io(&path, e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Overwrite `last.txt` with `level`, given as a [`Level`] or its text
    /// form.
    pub fn save_latest<L>(&self, level: &L) -> Result<PathBuf, ArchiveError>
    where
        L: fmt::Display + ?Sized,
    {
        self.write(LATEST_FILE, &level.to_string())
    }

    /// Write up to `k` levels as `<label>_<rank>.txt`, rank 0 first.
    pub fn save_ranked<'a, I>(
        &self,
        label: &str,
        levels: I,
        k: usize,
    ) -> Result<Vec<PathBuf>, ArchiveError>
    where
        I: IntoIterator<Item = &'a Level>,
    {
        levels
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, level)| self.write(&format!("{label}_{rank}.txt"), &level.to_text()))
            .collect()
    }

    /// Write `summary` as pretty JSON to `<label>_summary.json`.
    pub fn save_summary(
        &self,
        label: &str,
        summary: &RunSummary,
    ) -> Result<PathBuf, ArchiveError> {
        let json = serde_json::to_string_pretty(summary)?;
        self.write(&format!("{label}_summary.json"), &json)
    }

    /// Read a level file back.
    pub fn load_level<P: AsRef<Path>>(path: P) -> Result<Level, ArchiveError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
        Level::from_text(&text).map_err(|source| ArchiveError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a run summary back.
    pub fn load_summary<P: AsRef<Path>>(path: P) -> Result<RunSummary, ArchiveError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}
