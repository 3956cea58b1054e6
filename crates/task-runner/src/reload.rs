//! Live behavior loader.
//!
//! Keeps every compiled handler table in an arena and moves an active index
//! through it. A changed behavior source is compiled into a candidate; a
//! valid candidate is swapped in, the source is validated once more, and the
//! swap is committed or rolled back. An invalid candidate never becomes
//! active.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use task_engine::{compile_source, BehaviorError, HandlerTable};
use tracing::{info, warn};

/// Where behavior definitions come from.
pub trait BehaviorSource {
    /// Modification stamp of the source. `None` when it does not exist.
    fn modified(&self) -> io::Result<Option<SystemTime>>;

    fn read(&self) -> io::Result<String>;

    fn describe(&self) -> String;
}

/// A behavior definition file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BehaviorSource for FileSource {
    fn modified(&self) -> io::Result<Option<SystemTime>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A source that never changes. The built-in table stays active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl BehaviorSource for NoSource {
    fn modified(&self) -> io::Result<Option<SystemTime>> {
        Ok(None)
    }

    fn read(&self) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no behavior source"))
    }

    fn describe(&self) -> String {
        "built-in".to_string()
    }
}

impl<S: BehaviorSource + ?Sized> BehaviorSource for Box<S> {
    fn modified(&self) -> io::Result<Option<SystemTime>> {
        (**self).modified()
    }

    fn read(&self) -> io::Result<String> {
        (**self).read()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// Nothing new, or a change that was already rejected.
    Unchanged,
    /// A new table is active.
    Committed { version: u32 },
    /// The candidate failed validation; the previous table stays active.
    Rejected { reason: String },
    /// The candidate was swapped in but the source no longer validated, so
    /// the previous table was restored.
    RolledBack { version: u32, reason: String },
}

/// Why a source could not be turned into a table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReloadError {
    #[error("cannot read behavior source: {reason}")]
    Read { reason: String },

    #[error(transparent)]
    Invalid(#[from] BehaviorError),
}

/// Phase of the loader between polls and during one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// The table at this arena index is in effect.
    Stable(usize),
    /// A candidate is being checked; the index is still in effect.
    Validating(usize),
}

pub struct BehaviorLoader<S> {
    source: S,
    tables: Vec<HandlerTable>,
    state: LoaderState,
    /// Stamp of the source behind the active table.
    applied: Option<SystemTime>,
    /// Stamp of the last source that was rejected or rolled back.
    rejected: Option<SystemTime>,
}

impl<S: BehaviorSource> BehaviorLoader<S> {
    /// Start with only the built-in table (version 0).
    pub fn new(source: S) -> Self {
        Self {
            source,
            tables: vec![HandlerTable::builtin()],
            state: LoaderState::Stable(0),
            applied: None,
            rejected: None,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    fn active_index(&self) -> usize {
        match self.state {
            LoaderState::Stable(i) | LoaderState::Validating(i) => i,
        }
    }

    /// The table tasks run against.
    pub fn active(&self) -> &HandlerTable {
        &self.tables[self.active_index()]
    }

    pub fn active_version(&self) -> u32 {
        self.active().version
    }

    /// Every table ever compiled, including rolled-back ones.
    pub fn history(&self) -> &[HandlerTable] {
        &self.tables
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Check the source and move to a newer table if it is valid.
    pub fn poll(&mut self) -> ReloadOutcome {
        let stamp = match self.source.modified() {
            Ok(Some(stamp)) => stamp,
            Ok(None) => return ReloadOutcome::Unchanged,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "reload check failed");
                return ReloadOutcome::Unchanged;
            }
        };
        if self.applied.is_some_and(|t| stamp <= t) || self.rejected == Some(stamp) {
            return ReloadOutcome::Unchanged;
        }

        let previous = self.active_index();
        self.state = LoaderState::Validating(previous);
        let version = self.tables.len() as u32;

        let candidate = match self.load(version) {
            Ok(table) => table,
            Err(e) => {
                self.state = LoaderState::Stable(previous);
                self.rejected = Some(stamp);
                warn!(
                    source = %self.source.describe(),
                    error = %e,
                    active = self.active_version(),
                    "reload rejected, previous version still active"
                );
                return ReloadOutcome::Rejected {
                    reason: e.to_string(),
                };
            }
        };

        self.tables.push(candidate);
        let swapped = self.tables.len() - 1;
        self.state = LoaderState::Validating(swapped);

        // Validate again after the swap; the source may have been
        // rewritten while the candidate was compiled.
        if let Err(e) = self.load(version) {
            self.state = LoaderState::Stable(previous);
            self.rejected = Some(stamp);
            warn!(
                source = %self.source.describe(),
                error = %e,
                version,
                active = self.active_version(),
                "source invalid after swap, rolled back"
            );
            return ReloadOutcome::RolledBack {
                version,
                reason: e.to_string(),
            };
        }

        self.state = LoaderState::Stable(swapped);
        self.applied = Some(stamp);
        self.rejected = None;
        info!(source = %self.source.describe(), version, "behavior reloaded");
        ReloadOutcome::Committed { version }
    }

    fn load(&self, version: u32) -> Result<HandlerTable, ReloadError> {
        let text = self.source.read().map_err(|e| ReloadError::Read {
            reason: e.to_string(),
        })?;
        Ok(compile_source(&text, version)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_leaves_builtin_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = BehaviorLoader::new(FileSource::new(dir.path().join("behavior.json")));
        assert_eq!(loader.poll(), ReloadOutcome::Unchanged);
        assert_eq!(loader.active_version(), 0);
        assert_eq!(loader.state(), LoaderState::Stable(0));
    }

    #[test]
    fn no_source_never_changes() {
        let mut loader = BehaviorLoader::new(NoSource);
        assert_eq!(loader.poll(), ReloadOutcome::Unchanged);
        assert_eq!(loader.history().len(), 1);
    }
}
