//! Learned state-action values and their on-disk snapshot.
//!
//! Snapshots are JSON Lines, one record per entry:
//! `{"state":[-2,-2,-2,-2,-1,-1,-2,-1,-1],"action":[0,0],"value":-0.95}`.
//! Records are written in sorted key order so identical tables produce
//! identical files.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::LocalState;

/// A cell to reveal, as `(row, col)`.
pub type Action = (usize, usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateAction {
    pub state: LocalState,
    pub action: Action,
}

#[derive(Serialize, Deserialize)]
struct Record {
    state: [i8; 9],
    action: [usize; 2],
    value: f64,
}

/// Tabular value estimates keyed by `(LocalState, Action)`. Missing entries read as 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueTable {
    entries: HashMap<StateAction, f64>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, state: LocalState, action: Action) -> f64 {
        self.entries
            .get(&StateAction { state, action })
            .copied()
            .unwrap_or(0.0)
    }

    pub fn insert(&mut self, state: LocalState, action: Action, value: f64) {
        self.entries.insert(StateAction { state, action }, value);
    }

    /// Move the entry a `learning_rate` fraction of the way toward `target`.
    pub fn update(&mut self, state: LocalState, action: Action, target: f64, learning_rate: f64) {
        let value = self.entries.entry(StateAction { state, action }).or_insert(0.0);
        *value += learning_rate * (target - *value);
    }

    /// Highest value of `state` over `actions`, or 0 when there are none.
    pub fn best_value<I>(&self, state: LocalState, actions: I) -> f64
    where
        I: IntoIterator<Item = Action>,
    {
        actions
            .into_iter()
            .map(|action| self.get(state, action))
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    fn sorted_keys(&self) -> Vec<&StateAction> {
        let mut keys: Vec<&StateAction> = self.entries.keys().collect();
        keys.sort_unstable();
        keys
    }

    /// Write every entry as one JSON line.
    pub fn write_jsonl<W: Write>(&self, mut out: W) -> Result<()> {
        for key in self.sorted_keys() {
            let rec = Record {
                state: key.state.0,
                action: [key.action.0, key.action.1],
                value: self.entries[key],
            };
            serde_json::to_writer(&mut out, &rec).map_err(io::Error::from)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Read a table written by [`write_jsonl`](Self::write_jsonl). Blank lines are skipped.
    pub fn read_jsonl<R: BufRead>(input: R) -> Result<Self> {
        let mut table = Self::new();
        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let rec: Record = serde_json::from_str(&line)
                .map_err(|source| Error::MalformedSnapshot { line: idx + 1, source })?;
            table.insert(LocalState(rec.state), (rec.action[0], rec.action[1]), rec.value);
        }
        Ok(table)
    }

    /// Write the snapshot to `path`.
    ///
    /// The data goes to a sibling temporary file first and is renamed over
    /// `path`, so readers never observe a partially written snapshot.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Dropping the temp file on any error path deletes it.
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_jsonl(BufWriter::new(tmp.as_file_mut()))?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), entries = self.len(), "value table saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::read_jsonl(BufReader::new(File::open(path)?))?;
        debug!(path = %path.display(), entries = table.len(), "value table loaded");
        Ok(table)
    }
}

/// A value table that a trainer can publish into while other threads query it.
#[derive(Clone, Debug, Default)]
pub struct SharedValueTable {
    inner: Arc<RwLock<ValueTable>>,
}

impl SharedValueTable {
    pub fn new(table: ValueTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Replace the current table wholesale.
    pub fn publish(&self, table: ValueTable) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = table;
    }

    /// Read access for queries. A poisoned lock still yields the last published table.
    pub fn read(&self) -> RwLockReadGuard<'_, ValueTable> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ValueTable {
        self.read().clone()
    }
}
