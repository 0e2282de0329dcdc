//! Load Progress Aggregation
//!
//! Merges per-artifact loading events into a display-ready list. Entries are
//! keyed by file name and kept in insertion order so a progress list rendered
//! from successive snapshots does not jump around.

use serde::{Deserialize, Serialize};

use crate::protocol::WorkerEvent;

/// One artifact being fetched while the model loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadArtifact {
    /// Artifact identity, unique among concurrently loading artifacts
    pub file: String,
    /// Model the artifact belongs to, when the worker reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bytes received so far
    pub loaded: u64,
    /// Expected size in bytes (0 when unknown)
    pub total: u64,
}

impl LoadArtifact {
    pub fn new(file: impl Into<String>, name: Option<String>, total: u64) -> Self {
        Self {
            file: file.into(),
            name,
            loaded: 0,
            total,
        }
    }

    /// Percentage in `0.0..=100.0` for well-formed input. Not clamped: a
    /// producer reporting more bytes than the total gets a value above 100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.loaded as f64 / self.total as f64 * 100.0
    }
}

/// Active-artifact set for one load.
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    items: Vec<LoadArtifact>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an artifact. A stale entry with the same id is replaced
    /// where it stands.
    pub fn initiate(&mut self, file: &str, name: Option<String>, total: u64) {
        let fresh = LoadArtifact::new(file, name, total);
        match self.position(file) {
            Some(idx) => self.items[idx] = fresh,
            None => self.items.push(fresh),
        }
    }

    /// Merge a progress sample. An unseen id is treated as an implicit
    /// `initiate`.
    pub fn progress(&mut self, file: &str, name: Option<String>, loaded: u64, total: u64) {
        match self.position(file) {
            Some(idx) => {
                let item = &mut self.items[idx];
                item.loaded = loaded;
                item.total = total;
                if name.is_some() {
                    item.name = name;
                }
            }
            None => {
                let mut item = LoadArtifact::new(file, name, total);
                item.loaded = loaded;
                self.items.push(item);
            }
        }
    }

    /// Stop tracking an artifact. Unknown ids are ignored.
    pub fn done(&mut self, file: &str) {
        self.items.retain(|item| item.file != file);
    }

    /// Route a loading event. Returns `false` for events that are not part of
    /// the artifact pipeline, leaving the set untouched.
    pub fn apply(&mut self, event: &WorkerEvent) -> bool {
        match event {
            WorkerEvent::Initiate { file, name, total } => {
                self.initiate(file, name.clone(), *total);
                true
            }
            WorkerEvent::Progress {
                file,
                name,
                loaded,
                total,
            } => {
                self.progress(file, name.clone(), *loaded, *total);
                true
            }
            WorkerEvent::Done { file } => {
                self.done(file);
                true
            }
            _ => false,
        }
    }

    /// Current artifacts in insertion order.
    pub fn items(&self) -> &[LoadArtifact] {
        &self.items
    }

    /// Owned copy of the current artifacts, for publishing in a snapshot.
    pub fn snapshot(&self) -> Vec<LoadArtifact> {
        self.items.clone()
    }

    pub fn get(&self, file: &str) -> Option<&LoadArtifact> {
        self.items.iter().find(|item| item.file == file)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, file: &str) -> Option<usize> {
        self.items.iter().position(|item| item.file == file)
    }
}
