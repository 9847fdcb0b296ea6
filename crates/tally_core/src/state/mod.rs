//! Normalized record collections shared by the task and transaction modules.
//!
//! A [`Collection`] keeps every record ever created in `records` and tracks
//! trashed status through two ordered id lists. The lists are the only source
//! of truth for whether a record is active or trashed.

mod ids;

pub use ids::{IdSource, MonotonicIds, SequenceIds, Stamp};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

const MAX_ID_DRAWS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<R> {
    pub active_ids: Vec<String>,
    pub trashed_ids: Vec<String>,
    pub records: BTreeMap<String, R>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            active_ids: Vec::new(),
            trashed_ids: Vec::new(),
            records: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    Active,
    Trashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Trashed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trashed => "trashed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Listed as both active and trashed.
    InBothLists(String),
    /// Listed more than once in the same list.
    Duplicated(String),
    /// Listed without a record.
    MissingRecord(String),
    /// Has a record but appears in neither list.
    Unlisted(String),
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InBothLists(id) => write!(f, "{id} is both active and trashed"),
            Self::Duplicated(id) => write!(f, "{id} is listed more than once"),
            Self::MissingRecord(id) => write!(f, "{id} is listed but has no record"),
            Self::Unlisted(id) => write!(f, "{id} has a record but is not listed"),
        }
    }
}

impl<R> Collection<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.get(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_ids.iter().any(|active| active == id)
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.trashed_ids.iter().any(|trashed| trashed == id)
    }

    pub fn status_of(&self, id: &str) -> Option<Status> {
        if self.is_active(id) {
            Some(Status::Active)
        } else if self.is_trashed(id) {
            Some(Status::Trashed)
        } else {
            None
        }
    }

    /// Records in display order for the given filter. Ids without a record
    /// are skipped.
    pub fn list(&self, filter: Filter) -> impl Iterator<Item = (&str, &R)> + '_ {
        let ids = match filter {
            Filter::Active => &self.active_ids,
            Filter::Trashed => &self.trashed_ids,
        };
        ids.iter()
            .filter_map(|id| self.records.get(id).map(|record| (id.as_str(), record)))
    }

    /// An id is taken once it has a record or appears in either list.
    fn is_taken(&self, id: &str) -> bool {
        self.contains(id) || self.is_active(id) || self.is_trashed(id)
    }

    /// Adds a record under a new id at the tail of the active list. Returns
    /// `false` and leaves the collection untouched when the id is taken.
    pub(crate) fn insert(&mut self, id: String, record: R) -> bool {
        if self.is_taken(&id) {
            return false;
        }
        self.records.insert(id.clone(), record);
        self.active_ids.push(id);
        true
    }

    /// Draws a stamp whose id is not taken. A source that keeps repeating
    /// itself gets `MAX_ID_DRAWS` tries, then the last id is suffixed.
    pub(crate) fn fresh_stamp(&self, ids: &mut dyn IdSource) -> Stamp {
        let mut stamp = ids.next_stamp();
        let mut draws = 1;
        while self.is_taken(&stamp.id) && draws < MAX_ID_DRAWS {
            tracing::warn!(id = %stamp.id, "id source returned a taken id");
            stamp = ids.next_stamp();
            draws += 1;
        }

        let base = stamp.id.clone();
        let mut suffix = 1u64;
        while self.is_taken(&stamp.id) {
            stamp.id = format!("{base}-{suffix}");
            suffix += 1;
        }
        stamp
    }

    /// Moves `id` from the active list to the tail of the trashed list.
    /// Returns `false` when the id is already trashed or not active.
    pub(crate) fn trash(&mut self, id: &str) -> bool {
        if self.is_trashed(id) {
            return false;
        }
        let Some(index) = self.active_ids.iter().position(|active| active == id) else {
            return false;
        };
        let moved = self.active_ids.remove(index);
        self.trashed_ids.push(moved);
        true
    }

    /// Moves `id` from the trashed list to the tail of the active list.
    /// Returns `false` when the id is already active or not trashed.
    pub(crate) fn restore(&mut self, id: &str) -> bool {
        if self.is_active(id) {
            return false;
        }
        let Some(index) = self.trashed_ids.iter().position(|trashed| trashed == id) else {
            return false;
        };
        let moved = self.trashed_ids.remove(index);
        self.active_ids.push(moved);
        true
    }

    pub(crate) fn record_mut(&mut self, id: &str) -> Option<&mut R> {
        self.records.get_mut(id)
    }

    /// Every violation of the partition and referential integrity rules.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let mut active = HashSet::new();
        let mut trashed = HashSet::new();

        for id in &self.active_ids {
            if !active.insert(id.as_str()) {
                issues.push(IntegrityIssue::Duplicated(id.clone()));
            }
        }
        for id in &self.trashed_ids {
            if !trashed.insert(id.as_str()) {
                issues.push(IntegrityIssue::Duplicated(id.clone()));
            }
            if active.contains(id.as_str()) {
                issues.push(IntegrityIssue::InBothLists(id.clone()));
            }
        }
        for id in active.iter().chain(trashed.iter()) {
            if !self.records.contains_key(*id) {
                issues.push(IntegrityIssue::MissingRecord((*id).to_string()));
            }
        }
        for id in self.records.keys() {
            if !active.contains(id.as_str()) && !trashed.contains(id.as_str()) {
                issues.push(IntegrityIssue::Unlisted(id.clone()));
            }
        }

        issues
    }
}
