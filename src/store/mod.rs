//! Read-only access to stored OCR records.
//!
//! The orchestrator only ever queries: "latest record for a user" and
//! "records for a user matching a pattern, newest first".

use crate::error::StoreError;
use crate::models::StoredRecord;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Query-only record store.
pub trait RecordStore: Send + Sync {
    /// Most recently created record for `user_id`.
    fn latest_for_user(&self, user_id: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Records for `user_id` whose text matches `pattern`, newest first,
    /// at most `limit`.
    fn matching_for_user(
        &self,
        user_id: &str,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError>;
}

/// Case-insensitive matcher for a keyword.
///
/// The keyword is tried as a regular expression first; an invalid pattern
/// is matched literally instead.
pub fn keyword_matcher(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
        })
}

fn newest_first(records: &mut [StoredRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn select_matching(
    records: impl IntoIterator<Item = StoredRecord>,
    user_id: &str,
    pattern: &str,
    limit: usize,
) -> Vec<StoredRecord> {
    let matcher = match keyword_matcher(pattern) {
        Ok(matcher) => matcher,
        Err(e) => {
            warn!("Unusable keyword pattern {:?}: {}", pattern, e);
            return Vec::new();
        }
    };
    let mut matching: Vec<StoredRecord> = records
        .into_iter()
        .filter(|r| r.user_id == user_id && matcher.is_match(&r.extracted_text))
        .collect();
    newest_first(&mut matching);
    matching.truncate(limit);
    matching
}

/// In-memory store, used for tests and for embedding the pipeline.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<StoredRecord>) -> Self {
        Self { records }
    }
}

impl RecordStore for MemoryStore {
    fn latest_for_user(&self, user_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    fn matching_for_user(
        &self,
        user_id: &str,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(select_matching(
            self.records.iter().cloned(),
            user_id,
            pattern,
            limit,
        ))
    }
}

/// Store backed by a directory of JSON record files.
///
/// Every `*.json` file below the root holds one [`StoredRecord`]. Files that
/// cannot be read or parsed are skipped with a warning.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load every parseable record below the root.
    fn load_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        if !self.root.is_dir() {
            debug!("Record directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry?;
            let path = entry.path();

            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_str::<StoredRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed record {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} records from {}", records.len(), self.root.display());
        Ok(records)
    }
}

impl RecordStore for DirectoryStore {
    fn latest_for_user(&self, user_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.created_at))
    }

    fn matching_for_user(
        &self,
        user_id: &str,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(select_matching(self.load_all()?, user_id, pattern, limit))
    }
}
