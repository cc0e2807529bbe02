// Copyright 2025 Verdict (https://github.com/verdict-rs/verdict)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Durable, content-addressed cache for metric results
//!
//! One JSON file per (test case, metric) pair under the cache directory,
//! fronted by an in-memory layer that absorbs repeated lookups within a
//! process. Keys are blake3 hashes over the test case's content fingerprint
//! plus the metric's name and configuration fingerprint, so any change to
//! test-case content or metric configuration misses cleanly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use verdict_core::{MetricResult, TestCase};

/// Cache failures that abort evaluator construction or a persist call.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One persisted (test case, metric) result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    created_at: DateTime<Utc>,
    result: MetricResult,
}

/// Hit/miss counters for one cache instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Entries currently resident in the in-memory layer
    pub entry_count: u64,
}

pub struct ResultCache {
    dir: PathBuf,
    memory: Cache<String, MetricResult>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    const MEMORY_CAPACITY: u64 = 10_000;

    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            memory: Cache::builder()
                .max_capacity(Self::MEMORY_CAPACITY)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Content-addressed key for one (test case, metric) pair.
    ///
    /// Each component is length-prefixed before hashing so concatenation
    /// ambiguities cannot collide two distinct pairs.
    pub fn key(test_case: &TestCase, metric_name: &str, config_fingerprint: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        let content = test_case.content_fingerprint();
        for part in [content.as_str(), metric_name, config_fingerprint] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Look up a stored result; `None` on miss or unreadable entry.
    pub async fn get(&self, key: &str) -> Option<MetricResult> {
        if let Some(result) = self.memory.get(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(result);
        }
        match self.read_entry(key) {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.memory.insert(key.to_string(), result.clone()).await;
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Persist one result.
    ///
    /// The entry is written to a temp file and renamed into place, so a
    /// same-key race leaves a complete entry from one writer either way;
    /// identical inputs produce equivalent stored results, making the race
    /// idempotent. Distinct-key writes are unordered.
    pub async fn put(&self, key: &str, result: &MetricResult) -> Result<(), CacheError> {
        let entry = CacheEntry {
            key: key.to_string(),
            created_at: Utc::now(),
            result: result.clone(),
        };
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(tmp.as_file(), &entry)?;
        tmp.persist(self.entry_path(key))
            .map_err(|err| CacheError::Io(err.error))?;
        self.memory.insert(key.to_string(), result.clone()).await;
        debug!(key, "cache entry persisted");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.memory.entry_count(),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_entry(&self, key: &str) -> Option<MetricResult> {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key, error = %err, "unreadable cache entry, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry.result),
            Err(err) => {
                warn!(key, error = %err, "corrupt cache entry, treating as miss");
                None
            }
        }
    }
}
