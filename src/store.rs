// ABOUTME: Read-only records store interface for fitness records and conversation history
// ABOUTME: Ships an immutable in-memory implementation, optionally seeded from a JSON file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Records Store
//!
//! The coaching pipeline only reads. Persistence belongs to whatever service
//! produces the records; this crate talks to it through [`RecordsStore`].
//!
//! The seed file accepted by [`InMemoryRecordsStore::from_seed_file`] looks
//! like:
//!
//! ```json
//! {
//!   "records": {
//!     "athlete-1": [
//!       {"domain": "workout", "timestamp": "2025-06-02T06:30:00Z",
//!        "metric": "duration_minutes", "value": 42.0, "unit": "min"}
//!     ]
//!   },
//!   "histories": [
//!     {"token": "h-1", "user_id": "athlete-1",
//!      "messages": [{"role": "user", "content": "Plan my week"}]}
//!   ]
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pierre_core::models::{MetricDomain, MetricRecord};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::llm::ChatMessage;

/// Filter for one records query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsQuery {
    /// Owner of the records
    pub user_id: String,
    /// Domains to return
    pub domains: BTreeSet<MetricDomain>,
    /// Inclusive lower bound
    pub since: DateTime<Utc>,
    /// Inclusive upper bound
    pub until: DateTime<Utc>,
}

impl RecordsQuery {
    /// Whether a record passes this filter
    #[must_use]
    pub fn matches(&self, record: &MetricRecord) -> bool {
        self.domains.contains(&record.domain)
            && record.timestamp >= self.since
            && record.timestamp <= self.until
    }
}

/// Read-only access to fitness records and conversation history
#[async_trait]
pub trait RecordsStore: Send + Sync {
    /// Records for one user filtered by domain and time range
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backing store cannot be read.
    async fn query_records(&self, query: &RecordsQuery) -> AppResult<Vec<MetricRecord>>;

    /// Conversation history referenced by `history_token`, oldest first
    ///
    /// A missing token means a fresh conversation and yields no messages.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the token is unknown or belongs to a
    /// different user, and a storage error when the store cannot be read.
    async fn conversation_history(
        &self,
        user_id: &str,
        history_token: Option<&str>,
    ) -> AppResult<Vec<ChatMessage>>;
}

#[derive(Debug, Clone)]
struct StoredHistory {
    user_id: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct SeedHistory {
    token: String,
    user_id: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct SeedFile {
    #[serde(default)]
    records: HashMap<String, Vec<MetricRecord>>,
    #[serde(default)]
    histories: Vec<SeedHistory>,
}

/// Immutable in-memory records store
///
/// Built once at startup; concurrent reads need no synchronization.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordsStore {
    records: HashMap<String, Vec<MetricRecord>>,
    histories: HashMap<String, StoredHistory>,
}

impl InMemoryRecordsStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records for a user
    #[must_use]
    pub fn with_records(
        mut self,
        user_id: impl Into<String>,
        records: impl IntoIterator<Item = MetricRecord>,
    ) -> Self {
        self.records
            .entry(user_id.into())
            .or_default()
            .extend(records);
        self
    }

    /// Register a conversation history under `token`
    #[must_use]
    pub fn with_history(
        mut self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Self {
        self.histories.insert(
            token.into(),
            StoredHistory {
                user_id: user_id.into(),
                messages,
            },
        );
        self
    }

    /// Parse a seed document
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the JSON does not match the seed
    /// format.
    pub fn from_seed_json(json: &str) -> AppResult<Self> {
        let seed: SeedFile = serde_json::from_str(json)?;
        let mut store = Self::new();
        for (user_id, records) in seed.records {
            store = store.with_records(user_id, records);
        }
        for history in seed.histories {
            store = store.with_history(history.token, history.user_id, history.messages);
        }
        Ok(store)
    }

    /// Load a seed file from disk
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file cannot be read and a
    /// serialization error when it cannot be parsed.
    pub async fn from_seed_file(path: &Path) -> AppResult<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::storage(format!(
                "Failed to read records seed {}: {e}",
                path.display()
            ))
            .with_source(e)
        })?;
        let store = Self::from_seed_json(&json)?;
        info!(
            path = %path.display(),
            users = store.records.len(),
            histories = store.histories.len(),
            "Loaded records seed"
        );
        Ok(store)
    }
}

#[async_trait]
impl RecordsStore for InMemoryRecordsStore {
    async fn query_records(&self, query: &RecordsQuery) -> AppResult<Vec<MetricRecord>> {
        let records: Vec<MetricRecord> = self
            .records
            .get(&query.user_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| query.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            user.id = %query.user_id,
            records = records.len(),
            "Queried fitness records"
        );
        Ok(records)
    }

    async fn conversation_history(
        &self,
        user_id: &str,
        history_token: Option<&str>,
    ) -> AppResult<Vec<ChatMessage>> {
        let Some(token) = history_token else {
            return Ok(Vec::new());
        };

        match self.histories.get(token) {
            Some(history) if history.user_id == user_id => Ok(history.messages.clone()),
            _ => Err(AppError::not_found(format!("History token '{token}'"))),
        }
    }
}
