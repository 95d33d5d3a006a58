//! In-memory durable queue and checkpoint store

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use outpost_common::time::{Clock, MockClock};
use outpost_core::{CheckpointStore, DurableQueue};
use outpost_domain::{EntryId, OutpostError, QueueEntry, Result as DomainResult, StreamStats};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    next_id: i64,
    entries: Vec<QueueEntry>,
    checkpoints: HashMap<String, String>,
    fail_next_appends: u32,
    append_calls: u32,
}

/// Queue backed by a `Vec`. `created_at`/`delivered_at` come from the
/// supplied mock clock.
pub struct InMemoryQueue {
    clock: MockClock,
    state: Mutex<State>,
}

impl InMemoryQueue {
    pub fn new(clock: MockClock) -> Self {
        Self { clock, state: Mutex::new(State { next_id: 1, ..State::default() }) }
    }

    /// The next `n` appends fail with a database error.
    pub fn fail_next_appends(&self, n: u32) {
        self.state.lock().fail_next_appends = n;
    }

    pub fn append_calls(&self) -> u32 {
        self.state.lock().append_calls
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        self.state.lock().entries.clone()
    }

    pub fn entries_for(&self, stream: &str) -> Vec<QueueEntry> {
        self.entries().into_iter().filter(|e| e.stream_name == stream).collect()
    }

    /// Insert an entry directly, bypassing failure injection.
    pub fn seed(&self, stream: &str, payload: &[u8]) -> EntryId {
        let created_at = self.clock.utc_now();
        let mut state = self.state.lock();
        let id = EntryId(state.next_id);
        state.next_id += 1;
        state.entries.push(QueueEntry {
            id,
            stream_name: stream.to_string(),
            payload: payload.to_vec(),
            created_at,
            delivered_at: None,
            attempt_count: 0,
        });
        id
    }
}

#[async_trait]
impl DurableQueue for InMemoryQueue {
    async fn append(&self, stream: &str, payload: &[u8]) -> DomainResult<EntryId> {
        {
            let mut state = self.state.lock();
            state.append_calls += 1;
            if state.fail_next_appends > 0 {
                state.fail_next_appends -= 1;
                return Err(OutpostError::Database("database is locked".into()));
            }
        }
        Ok(self.seed(stream, payload))
    }

    async fn list_pending(&self, stream: &str, limit: usize) -> DomainResult<Vec<QueueEntry>> {
        let state = self.state.lock();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.stream_name == stream && e.delivered_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, ids: &[EntryId]) -> DomainResult<usize> {
        let now = self.clock.utc_now();
        let mut state = self.state.lock();
        let mut changed = 0;
        for entry in state.entries.iter_mut() {
            if ids.contains(&entry.id) && entry.delivered_at.is_none() {
                entry.delivered_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn record_attempt(&self, ids: &[EntryId]) -> DomainResult<usize> {
        let mut state = self.state.lock();
        let mut changed = 0;
        for entry in state.entries.iter_mut() {
            if ids.contains(&entry.id) && entry.delivered_at.is_none() {
                entry.attempt_count += 1;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn cleanup(&self, stream: &str, retention: Duration) -> DomainResult<usize> {
        let cutoff = self.clock.utc_now() - chrono::Duration::from_std(retention).unwrap();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| {
            !(e.stream_name == stream && e.delivered_at.is_some() && e.created_at < cutoff)
        });
        Ok(before - state.entries.len())
    }

    async fn pending_count(&self, stream: &str) -> DomainResult<u64> {
        let state = self.state.lock();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.stream_name == stream && e.delivered_at.is_none())
            .count() as u64)
    }

    async fn stats(&self) -> DomainResult<Vec<StreamStats>> {
        let state = self.state.lock();
        let mut by_stream: HashMap<&str, StreamStats> = HashMap::new();
        for entry in &state.entries {
            let stats = by_stream.entry(&entry.stream_name).or_insert_with(|| StreamStats {
                stream_name: entry.stream_name.clone(),
                ..StreamStats::default()
            });
            if entry.is_delivered() {
                stats.delivered += 1;
            } else {
                stats.pending += 1;
                if stats.oldest_pending_at.map_or(true, |t| entry.created_at < t) {
                    stats.oldest_pending_at = Some(entry.created_at);
                }
            }
        }
        let mut stats: Vec<_> = by_stream.into_values().collect();
        stats.sort_by(|a, b| a.stream_name.cmp(&b.stream_name));
        Ok(stats)
    }
}

#[async_trait]
impl CheckpointStore for InMemoryQueue {
    async fn load_checkpoint(&self, stream: &str) -> DomainResult<Option<String>> {
        Ok(self.state.lock().checkpoints.get(stream).cloned())
    }

    async fn store_checkpoint(&self, stream: &str, checkpoint: &str) -> DomainResult<()> {
        self.state.lock().checkpoints.insert(stream.to_string(), checkpoint.to_string());
        Ok(())
    }
}
