//! In-process connection store.
//!
//! Holds each user's connections in insertion order plus the (currently
//! unused) episode list. Everything lives in process memory and is gone on
//! restart; a graph backend is expected to replace it.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::StoreError;
use crate::models::connection::{connection_id, ConnectionRecord, ConnectionRequest};
use crate::models::Episode;

#[derive(Debug, Default)]
struct StoreInner {
    connections: HashMap<String, Vec<ConnectionRecord>>,
    episodes: Vec<Episode>,
    /// Last microsecond tick handed out as an id suffix.
    last_tick: i64,
}

impl StoreInner {
    /// Wall-clock microseconds, bumped past the previous tick when the clock
    /// has not moved (or went backwards).
    fn next_tick(&mut self, now_micros: i64) -> i64 {
        let tick = if now_micros > self.last_tick {
            now_micros
        } else {
            self.last_tick + 1
        };
        self.last_tick = tick;
        tick
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `request` and append it to the user's sequence.
    ///
    /// Id generation, sequence creation and the append happen under a single
    /// write guard.
    pub fn add_connection(
        &self,
        request: ConnectionRequest,
    ) -> Result<ConnectionRecord, StoreError> {
        let mut inner = self.inner.write()?;

        let tick = inner.next_tick(Utc::now().timestamp_micros());
        let id = connection_id(&request.user_id, tick);
        let record = ConnectionRecord::from_request(id, request);

        let entries = inner
            .connections
            .entry(record.user_id.clone())
            .or_default();
        entries.push(record.clone());

        tracing::debug!(
            user_id = %record.user_id,
            connection_id = %record.id,
            count = entries.len(),
            "connection appended"
        );

        Ok(record)
    }

    /// Snapshot of one user's connections, oldest first. Unknown users yield
    /// an empty list.
    pub fn connections_for(&self, user_id: &str) -> Result<Vec<ConnectionRecord>, StoreError> {
        let inner = self.inner.read()?;
        Ok(inner.connections.get(user_id).cloned().unwrap_or_default())
    }

    pub fn connection_count(&self, user_id: &str) -> Result<usize, StoreError> {
        let inner = self.inner.read()?;
        Ok(inner.connections.get(user_id).map_or(0, Vec::len))
    }

    pub fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read()?.connections.len())
    }

    pub fn total_connections(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read()?;
        Ok(inner.connections.values().map(Vec::len).sum())
    }

    pub fn episodes(&self) -> Result<Vec<Episode>, StoreError> {
        Ok(self.inner.read()?.episodes.clone())
    }
}
