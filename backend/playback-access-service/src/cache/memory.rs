/// In-process key-value store
///
/// Expiry is evaluated lazily against the injected [`Clock`], which lets tests
/// simulate TTL elapse. `set_if_absent` holds the shard lock for the whole
/// check-and-write, so it is atomic across tasks.
use super::{CacheResult, KeyValueStore};
use crate::clock::{Clock, SystemClock};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at_millis: Option<i64>,
}

impl MemoryEntry {
    fn is_live(&self, now_millis: i64) -> bool {
        self.expires_at_millis
            .map_or(true, |expires_at| expires_at > now_millis)
    }
}

pub struct MemoryKeyValueStore {
    entries: DashMap<String, MemoryEntry>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryKeyValueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_for(&self, value: &str, ttl: Option<Duration>) -> MemoryEntry {
        MemoryEntry {
            value: value.to_string(),
            expires_at_millis: ttl.map(|ttl| self.clock.now_millis() + ttl.as_millis() as i64),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = self.clock.now_millis();
        let live = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());

        if live.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let entry = self.entry_for(value, ttl);
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let now = self.clock.now_millis();
        let fresh = self.entry_for(value, Some(ttl));

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(fresh);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}
