//! Active stream registry and concurrency limits
//!
//! The registry is the only state shared between sessions. Each session
//! holds a `StreamHandle`; dropping it removes the session, so every exit
//! path (completion, failure, client disconnect) cleans up.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{SessionSnapshot, SessionStats};

type SessionMap = Arc<RwLock<HashMap<Uuid, Arc<SessionStats>>>>;

pub struct ActiveStreams {
    sessions: SessionMap,
    streams: Arc<Semaphore>,
    max_streams: usize,
    lookups: Arc<Semaphore>,
    max_lookups: usize,
}

impl ActiveStreams {
    pub fn new(max_streams: usize, max_lookups: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            streams: Arc::new(Semaphore::new(max_streams)),
            max_streams,
            lookups: Arc::new(Semaphore::new(max_lookups)),
            max_lookups,
        }
    }

    /// Claim a stream slot before any resolving or spawning.
    ///
    /// The slot is held until the session's `StreamHandle` is dropped, so a
    /// request that wins a slot cannot lose it to a slow resolve.
    pub fn reserve(&self) -> Result<StreamSlot, AppError> {
        let permit = self
            .streams
            .clone()
            .try_acquire_owned()
            .map_err(|_| AppError::Capacity {
                resource: "streams".to_string(),
                limit: self.max_streams,
            })?;

        Ok(StreamSlot {
            sessions: self.sessions.clone(),
            permit,
        })
    }

    /// Reserve a slot for a resolver or search lookup
    pub fn try_acquire_lookup(&self) -> Result<OwnedSemaphorePermit, AppError> {
        self.lookups
            .clone()
            .try_acquire_owned()
            .map_err(|_| AppError::Capacity {
                resource: "lookups".to_string(),
                limit: self.max_lookups,
            })
    }

    /// Sessions with a running transcoder
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn max_streams(&self) -> usize {
        self.max_streams
    }

    /// Snapshots ordered by start time
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> = match self.sessions.read() {
            Ok(sessions) => sessions.values().map(|s| s.snapshot()).collect(),
            Err(_) => Vec::new(),
        };
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }
}

/// A claimed stream slot that has no session yet
#[derive(Debug)]
pub struct StreamSlot {
    sessions: SessionMap,
    permit: OwnedSemaphorePermit,
}

impl StreamSlot {
    /// Attach a session to this slot and list it in the registry
    pub fn register(self, stats: Arc<SessionStats>) -> StreamHandle {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(stats.id, stats.clone());
        debug!(
            "Registered session_id={} kind={} active={}",
            stats.id,
            stats.kind,
            sessions.len()
        );
        drop(sessions);

        StreamHandle {
            sessions: self.sessions,
            stats,
            _permit: self.permit,
        }
    }
}

/// Registration of one live session; removes it and frees its slot when dropped
#[derive(Debug)]
pub struct StreamHandle {
    sessions: SessionMap,
    stats: Arc<SessionStats>,
    _permit: OwnedSemaphorePermit,
}

impl StreamHandle {
    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&self.stats.id);
        debug!(
            "Released session_id={} bytes_sent={} active={}",
            self.stats.id,
            self.stats.bytes_sent(),
            sessions.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamKind;

    fn stats() -> Arc<SessionStats> {
        Arc::new(SessionStats::new(StreamKind::Stream, "https://cdn.example/a"))
    }

    #[test]
    fn test_register_and_release() {
        let registry = ActiveStreams::new(2, 1);
        let first = registry.reserve().unwrap().register(stats());
        let _second = registry.reserve().unwrap().register(stats());
        assert_eq!(registry.count(), 2);

        let err = registry.reserve().unwrap_err();
        assert!(matches!(err, AppError::Capacity { limit: 2, .. }));

        drop(first);
        assert_eq!(registry.count(), 1);
        assert!(registry.reserve().is_ok());
    }

    #[test]
    fn test_reserved_slot_is_kept_until_released() {
        let registry = ActiveStreams::new(1, 1);
        let slot = registry.reserve().unwrap();
        assert_eq!(registry.count(), 0);

        // A second request cannot take the slot while the first is still resolving
        assert!(matches!(
            registry.reserve(),
            Err(AppError::Capacity { resource, .. }) if resource == "streams"
        ));

        let handle = slot.register(stats());
        assert_eq!(registry.count(), 1);
        drop(handle);
        assert!(registry.reserve().is_ok());
    }

    #[test]
    fn test_unused_slot_is_returned() {
        let registry = ActiveStreams::new(1, 1);
        drop(registry.reserve().unwrap());
        assert!(registry.reserve().is_ok());
    }

    #[test]
    fn test_list_reports_counters() {
        let registry = ActiveStreams::new(4, 1);
        let handle = registry.reserve().unwrap().register(stats());
        handle.stats().record_chunk(10);

        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].bytes_sent, 10);
    }

    #[test]
    fn test_lookup_permits_are_bounded() {
        let registry = ActiveStreams::new(1, 1);
        let permit = registry.try_acquire_lookup().unwrap();
        assert!(matches!(
            registry.try_acquire_lookup(),
            Err(AppError::Capacity { .. })
        ));
        drop(permit);
        assert!(registry.try_acquire_lookup().is_ok());
    }
}
