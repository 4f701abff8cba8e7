//! Relay session models
//!
//! `SessionStats` is shared between a session's body stream (the only
//! writer) and the active-stream registry (readers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Which streaming route created the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Resolved media relayed through `/stream`
    Stream,
    /// Arbitrary internet radio relayed through `/radio-stream`
    Radio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stream => write!(f, "stream"),
            StreamKind::Radio => write!(f, "radio"),
        }
    }
}

/// Relay session lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SessionState {
    Starting,
    Streaming,
    Draining,
    Completed,
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Starting => write!(f, "starting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Draining => write!(f, "draining"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug)]
struct Activity {
    state: SessionState,
    last_data_at: Option<DateTime<Utc>>,
}

/// Live counters for one relay session
#[derive(Debug)]
pub struct SessionStats {
    pub id: Uuid,
    pub kind: StreamKind,
    pub source_url: String,
    pub started_at: DateTime<Utc>,
    bytes_sent: AtomicU64,
    chunks_sent: AtomicU64,
    activity: Mutex<Activity>,
}

impl SessionStats {
    pub fn new(kind: StreamKind, source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            source_url: source_url.into(),
            started_at: Utc::now(),
            bytes_sent: AtomicU64::new(0),
            chunks_sent: AtomicU64::new(0),
            activity: Mutex::new(Activity {
                state: SessionState::Starting,
                last_data_at: None,
            }),
        }
    }

    /// Count one chunk handed to the client
    pub fn record_chunk(&self, len: usize) {
        self.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut activity) = self.activity.lock() {
            activity.last_data_at = Some(Utc::now());
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent.load(Ordering::Relaxed)
    }

    /// Move to `state`; terminal states are never left
    pub fn set_state(&self, state: SessionState) {
        if let Ok(mut activity) = self.activity.lock() {
            if !activity.state.is_terminal() {
                activity.state = state;
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.activity
            .lock()
            .map(|a| a.state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().state.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (state, last_data_at) = match self.activity.lock() {
            Ok(a) => (a.state.clone(), a.last_data_at),
            Err(poisoned) => {
                let a = poisoned.into_inner();
                (a.state.clone(), a.last_data_at)
            }
        };

        SessionSnapshot {
            id: self.id,
            kind: self.kind,
            source_url: self.source_url.clone(),
            state: state.to_string(),
            bytes_sent: self.bytes_sent(),
            chunks_sent: self.chunks_sent(),
            started_at: self.started_at,
            last_data_at,
            uptime_seconds: (Utc::now() - self.started_at).num_seconds().max(0),
        }
    }
}

/// Serializable view of a session for the management API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub kind: StreamKind,
    pub source_url: String,
    pub state: String,
    pub bytes_sent: u64,
    pub chunks_sent: u64,
    pub started_at: DateTime<Utc>,
    pub last_data_at: Option<DateTime<Utc>>,
    pub uptime_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_chunk_updates_counters() {
        let stats = SessionStats::new(StreamKind::Radio, "https://radio.example/live");
        stats.record_chunk(100);
        stats.record_chunk(28);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.bytes_sent, 128);
        assert_eq!(snapshot.chunks_sent, 2);
        assert!(snapshot.last_data_at.is_some());
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let stats = SessionStats::new(StreamKind::Stream, "https://example.com/a");
        stats.set_state(SessionState::Streaming);
        stats.set_state(SessionState::Failed("403".to_string()));
        stats.set_state(SessionState::Completed);
        assert_eq!(stats.state(), SessionState::Failed("403".to_string()));
    }
}
