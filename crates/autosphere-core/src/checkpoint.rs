//! Checkpoint Store
//!
//! Keeps the transcript of each agent run, keyed by a caller-chosen thread.
//! The HTTP path never checkpoints; callers own their history there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Identifier for one checkpointed conversation thread
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Saved state of a thread after its latest run.
///
/// Written for inspection; the agent never replays it into a later run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: ThreadId,

    /// Full transcript of the latest run, tool traffic included
    pub messages: Vec<Message>,

    /// Number of runs recorded for this thread
    pub runs: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkpoint persistence
pub trait CheckpointStore: Send + Sync {
    /// Record the transcript of a finished run
    fn put(&self, thread_id: &ThreadId, messages: Vec<Message>) -> Result<()>;

    /// Load a thread's checkpoint
    fn get(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>>;
}

/// In-memory checkpoint store
#[derive(Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<ThreadId, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AgentError {
    AgentError::Checkpoint("checkpoint lock poisoned".into())
}

impl CheckpointStore for MemoryCheckpointStore {
    fn put(&self, thread_id: &ThreadId, messages: Vec<Message>) -> Result<()> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        let now = Utc::now();

        threads
            .entry(thread_id.clone())
            .and_modify(|cp| {
                cp.messages.clone_from(&messages);
                cp.runs += 1;
                cp.updated_at = now;
            })
            .or_insert_with(|| Checkpoint {
                thread_id: thread_id.clone(),
                messages,
                runs: 1,
                created_at: now,
                updated_at: now,
            });

        Ok(())
    }

    fn get(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().map_err(poisoned)?;
        Ok(threads.get(thread_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCheckpointStore::new();
        let thread = ThreadId::new();

        store.put(&thread, vec![Message::user("hi")]).unwrap();
        store
            .put(&thread, vec![Message::user("hi"), Message::assistant("hello")])
            .unwrap();

        let cp = store.get(&thread).unwrap().unwrap();
        assert_eq!(cp.runs, 2);
        assert_eq!(cp.messages.len(), 2);
        assert_eq!(cp.thread_id, thread);
    }

    #[test]
    fn test_threads_are_isolated() {
        let store = MemoryCheckpointStore::new();
        let a = ThreadId::from_string("a");
        let b = ThreadId::from_string("b");

        store.put(&a, vec![Message::user("from a")]).unwrap();
        assert!(store.get(&b).unwrap().is_none());
        assert_eq!(store.get(&a).unwrap().unwrap().messages[0].content, "from a");
    }
}
