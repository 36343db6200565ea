//! Live sessions keyed by thread id.
//!
//! A session is created on first contact by loading the thread's persisted
//! turns. The store holds at most `capacity` sessions; inserting past that
//! evicts the least recently used one. Eviction only drops the in-memory
//! buffer; persisted turns stay on disk and are reloaded on the next contact.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::memory::{AppendOutcome, ConversationBuffer, JsonTurnStore, Turn};

/// One thread's live conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub thread_id: String,
    pub buffer: ConversationBuffer,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    tick: u64,
}

/// Sessions plus the store they persist through.
#[derive(Debug)]
pub struct SessionStore {
    memory: JsonTurnStore,
    capacity: usize,
    sessions: HashMap<String, Session>,
    clock: u64,
}

impl SessionStore {
    /// `capacity` is clamped to at least one session.
    pub fn new(memory: JsonTurnStore, capacity: usize) -> Self {
        Self {
            memory,
            capacity: capacity.max(1),
            sessions: HashMap::new(),
            clock: 0,
        }
    }

    pub fn memory(&self) -> &JsonTurnStore {
        &self.memory
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// The session for `thread_id`, loading persisted turns on first contact.
    pub fn get_or_create(&mut self, thread_id: &str) -> &mut Session {
        let tick = self.next_tick();
        if !self.sessions.contains_key(thread_id) && self.sessions.len() >= self.capacity {
            self.evict_lru();
        }

        let memory = &self.memory;
        let session = self
            .sessions
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                let turns = memory.load(thread_id);
                info!(thread_id, turns = turns.len(), "session created");
                let now = Utc::now();
                Session {
                    thread_id: thread_id.to_string(),
                    buffer: ConversationBuffer::from_turns(&turns),
                    created_at: now,
                    last_accessed: now,
                    tick,
                }
            });
        session.tick = tick;
        session.last_accessed = Utc::now();
        session
    }

    /// Append a finished exchange to the session buffer and persist it.
    ///
    /// An exchange with an empty side is kept out of both the buffer and the
    /// file. Otherwise the buffer records it and the file skips it only when it
    /// repeats the thread's latest turn.
    pub fn record(&mut self, thread_id: &str, user: &str, agent: &str) -> Result<AppendOutcome> {
        if !Turn::new(user, agent).is_complete() {
            debug!(thread_id, "exchange has an empty side; not recorded");
            return Ok(AppendOutcome::Skipped);
        }
        self.get_or_create(thread_id).buffer.save_context(user, agent);
        self.memory.append(thread_id, user, agent)
    }

    /// Drop a session from memory. Returns whether it was present.
    pub fn evict(&mut self, thread_id: &str) -> bool {
        let removed = self.sessions.remove(thread_id).is_some();
        if removed {
            debug!(thread_id, "session evicted");
        }
        removed
    }

    fn evict_lru(&mut self) {
        let lru = self
            .sessions
            .values()
            .min_by_key(|s| s.tick)
            .map(|s| s.thread_id.clone());
        if let Some(thread_id) = lru {
            info!(thread_id, "evicting least recently used session");
            self.sessions.remove(&thread_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.sessions.contains_key(thread_id)
    }

    pub fn get(&self, thread_id: &str) -> Option<&Session> {
        self.sessions.get(thread_id)
    }

    /// Live thread ids, most recently used first.
    pub fn thread_ids(&self) -> Vec<&str> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.tick.cmp(&a.tick));
        sessions.into_iter().map(|s| s.thread_id.as_str()).collect()
    }
}
