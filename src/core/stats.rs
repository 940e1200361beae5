use std::time::{Instant, SystemTime};

use serde::{Deserialize, Serialize};

/// Snapshot returned by `Engine::status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub uptime_secs: u64,
    pub document_count: usize,
    pub word_count: usize,
    pub barrel_count: u32,
    pub query_count: u64,
    pub ingest_batches: u64,
    pub last_build_time: Option<SystemTime>,
    pub last_ingest_time: Option<SystemTime>,
    pub embedding_loaded: bool,
    pub readiness: Readiness,
}

/// Replaces the process-wide singleton/lazy-global pattern: an explicit
/// state the host reads off the `Engine` value it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    Initializing,
    Ready,
    Degraded,
}

pub(crate) struct Counters {
    pub start_time: Instant,
    pub query_count: std::sync::atomic::AtomicU64,
    pub ingest_batches: std::sync::atomic::AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Counters {
            start_time: Instant::now(),
            query_count: std::sync::atomic::AtomicU64::new(0),
            ingest_batches: std::sync::atomic::AtomicU64::new(0),
        }
    }
}
