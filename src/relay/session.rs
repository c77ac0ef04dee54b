//! Relay Session

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared activity counter for one pair
///
/// Bumped once per successful read in either direction. Copiers only ask
/// whether it moved since their last snapshot, so relaxed ordering suffices.
#[derive(Debug, Clone, Default)]
pub struct LivenessCounter {
    value: Arc<AtomicU64>,
}

impl LivenessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value
    pub fn snapshot(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Record one unit of activity
    pub fn bump(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether any activity was recorded after `snapshot` was taken
    pub fn changed_since(&self, snapshot: u64) -> bool {
        self.snapshot() != snapshot
    }
}

/// Direction of a copier within its pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::LeftToRight => write!(f, "left->right"),
            Direction::RightToLeft => write!(f, "right->left"),
        }
    }
}

/// Bookkeeping for one active pair
#[derive(Debug)]
pub struct PairSession {
    pub pair_id: String,
    pub left_addr: String,
    pub right_addr: String,
    pub start_time: Instant,
    pub liveness: LivenessCounter,
    bytes_left_to_right: AtomicU64,
    bytes_right_to_left: AtomicU64,
}

/// Statistics for a finished pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    pub pair_id: String,
    pub left_addr: String,
    pub right_addr: String,
    pub start_time: SystemTime,
    pub duration_ms: u64,
    pub bytes_left_to_right: u64,
    pub bytes_right_to_left: u64,
    pub total_bytes: u64,
    /// Final liveness counter value, i.e. the number of forwarded reads
    pub activity: u64,
}

impl PairSession {
    pub fn new(left_addr: String, right_addr: String) -> Self {
        let pair_id = format!("pair_{}", Uuid::new_v4().simple());
        debug!("Creating relay pair: {} ({} <=> {})", pair_id, left_addr, right_addr);

        Self {
            pair_id,
            left_addr,
            right_addr,
            start_time: Instant::now(),
            liveness: LivenessCounter::new(),
            bytes_left_to_right: AtomicU64::new(0),
            bytes_right_to_left: AtomicU64::new(0),
        }
    }

    /// Add forwarded bytes to the counter for `direction`
    pub fn add_bytes(&self, direction: Direction, bytes: u64) {
        let counter = match direction {
            Direction::LeftToRight => &self.bytes_left_to_right,
            Direction::RightToLeft => &self.bytes_right_to_left,
        };
        counter.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn bytes_left_to_right(&self) -> u64 {
        self.bytes_left_to_right.load(Ordering::Relaxed)
    }

    pub fn bytes_right_to_left(&self) -> u64 {
        self.bytes_right_to_left.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_left_to_right() + self.bytes_right_to_left()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Generate pair statistics
    pub fn to_stats(&self) -> PairStats {
        let duration = self.duration();
        let start_time = SystemTime::now() - duration;

        PairStats {
            pair_id: self.pair_id.clone(),
            left_addr: self.left_addr.clone(),
            right_addr: self.right_addr.clone(),
            start_time,
            duration_ms: duration.as_millis() as u64,
            bytes_left_to_right: self.bytes_left_to_right(),
            bytes_right_to_left: self.bytes_right_to_left(),
            total_bytes: self.total_bytes(),
            activity: self.liveness.snapshot(),
        }
    }

    /// Log final pair statistics
    pub fn log_stats(&self) {
        let stats = self.to_stats();
        info!(
            pair_id = %stats.pair_id,
            left_addr = %stats.left_addr,
            right_addr = %stats.right_addr,
            duration_ms = stats.duration_ms,
            bytes_left_to_right = stats.bytes_left_to_right,
            bytes_right_to_left = stats.bytes_right_to_left,
            total_bytes = stats.total_bytes,
            activity = stats.activity,
            "Relay pair statistics"
        );
    }
}
