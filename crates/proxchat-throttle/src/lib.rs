//! Trailing-edge throttle for high-frequency proxchat events.
//!
//! Player movement arrives from game backends far faster than anyone can
//! hear the difference. The throttle bounds the outbound rate to one update
//! per interval *per tracked entity* while guaranteeing that the last value
//! in every window is delivered:
//!
//! ```text
//! interval = 100ms
//! offers:     0   10  20                 200
//! deliveries:             100 (value@20)           300 (value@200)
//! ```
//!
//! The first offer while idle opens a window; later offers inside the window
//! replace the pending value; when the window closes the pending value is
//! delivered and the entity is idle again. There is no leading-edge
//! delivery.
//!
//! # Time
//!
//! All bookkeeping takes `now` explicitly ([`ThrottleMap::offer`],
//! [`ThrottleMap::poll`]), so tests can walk a simulated clock without
//! sleeping. For real use, [`ThrottleMap::wait_due`] sleeps on the Tokio timer
//! until the earliest window closes and is meant to sit in a
//! `tokio::select!` loop next to the event source:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         frame = conn.recv() => {
//!             if let Some((name, pose)) = decode(frame) {
//!                 throttle.offer(Instant::now(), name, pose);
//!             }
//!         }
//!         due = throttle.wait_due() => {
//!             for (name, pose) in due { emit(name, pose); }
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum time between two deliveries for the same entity.
    /// `Duration::ZERO` turns the throttle into a pass-through.
    pub interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
        }
    }
}

impl ThrottleConfig {
    /// Longest accepted interval. Longer windows would make poses visibly stale.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(10);

    /// Create a config from an interval in milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(ms),
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ThrottleMap::new`].
    pub fn validated(mut self) -> Self {
        if self.interval > Self::MAX_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                max_ms = Self::MAX_INTERVAL.as_millis() as u64,
                "throttle interval exceeds maximum, clamping"
            );
            self.interval = Self::MAX_INTERVAL;
        }
        self
    }

    /// Whether values pass straight through without coalescing.
    pub fn is_passthrough(&self) -> bool {
        self.interval.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Offer result
// ---------------------------------------------------------------------------

/// What happened to an offered value.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer<T> {
    /// Pass-through mode: deliver this value now.
    Immediate(T),
    /// The entity was idle; a window opened and closes at `deadline`.
    Scheduled { deadline: Instant },
    /// A window was already open; the pending value was replaced.
    Coalesced,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters for a throttle's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleMetrics {
    /// Values offered.
    pub offered: u64,
    /// Values delivered (through `poll`, `wait_due`, `flush`, or pass-through).
    pub delivered: u64,
    /// Values replaced by a later offer before delivery.
    pub coalesced: u64,
}

// ---------------------------------------------------------------------------
// ThrottleMap
// ---------------------------------------------------------------------------

struct Pending<T> {
    value: T,
    deadline: Instant,
    /// Window-open order, breaks ties between equal deadlines.
    seq: u64,
}

/// Trailing-edge throttle keeping one independent window per key.
///
/// Keys are whatever identifies the tracked entity (a player name for
/// movement). Two keys never coalesce into each other.
pub struct ThrottleMap<K, T> {
    config: ThrottleConfig,
    pending: HashMap<K, Pending<T>>,
    next_seq: u64,
    metrics: ThrottleMetrics,
}

impl<K, T> ThrottleMap<K, T>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty throttle from config.
    pub fn new(config: ThrottleConfig) -> Self {
        let config = config.validated();
        if config.is_passthrough() {
            debug!("throttle created in pass-through mode");
        } else {
            debug!(
                interval_ms = config.interval.as_millis() as u64,
                "throttle created"
            );
        }
        Self {
            config,
            pending: HashMap::new(),
            next_seq: 0,
            metrics: ThrottleMetrics::default(),
        }
    }

    /// Create a throttle with the given interval in milliseconds.
    pub fn with_interval_ms(ms: u64) -> Self {
        Self::new(ThrottleConfig::from_millis(ms))
    }

    /// Offer a value for `key` at time `now`.
    pub fn offer(&mut self, now: Instant, key: K, value: T) -> Offer<T> {
        self.metrics.offered += 1;

        if self.config.is_passthrough() {
            self.metrics.delivered += 1;
            return Offer::Immediate(value);
        }

        if let Some(slot) = self.pending.get_mut(&key) {
            slot.value = value;
            self.metrics.coalesced += 1;
            return Offer::Coalesced;
        }

        let deadline = now + self.config.interval;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            Pending {
                value,
                deadline,
                seq,
            },
        );
        Offer::Scheduled { deadline }
    }

    /// Take every value whose window has closed by `now`.
    ///
    /// Deliveries come back in deadline order; entities whose windows
    /// closed at the same instant come back in the order their windows
    /// opened.
    pub fn poll(&mut self, now: Instant) -> Vec<(K, T)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        self.take(due)
    }

    /// Take every pending value regardless of its deadline.
    ///
    /// Used when the source shuts down so the last state is not lost.
    pub fn flush(&mut self) -> Vec<(K, T)> {
        let all: Vec<K> = self.pending.keys().cloned().collect();
        self.take(all)
    }

    /// Earliest instant at which [`poll`](Self::poll) will return something.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Wait until the earliest open window closes, then deliver everything due.
    ///
    /// Pends forever while nothing is pending, so it never wins a
    /// `tokio::select!` on its own. Cancel-safe: dropping the future before
    /// it resolves loses nothing.
    pub async fn wait_due(&mut self) -> Vec<(K, T)> {
        let Some(deadline) = self.next_deadline() else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(deadline).await;
        self.poll(Instant::now())
    }

    /// Number of entities with an open window.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no window is open.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshot of lifetime counters.
    pub fn metrics(&self) -> &ThrottleMetrics {
        &self.metrics
    }

    /// The configured (validated) interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    fn take(&mut self, keys: Vec<K>) -> Vec<(K, T)> {
        let mut out: Vec<(K, Pending<T>)> = keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        out.sort_by_key(|(_, p)| (p.deadline, p.seq));
        self.metrics.delivered += out.len() as u64;
        if !out.is_empty() {
            trace!(count = out.len(), "throttle delivered");
        }
        out.into_iter().map(|(k, p)| (k, p.value)).collect()
    }
}

// ---------------------------------------------------------------------------
// Throttle (single entity)
// ---------------------------------------------------------------------------

/// Trailing-edge throttle around a single emission stream.
///
/// A [`ThrottleMap`] with exactly one key.
pub struct Throttle<T> {
    inner: ThrottleMap<(), T>,
}

impl<T> Throttle<T> {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            inner: ThrottleMap::new(config),
        }
    }

    pub fn with_interval_ms(ms: u64) -> Self {
        Self::new(ThrottleConfig::from_millis(ms))
    }

    /// See [`ThrottleMap::offer`].
    pub fn offer(&mut self, now: Instant, value: T) -> Offer<T> {
        self.inner.offer(now, (), value)
    }

    /// The pending value, if its window has closed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        self.inner.poll(now).pop().map(|(_, v)| v)
    }

    /// The pending value regardless of deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.inner.flush().pop().map(|(_, v)| v)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.next_deadline()
    }

    /// See [`ThrottleMap::wait_due`].
    pub async fn wait_due(&mut self) -> T {
        loop {
            if let Some((_, value)) = self.inner.wait_due().await.pop() {
                return value;
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn metrics(&self) -> &ThrottleMetrics {
        self.inner.metrics()
    }
}
