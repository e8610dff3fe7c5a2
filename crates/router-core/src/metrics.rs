//! Metrics hooks for adapter operations
//!
//! Adapters never touch process-wide counters. They are handed an
//! [`AdapterMetrics`] implementation at construction time and report through it.
//!
//! ## Usage
//!
//! ```ignore
//! use router_core::metrics::{AdapterMetrics, AtomicMetrics, SendOutcome};
//!
//! let metrics = AtomicMetrics::new();
//! metrics.record_send(2);
//! metrics.record_outcome(SendOutcome::Delivered, elapsed);
//! assert_eq!(metrics.snapshot().sends, 1);
//! ```

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Final classification of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendOutcome {
    /// Exactly one recipient answered.
    Delivered,
    /// The packet could not be serialized.
    InvalidPacket,
    /// No answer, but errors were recorded.
    Failed,
    /// Several recipients answered.
    TooManyAnswers,
    /// Nobody answered and nothing failed.
    NoAnswer,
}

impl SendOutcome {
    /// Label used for metric dimensions.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::InvalidPacket => "invalid_packet",
            Self::Failed => "failed",
            Self::TooManyAnswers => "too_many_answers",
            Self::NoAnswer => "no_answer",
        }
    }
}

/// Metrics collector capability injected into adapters.
pub trait AdapterMetrics: Send + Sync {
    /// A send started towards `recipients` recipients.
    fn record_send(&self, recipients: usize);

    /// A send entered its join barrier.
    fn waiting_for_send_inc(&self);

    /// A send left its join barrier.
    fn waiting_for_send_dec(&self);

    /// A send finished.
    fn record_outcome(&self, outcome: SendOutcome, elapsed: Duration);

    /// One recipient of a send failed with an error of `kind`.
    fn record_recipient_error(&self, kind: &'static str);

    /// An inbound message reached a bound handler.
    fn record_inbound(&self);

    /// An inbound request was refused because the funnel was full.
    fn record_funnel_overflow(&self);
}

/// Collector that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl AdapterMetrics for NoOpMetrics {
    fn record_send(&self, _recipients: usize) {}
    fn waiting_for_send_inc(&self) {}
    fn waiting_for_send_dec(&self) {}
    fn record_outcome(&self, _outcome: SendOutcome, _elapsed: Duration) {}
    fn record_recipient_error(&self, _kind: &'static str) {}
    fn record_inbound(&self) {}
    fn record_funnel_overflow(&self) {}
}

/// Lock-free in-process collector.
///
/// Thread-safe counters that can be read back with [`AtomicMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Sends started
    pub sends: AtomicU64,
    /// Recipients addressed across all sends
    pub recipients: AtomicU64,
    /// Sends currently waiting on their join barrier
    pub waiting_for_send: AtomicI64,
    /// Sends that returned a payload
    pub delivered: AtomicU64,
    /// Sends that returned an error
    pub failed: AtomicU64,
    /// Per-recipient errors
    pub recipient_errors: AtomicU64,
    /// Inbound messages dispatched to handlers
    pub inbound: AtomicU64,
    /// Inbound requests refused by a full funnel
    pub funnel_overflows: AtomicU64,
    /// Cumulative send time in nanoseconds
    pub send_time_ns: AtomicU64,
}

impl AtomicMetrics {
    /// Create a new collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current metrics snapshot
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sends: self.sends.load(Ordering::Relaxed),
            recipients: self.recipients.load(Ordering::Relaxed),
            waiting_for_send: self.waiting_for_send.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            recipient_errors: self.recipient_errors.load(Ordering::Relaxed),
            inbound: self.inbound.load(Ordering::Relaxed),
            funnel_overflows: self.funnel_overflows.load(Ordering::Relaxed),
            avg_send_ns: self.avg_send_time_ns(),
        }
    }

    /// Average send time in nanoseconds
    #[must_use]
    pub fn avg_send_time_ns(&self) -> u64 {
        let total = self.send_time_ns.load(Ordering::Relaxed);
        let count = self.delivered.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }
}

impl AdapterMetrics for AtomicMetrics {
    fn record_send(&self, recipients: usize) {
        self.sends.fetch_add(1, Ordering::Relaxed);
        self.recipients
            .fetch_add(recipients as u64, Ordering::Relaxed);
    }

    fn waiting_for_send_inc(&self) {
        self.waiting_for_send.fetch_add(1, Ordering::Relaxed);
    }

    fn waiting_for_send_dec(&self) {
        self.waiting_for_send.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_outcome(&self, outcome: SendOutcome, elapsed: Duration) {
        match outcome {
            SendOutcome::Delivered => self.delivered.fetch_add(1, Ordering::Relaxed),
            _ => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        self.send_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn record_recipient_error(&self, _kind: &'static str) {
        self.recipient_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::Relaxed);
    }

    fn record_funnel_overflow(&self) {
        self.funnel_overflows.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of [`AtomicMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sends: u64,
    pub recipients: u64,
    pub waiting_for_send: i64,
    pub delivered: u64,
    pub failed: u64,
    pub recipient_errors: u64,
    pub inbound: u64,
    pub funnel_overflows: u64,
    pub avg_send_ns: u64,
}
