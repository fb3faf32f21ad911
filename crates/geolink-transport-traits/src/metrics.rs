//! Request counters kept by a transport.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of a transport's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMetrics {
    /// Requests handed to the network
    pub requests_sent: u64,
    /// Requests that resolved to a JSON body
    pub responses_received: u64,
    /// Requests that resolved to a [`TransportError`](crate::TransportError)
    pub failed_requests: u64,
    /// Form body bytes sent
    pub bytes_sent: u64,
    /// Response body bytes received
    pub bytes_received: u64,
    /// Mean time from send to outcome, in milliseconds
    pub average_latency_ms: f64,
    /// Slowest request seen, in milliseconds
    pub max_latency_ms: f64,
}

/// Lock-free counters shared by concurrent requests.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    failed_requests: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    timed_requests: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl AtomicMetrics {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// A request body of `bytes` went out.
    pub fn record_sent(&self, bytes: usize) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// A JSON body of `bytes` came back.
    pub fn record_received(&self, bytes: usize) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// A request failed.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A request finished, successfully or not, after `elapsed`.
    pub fn record_latency(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.timed_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(us, Ordering::Relaxed);
    }

    /// Copy the counters out.
    pub fn snapshot(&self) -> TransportMetrics {
        let timed = self.timed_requests.load(Ordering::Relaxed);
        let total_us = self.total_latency_us.load(Ordering::Relaxed);
        let average_us = if timed == 0 { 0 } else { total_us / timed };

        TransportMetrics {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            average_latency_ms: average_us as f64 / 1000.0,
            max_latency_ms: self.max_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.requests_sent,
            &self.responses_received,
            &self.failed_requests,
            &self.bytes_sent,
            &self.bytes_received,
            &self.timed_requests,
            &self.total_latency_us,
            &self.max_latency_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
