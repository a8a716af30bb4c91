//! Level-triggered signal flags coordinating producers, the wireless driver
//! and the manager task.
//!
//! Requests and driver lifecycle notifications share one bit set. A flag
//! stays raised until the manager task explicitly clears it, so a raise that
//! happens before anyone is waiting is never lost, and raising an
//! already-pending flag coalesces into a single service cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::{Error, Result};

/// The station holds an IP and is associated.
pub const STA_CONNECTED: u32 = 1 << 0;
/// At least one client is associated with the softAP.
pub const AP_CLIENT_CONNECTED: u32 = 1 << 1;
/// The softAP finished starting.
pub const AP_STARTED: u32 = 1 << 2;
/// A producer asked for a station connection.
pub const REQUEST_CONNECT: u32 = 1 << 3;
/// The station association dropped (or a requested disconnect completed).
pub const STA_DISCONNECTED: u32 = 1 << 4;
/// A producer asked for a scan.
pub const REQUEST_SCAN: u32 = 1 << 5;
/// A producer asked to drop the station connection and forget it.
pub const REQUEST_DISCONNECT: u32 = 1 << 6;

/// Mask of every producer-raised request flag.
pub const ALL_REQUESTS: u32 = REQUEST_CONNECT | REQUEST_SCAN | REQUEST_DISCONNECT;

pub struct Signals {
    bits: AtomicU32,
    notify: Notify,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            notify: Notify::new(),
        }
    }

    /// Set every bit in `mask` and wake waiters. Idempotent, never blocks.
    pub fn raise(&self, mask: u32) {
        self.bits.fetch_or(mask, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Clear every bit in `mask`. Idempotent.
    pub fn clear(&self, mask: u32) {
        self.bits.fetch_and(!mask, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> u32 {
        self.bits.load(Ordering::SeqCst)
    }

    pub fn is_set(&self, mask: u32) -> bool {
        self.snapshot() & mask != 0
    }

    /// Block the calling task until at least one bit of `mask` is set and
    /// return the satisfied subset.
    ///
    /// Level semantics: bits raised before the wait began satisfy it
    /// immediately.
    pub async fn wait_any(&self, mask: u32) -> u32 {
        loop {
            // 先登记唤醒，再检查位，避免丢失 raise
            let notified = self.notify.notified();
            let hit = self.snapshot() & mask;
            if hit != 0 {
                return hit;
            }
            notified.await;
        }
    }

    /// Same as [`wait_any`](Self::wait_any) but bounded. `what` names the
    /// awaited condition in the resulting [`Error::SignalTimeout`].
    pub async fn wait_any_timeout(
        &self,
        mask: u32,
        timeout: Duration,
        what: &'static str,
    ) -> Result<u32> {
        tokio::time::timeout(timeout, self.wait_any(mask))
            .await
            .map_err(|_| Error::SignalTimeout(what))
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle through which a wireless driver reports its lifecycle events.
///
/// Cheap to clone; callable from any task, thread or callback context.
#[derive(Clone)]
pub struct EventSink {
    signals: Arc<Signals>,
}

impl EventSink {
    pub(crate) fn new(signals: Arc<Signals>) -> Self {
        Self { signals }
    }

    pub fn ap_started(&self) {
        self.signals.raise(AP_STARTED);
    }

    pub fn ap_client_connected(&self) {
        self.signals.raise(AP_CLIENT_CONNECTED);
    }

    pub fn ap_client_disconnected(&self) {
        self.signals.clear(AP_CLIENT_CONNECTED);
    }

    pub fn station_got_ip(&self) {
        self.signals.raise(STA_CONNECTED);
    }

    /// The connected and disconnected bits are mutually exclusive whenever
    /// the manager task inspects them, so the stale bit drops first.
    pub fn station_disconnected(&self) {
        self.signals.clear(STA_CONNECTED);
        self.signals.raise(STA_DISCONNECTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn raise_before_wait_is_not_lost() {
        let signals = Signals::new();
        signals.raise(REQUEST_SCAN);
        // level-triggered: the wait must complete immediately
        let hit = signals
            .wait_any_timeout(ALL_REQUESTS, Duration::from_millis(50), "pending request")
            .await
            .unwrap();
        assert_eq!(hit, REQUEST_SCAN);
    }

    #[tokio::test]
    async fn duplicate_raises_coalesce() {
        let signals = Signals::new();
        signals.raise(REQUEST_CONNECT);
        signals.raise(REQUEST_CONNECT);
        signals.raise(REQUEST_CONNECT);

        let hit = signals.wait_any(REQUEST_CONNECT).await;
        assert_eq!(hit, REQUEST_CONNECT);
        signals.clear(REQUEST_CONNECT);

        // after the single clear nothing is pending anymore
        assert!(!signals.is_set(REQUEST_CONNECT));
    }

    #[tokio::test]
    async fn wait_returns_only_the_satisfied_subset() {
        let signals = Signals::new();
        signals.raise(REQUEST_DISCONNECT | STA_CONNECTED);
        let hit = signals.wait_any(ALL_REQUESTS).await;
        assert_eq!(hit, REQUEST_DISCONNECT);
    }

    #[tokio::test]
    async fn bounded_wait_times_out_with_typed_error() {
        let signals = Signals::new();
        let err = signals
            .wait_any_timeout(AP_STARTED, Duration::from_millis(20), "softAP startup")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SignalTimeout("softAP startup")));
    }

    #[tokio::test]
    async fn raise_wakes_a_parked_waiter() {
        let signals = Arc::new(Signals::new());
        let waiter = {
            let signals = signals.clone();
            tokio::spawn(async move { signals.wait_any(REQUEST_SCAN).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        signals.raise(REQUEST_SCAN);
        assert_eq!(waiter.await.unwrap(), REQUEST_SCAN);
    }

    #[tokio::test]
    async fn station_disconnect_event_clears_connected_bit() {
        let signals = Arc::new(Signals::new());
        let sink = EventSink::new(signals.clone());
        sink.station_got_ip();
        assert!(signals.is_set(STA_CONNECTED));

        sink.station_disconnected();
        assert!(!signals.is_set(STA_CONNECTED));
        assert!(signals.is_set(STA_DISCONNECTED));
    }
}
