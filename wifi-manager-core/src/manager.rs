//! The connection-lifecycle state machine.
//!
//! Exactly one [`WifiManager::run`] task exists per radio. It is the sole
//! writer of the status projection, the staged credentials and the persisted
//! credential pair; every other execution context interacts with it only by
//! raising request flags and reading the serialized views through a
//! [`ManagerHandle`].
//!
//! 服务顺序：同一次唤醒内 disconnect 优先于 connect；scan 只在两者都不
//! pending 时处理。

use std::sync::{Arc, Mutex};

use crate::config::ManagerConfig;
use crate::credentials::StaCredentials;
use crate::signals::{self, EventSink, Signals};
use crate::status::{StatusProjection, StatusSnapshot, UpdateReason};
use crate::traits::{CredentialStore, WifiDriver};
use crate::{Error, Result};

/// Why the manager task returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerExit {
    /// A station connection was verified and persisted. The supervisor must
    /// tear the whole context down and run a fresh manager from bootstrap so
    /// every downstream consumer re-initializes against the new link.
    Restart,
}

struct Shared {
    signals: Arc<Signals>,
    status: StatusProjection,
    /// Target credentials for the next connect request. Written by
    /// producers, consumed by the manager task.
    staged: Mutex<Option<StaCredentials>>,
}

/// Cloneable producer/consumer handle onto the manager context.
///
/// Requests are fire-and-forget and never block; raising a request that is
/// already pending is a no-op (the two coalesce into one service cycle).
#[derive(Clone)]
pub struct ManagerHandle {
    shared: Arc<Shared>,
}

impl ManagerHandle {
    /// Stage `credentials` as the connection target and request a connect.
    pub fn request_connect(&self, credentials: StaCredentials) {
        *self.shared.staged.lock().unwrap() = Some(credentials);
        self.shared.signals.raise(signals::REQUEST_CONNECT);
    }

    /// Request dropping the station link and forgetting its credentials.
    pub fn request_disconnect(&self) {
        self.shared.signals.raise(signals::REQUEST_DISCONNECT);
    }

    /// Request a fresh scan pass.
    pub fn request_scan(&self) {
        self.shared.signals.raise(signals::REQUEST_SCAN);
    }

    /// The serialized views. Lock before reading.
    pub fn status(&self) -> &StatusProjection {
        &self.shared.status
    }

    pub fn is_station_connected(&self) -> bool {
        self.shared.signals.is_set(signals::STA_CONNECTED)
    }

    pub fn is_access_point_started(&self) -> bool {
        self.shared.signals.is_set(signals::AP_STARTED)
    }

    pub fn is_ap_client_connected(&self) -> bool {
        self.shared.signals.is_set(signals::AP_CLIENT_CONNECTED)
    }
}

/// The manager context: driver, store, configuration and shared state.
pub struct WifiManager {
    driver: Arc<dyn WifiDriver>,
    store: Arc<dyn CredentialStore>,
    config: ManagerConfig,
    shared: Arc<Shared>,
}

impl WifiManager {
    pub fn new(
        driver: Arc<dyn WifiDriver>,
        store: Arc<dyn CredentialStore>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            driver,
            store,
            config,
            shared: Arc::new(Shared {
                signals: Arc::new(Signals::new()),
                status: StatusProjection::new(),
                staged: Mutex::new(None),
            }),
        }
    }

    /// Handle for producers and consumers. Stays valid after the manager
    /// task returns.
    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle {
            shared: self.shared.clone(),
        }
    }

    /// Run the state machine until a verified connection requires a restart
    /// or a fatal condition surfaces.
    ///
    /// Fatal conditions (driver-call failures, acknowledgement timeouts, a
    /// publish-time lock timeout, store write failures) are returned as
    /// errors; the supervisor owns the retry/restart decision.
    pub async fn run(self) -> Result<ManagerExit> {
        self.bootstrap().await?;

        loop {
            let pending = self.shared.signals.wait_any(signals::ALL_REQUESTS).await;

            if pending & signals::REQUEST_DISCONNECT != 0 {
                self.service_disconnect().await?;
            }
            if pending & signals::REQUEST_CONNECT != 0 {
                if let Some(exit) = self.service_connect().await? {
                    return Ok(exit);
                }
            } else if pending & signals::REQUEST_SCAN != 0 {
                self.service_scan().await?;
            }
        }
    }

    async fn bootstrap(&self) -> Result<()> {
        self.driver
            .bind_events(EventSink::new(self.shared.signals.clone()));

        // Previously provisioned credentials request a connection right away.
        if let Some(saved) = self.store.load().await {
            tracing::info!(ssid = %saved.ssid(), "💾 Saved station credentials found, scheduling connect");
            *self.shared.staged.lock().unwrap() = Some(saved);
            self.shared.signals.raise(signals::REQUEST_CONNECT);
        }

        tracing::info!(
            ssid = %self.config.ap.ssid,
            channel = self.config.ap.channel,
            "📡 Starting softAP"
        );
        self.driver.start_access_point(&self.config.ap).await?;
        self.shared
            .signals
            .wait_any_timeout(signals::AP_STARTED, self.config.ack_timeout, "softAP startup")
            .await?;
        tracing::info!("softAP started, entering service loop");
        Ok(())
    }

    /// Drop the station link if one exists, forget the credentials, publish
    /// the outcome.
    async fn service_disconnect(&self) -> Result<()> {
        tracing::info!("Servicing disconnect request");

        if self.shared.signals.is_set(signals::STA_CONNECTED) {
            self.disconnect_and_wait().await?;
        }
        self.shared.signals.clear(signals::STA_DISCONNECTED);

        // 断开即遗忘：内存和持久化凭据一起清除
        let previous = self.shared.staged.lock().unwrap().take();
        self.store.clear().await?;

        let ssid = previous.map(|c| c.ssid().to_string()).unwrap_or_default();
        let snapshot = StatusSnapshot::not_connected(ssid, UpdateReason::UserDisconnect);
        {
            let mut status = self
                .shared
                .status
                .lock(self.config.publish_lock_timeout)
                .await?;
            status.set_connection(Some(&snapshot))?;
        }

        self.shared.signals.clear(signals::REQUEST_DISCONNECT);
        Ok(())
    }

    /// Attempt a connection with the staged credentials. Returns
    /// `Some(ManagerExit::Restart)` once a connection is verified and
    /// persisted.
    async fn service_connect(&self) -> Result<Option<ManagerExit>> {
        let staged = self.shared.staged.lock().unwrap().clone();
        let Some(credentials) = staged else {
            // Producer bug: nothing staged. Drop the request instead of
            // tearing the whole subsystem down.
            tracing::warn!("Connect requested with no staged credentials, ignoring");
            self.shared.signals.clear(signals::REQUEST_CONNECT);
            return Ok(None);
        };
        tracing::info!(ssid = %credentials.ssid(), "Servicing connect request");

        // Already associated somewhere: drop that link first.
        if self.shared.signals.is_set(signals::STA_CONNECTED) {
            self.disconnect_and_wait().await?;
        }
        self.shared.signals.clear(signals::STA_DISCONNECTED);

        self.driver.connect_station(&credentials).await?;

        // Exactly one of two terminal events ends the attempt: the station
        // gets an IP, or the driver reports a disconnect. The reason code of
        // a disconnect is not exploited; a failure is a failure.
        let outcome = self
            .shared
            .signals
            .wait_any_timeout(
                signals::STA_CONNECTED | signals::STA_DISCONNECTED,
                self.config.connect_timeout,
                "connect attempt outcome",
            )
            .await?;

        if outcome & signals::STA_CONNECTED != 0 {
            let addresses = self.driver.station_ip_info().await?;
            let snapshot =
                StatusSnapshot::connected(credentials.ssid().to_string(), addresses);
            {
                let mut status = self
                    .shared
                    .status
                    .lock(self.config.publish_lock_timeout)
                    .await?;
                status.set_connection(Some(&snapshot))?;
            }

            // Persist only once the driver proved the credentials work.
            self.store.save(&credentials).await?;
            self.shared.signals.clear(signals::REQUEST_CONNECT);
            tracing::info!(
                ip = %addresses.ip,
                "✅ Station connected and credentials saved, requesting full restart"
            );
            return Ok(Some(ManagerExit::Restart));
        }

        // Failed attempt. Stored credentials stay untouched and there is no
        // automatic retry; a new external request starts the next attempt.
        tracing::warn!(ssid = %credentials.ssid(), "❌ Connect attempt failed");
        let snapshot = StatusSnapshot::not_connected(
            credentials.ssid().to_string(),
            UpdateReason::FailedAttempt,
        );
        {
            let mut status = self
                .shared
                .status
                .lock(self.config.publish_lock_timeout)
                .await?;
            status.set_connection(Some(&snapshot))?;
        }
        self.shared.signals.clear(signals::REQUEST_CONNECT);
        Ok(None)
    }

    /// Run one scan pass and refresh the access-point view.
    async fn service_scan(&self) -> Result<()> {
        tracing::debug!("Servicing scan request");
        let mut records = self.driver.scan(&self.config.scan).await?;
        // safe guard against a driver returning more than we project
        records.truncate(self.config.max_access_points);
        tracing::debug!(count = records.len(), "Scan pass complete");

        // Consumers may be mid-read; a busy projection just skips this
        // refresh, the next scan request rebuilds the list anyway.
        match self.shared.status.lock(self.config.scan_lock_timeout).await {
            Ok(mut status) => status.set_access_points(&records)?,
            Err(Error::StatusLock) => {
                tracing::warn!("Status projection busy, skipping scan refresh");
            }
            Err(e) => return Err(e),
        }

        self.shared.signals.clear(signals::REQUEST_SCAN);
        Ok(())
    }

    /// Issue a driver disconnect and wait for its acknowledgement event.
    async fn disconnect_and_wait(&self) -> Result<()> {
        self.shared.signals.clear(signals::STA_DISCONNECTED);
        self.driver.disconnect_station().await?;
        self.shared
            .signals
            .wait_any_timeout(
                signals::STA_DISCONNECTED,
                self.config.ack_timeout,
                "station disconnect acknowledgement",
            )
            .await?;
        Ok(())
    }
}
