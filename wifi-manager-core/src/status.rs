//! The two serialized status views shared with read-only consumers.
//!
//! Both views are whole-buffer regenerated on every update, never patched,
//! so a consumer holding the lock always reads a complete, self-consistent
//! document. One mutex guards both buffers; it exists purely for the
//! read/write race between consumers and the manager task.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::traits::{AccessPointRecord, IpInfo};
use crate::{Error, Result};

/// Why the connection status view was regenerated.
///
/// The numeric code is published as the `urc` field and must stay stable:
/// `ConnectionOk` = 0, `UserDisconnect` = 1, `FailedAttempt` = 2,
/// `UnknownDisconnect` = 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    ConnectionOk = 0,
    UserDisconnect = 1,
    FailedAttempt = 2,
    UnknownDisconnect = 3,
}

impl UpdateReason {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Snapshot of the station connection published to consumers.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub ssid: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gw: Ipv4Addr,
    pub reason: UpdateReason,
}

impl StatusSnapshot {
    pub fn connected(ssid: String, addresses: IpInfo) -> Self {
        Self {
            ssid,
            ip: addresses.ip,
            netmask: addresses.netmask,
            gw: addresses.gw,
            reason: UpdateReason::ConnectionOk,
        }
    }

    /// A snapshot without a live association; the address fields render as
    /// `"0"` placeholders.
    pub fn not_connected(ssid: String, reason: UpdateReason) -> Self {
        Self {
            ssid,
            ip: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gw: Ipv4Addr::UNSPECIFIED,
            reason,
        }
    }
}

#[derive(Serialize)]
struct ApEntry<'a> {
    ssid: &'a str,
    chan: u8,
    rssi: i8,
    auth: u8,
}

#[derive(Serialize)]
struct ConnectionEntry<'a> {
    ssid: &'a str,
    ip: String,
    netmask: String,
    gw: String,
    urc: u8,
}

impl<'a> From<&'a StatusSnapshot> for ConnectionEntry<'a> {
    fn from(s: &'a StatusSnapshot) -> Self {
        // 只有连接成功时地址字段才有意义
        let (ip, netmask, gw) = if s.reason == UpdateReason::ConnectionOk {
            (s.ip.to_string(), s.netmask.to_string(), s.gw.to_string())
        } else {
            ("0".to_string(), "0".to_string(), "0".to_string())
        };
        Self {
            ssid: &s.ssid,
            ip,
            netmask,
            gw,
            urc: s.reason.code(),
        }
    }
}

struct Views {
    ap_list_json: String,
    connection_json: String,
}

/// The mutex-guarded serialized views.
pub struct StatusProjection {
    views: Mutex<Views>,
}

impl StatusProjection {
    pub(crate) fn new() -> Self {
        Self {
            views: Mutex::new(Views {
                ap_list_json: "[]".to_string(),
                connection_json: "{}".to_string(),
            }),
        }
    }

    /// Acquire the projection lock within `timeout`.
    ///
    /// The guard unlocks on drop; hold it while reading either view so the
    /// manager task cannot regenerate the buffer mid-read.
    pub async fn lock(&self, timeout: Duration) -> Result<StatusGuard<'_>> {
        match tokio::time::timeout(timeout, self.views.lock()).await {
            Ok(views) => Ok(StatusGuard { views }),
            Err(_) => Err(Error::StatusLock),
        }
    }
}

/// RAII access to the serialized views.
pub struct StatusGuard<'a> {
    views: MutexGuard<'a, Views>,
}

impl StatusGuard<'_> {
    /// JSON array of the last scan's access points, `[]` when none.
    pub fn ap_list_json(&self) -> &str {
        &self.views.ap_list_json
    }

    /// JSON object describing the station connection, `{}` when no station
    /// has ever been configured.
    pub fn connection_json(&self) -> &str {
        &self.views.connection_json
    }

    pub(crate) fn set_access_points(&mut self, records: &[AccessPointRecord]) -> Result<()> {
        let entries: Vec<ApEntry<'_>> = records
            .iter()
            .map(|r| ApEntry {
                ssid: &r.ssid,
                chan: r.channel,
                rssi: r.rssi,
                auth: r.auth.code(),
            })
            .collect();
        self.views.ap_list_json = serde_json::to_string(&entries)?;
        Ok(())
    }

    pub(crate) fn set_connection(&mut self, snapshot: Option<&StatusSnapshot>) -> Result<()> {
        self.views.connection_json = match snapshot {
            Some(s) => serde_json::to_string(&ConnectionEntry::from(s))?,
            None => "{}".to_string(),
        };
        Ok(())
    }
}
