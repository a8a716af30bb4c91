use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::config::{ApConfig, ScanConfig};
use crate::credentials::StaCredentials;
use crate::signals::EventSink;

// 在这里定义共享的数据结构，和为所有驱动后端与凭据存储定义的 trait。

/// Authentication mode reported for a scanned access point.
///
/// The numeric codes are serialized into the access-point list JSON and must
/// stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
}

impl AuthMode {
    pub fn code(self) -> u8 {
        match self {
            AuthMode::Open => 0,
            AuthMode::Wep => 1,
            AuthMode::WpaPsk => 2,
            AuthMode::Wpa2Psk => 3,
            AuthMode::WpaWpa2Psk => 4,
            AuthMode::Wpa2Enterprise => 5,
            AuthMode::Wpa3Psk => 6,
        }
    }
}

/// Represents a single Wi-Fi network found during a scan.
/// Wi-Fi 扫描时单个网络的具体信息。
#[derive(Debug, Clone)]
pub struct AccessPointRecord {
    pub ssid: String,
    pub channel: u8,
    /// Signal strength in dBm.
    pub rssi: i8,
    pub auth: AuthMode,
}

/// Addresses assigned to the station interface after association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gw: Ipv4Addr,
}

/// Interface to the wireless network driver.
///
/// The manager task is the only caller of the operations; the driver reports
/// its asynchronous lifecycle events through the [`EventSink`] bound at
/// startup. `Send + Sync` 约束是必须的，因为实现将通过 `Arc<dyn WifiDriver>`
/// 在任务间共享。
#[async_trait]
pub trait WifiDriver: Send + Sync {
    /// Hand the driver the sink it must report lifecycle events through.
    /// Called once, before any other operation.
    fn bind_events(&self, sink: EventSink);

    /// Configure and start the softAP. Completion is reported through the
    /// sink's `ap_started` event, not by this call returning.
    async fn start_access_point(&self, config: &ApConfig) -> crate::Result<()>;

    async fn stop_access_point(&self) -> crate::Result<()>;

    /// Run a blocking scan pass and return the found networks in driver
    /// order.
    async fn scan(&self, config: &ScanConfig) -> crate::Result<Vec<AccessPointRecord>>;

    /// Begin an association attempt. Exactly one of `station_got_ip` or
    /// `station_disconnected` follows on the sink.
    async fn connect_station(&self, credentials: &StaCredentials) -> crate::Result<()>;

    /// Drop the current association. Completion is reported through the
    /// sink's `station_disconnected` event.
    async fn disconnect_station(&self) -> crate::Result<()>;

    /// Addresses currently assigned to the station interface. Only
    /// meaningful while associated.
    async fn station_ip_info(&self) -> crate::Result<IpInfo>;
}

/// Persistent storage for the station credential pair.
///
/// Only the manager task touches the store, so implementations do not need
/// to coordinate concurrent writers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Previously saved credentials, if any. Absence and corruption both
    /// yield `None`; loading never hard-fails.
    async fn load(&self) -> Option<StaCredentials>;

    /// Persist the pair. All-or-nothing: a later `load` observes either the
    /// complete new pair or the previous state.
    async fn save(&self, credentials: &StaCredentials) -> crate::Result<()>;

    /// Remove all persisted state for this subsystem.
    async fn clear(&self) -> crate::Result<()>;
}
