//! A mock driver backend for testing purposes.
//! It simulates the softAP, scanning and station association without any
//! real hardware interaction, reporting lifecycle events through the bound
//! sink exactly the way a radio driver would.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::config::{ApConfig, ScanConfig};
use crate::credentials::StaCredentials;
use crate::signals::EventSink;
use crate::traits::{AccessPointRecord, AuthMode, IpInfo, WifiDriver};
use crate::{Error, Result};

pub struct MockDriver {
    sink: Mutex<Option<EventSink>>,
    networks: Mutex<Vec<AccessPointRecord>>,
    /// SSIDs whose connect attempts fail. 用于模拟密码错误等失败场景。
    failing: Mutex<HashSet<String>>,
    latency: Duration,
    addresses: IpInfo,
    scan_calls: AtomicUsize,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MockDriver {
    pub fn new() -> Self {
        let networks = vec![
            network("MyHomeWiFi", 6, -42, AuthMode::Wpa3Psk),
            network("CafeGuest", 1, -58, AuthMode::Open),
            network("Neighbor's Network", 11, -74, AuthMode::Wpa2Psk),
            network("xfinitywifi", 6, -50, AuthMode::Wpa2Psk),
            network("HiddenNetwork", 3, -80, AuthMode::Wpa2Psk),
        ];
        // xfinitywifi 默认连接失败，便于测试失败分支
        let failing = HashSet::from(["xfinitywifi".to_string()]);
        Self {
            sink: Mutex::new(None),
            networks: Mutex::new(networks),
            failing: Mutex::new(failing),
            latency: Duration::from_millis(10),
            addresses: IpInfo {
                ip: Ipv4Addr::new(192, 168, 0, 42),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
                gw: Ipv4Addr::new(192, 168, 0, 1),
            },
            scan_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the simulated scan inventory wholesale.
    pub fn set_networks(&self, networks: Vec<AccessPointRecord>) {
        *self.networks.lock().unwrap() = networks;
    }

    /// Make connect attempts against `ssid` fail.
    pub fn fail_ssid(&self, ssid: &str) {
        self.failing.lock().unwrap().insert(ssid.to_string());
    }

    /// The sink bound by the manager, for emitting out-of-band events in
    /// tests (e.g. a spontaneous association).
    pub fn event_sink(&self) -> Option<EventSink> {
        self.sink.lock().unwrap().clone()
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    fn bound_sink(&self) -> Result<EventSink> {
        self.event_sink()
            .ok_or_else(|| Error::Driver("event sink not bound".to_string()))
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn network(ssid: &str, channel: u8, rssi: i8, auth: AuthMode) -> AccessPointRecord {
    AccessPointRecord {
        ssid: ssid.to_string(),
        channel,
        rssi,
        auth,
    }
}

#[async_trait]
impl WifiDriver for MockDriver {
    fn bind_events(&self, sink: EventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    async fn start_access_point(&self, config: &ApConfig) -> Result<()> {
        let sink = self.bound_sink()?;
        tracing::info!("🤖 [MockDriver] Starting softAP '{}' (simulated)", config.ssid);
        sleep(self.latency).await;
        // the started event may fire before the manager begins waiting;
        // level-triggered flags absorb that
        sink.ap_started();
        Ok(())
    }

    async fn stop_access_point(&self) -> Result<()> {
        tracing::info!("🤖 [MockDriver] Stopping softAP (simulated)");
        Ok(())
    }

    async fn scan(&self, _config: &ScanConfig) -> Result<Vec<AccessPointRecord>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("🤖 [MockDriver] Scanning for networks...");
        sleep(self.latency).await;
        let networks = self.networks.lock().unwrap().clone();
        tracing::info!("🤖 [MockDriver] Found {} networks", networks.len());
        Ok(networks)
    }

    async fn connect_station(&self, credentials: &StaCredentials) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let sink = self.bound_sink()?;
        let ssid = credentials.ssid().to_string();
        tracing::info!("🤖 [MockDriver] Attempting to connect to '{}'", ssid);
        sleep(self.latency).await;

        if self.failing.lock().unwrap().contains(&ssid) {
            tracing::info!("🤖 [MockDriver] Connection failed to '{}'", ssid);
            sink.station_disconnected();
        } else {
            tracing::info!("🤖 [MockDriver] Connection successful to '{}'", ssid);
            sink.station_got_ip();
        }
        Ok(())
    }

    async fn disconnect_station(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let sink = self.bound_sink()?;
        tracing::info!("🤖 [MockDriver] Disconnecting station (simulated)");
        sleep(self.latency).await;
        sink.station_disconnected();
        Ok(())
    }

    async fn station_ip_info(&self) -> Result<IpInfo> {
        Ok(self.addresses)
    }
}
