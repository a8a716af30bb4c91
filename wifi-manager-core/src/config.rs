//! Runtime configuration for the manager task and the softAP it hosts.
//!
//! Deployments ship a TOML file; every field is optional and falls back to
//! the defaults below.

use std::time::Duration;

use serde::Deserialize;

/// SoftAP parameters handed to the driver at startup.
#[derive(Debug, Clone)]
pub struct ApConfig {
    pub ssid: String,
    /// Empty 表示开放网络 (无密码)
    pub password: String,
    pub channel: u8,
    pub hidden: bool,
    pub max_clients: u8,
    pub beacon_interval_ms: u16,
}

impl Default for ApConfig {
    fn default() -> Self {
        Self {
            ssid: "wifi-setup".to_string(),
            password: String::new(),
            channel: 1,
            hidden: false,
            max_clients: 4,
            beacon_interval_ms: 100,
        }
    }
}

/// Parameters for a single scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub show_hidden: bool,
}

/// Everything the manager task needs to run.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub ap: ApConfig,
    pub scan: ScanConfig,
    /// Scan results beyond this count are discarded.
    pub max_access_points: usize,
    /// Bound on waits for driver acknowledgement events (softAP startup,
    /// disconnect completion). Exceeding it is fatal.
    pub ack_timeout: Duration,
    /// Bound on the wait for the terminal outcome of a connect attempt.
    pub connect_timeout: Duration,
    /// Bound on locking the status projection when publishing a
    /// connect/disconnect outcome. Exceeding it is fatal.
    pub publish_lock_timeout: Duration,
    /// Bound on locking the status projection for a scan refresh. Exceeding
    /// it skips the refresh.
    pub scan_lock_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ap: ApConfig::default(),
            scan: ScanConfig::default(),
            max_access_points: 15,
            ack_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            publish_lock_timeout: Duration::from_secs(5),
            scan_lock_timeout: Duration::from_millis(200),
        }
    }
}

#[derive(Deserialize)]
struct ApConfigFile {
    ap_ssid: Option<String>,
    ap_password: Option<String>,
    ap_channel: Option<u8>,
    ap_hidden: Option<bool>,
    ap_max_clients: Option<u8>,
    ap_beacon_interval_ms: Option<u16>,
}

#[derive(Deserialize)]
struct ManagerConfigFile {
    ap: Option<ApConfigFile>,
    show_hidden: Option<bool>,
    max_access_points: Option<usize>,
    ack_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    publish_lock_timeout_ms: Option<u64>,
    scan_lock_timeout_ms: Option<u64>,
}

impl From<ManagerConfigFile> for ManagerConfig {
    fn from(t: ManagerConfigFile) -> Self {
        let mut out = ManagerConfig::default();
        if let Some(ap) = t.ap {
            if let Some(ssid) = ap.ap_ssid {
                out.ap.ssid = ssid;
            }
            if let Some(password) = ap.ap_password {
                out.ap.password = password;
            }
            if let Some(channel) = ap.ap_channel {
                out.ap.channel = channel;
            }
            if let Some(hidden) = ap.ap_hidden {
                out.ap.hidden = hidden;
            }
            if let Some(max_clients) = ap.ap_max_clients {
                out.ap.max_clients = max_clients;
            }
            if let Some(beacon) = ap.ap_beacon_interval_ms {
                out.ap.beacon_interval_ms = beacon;
            }
        }
        if let Some(show_hidden) = t.show_hidden {
            out.scan.show_hidden = show_hidden;
        }
        if let Some(max) = t.max_access_points {
            out.max_access_points = max;
        }
        if let Some(ms) = t.ack_timeout_ms {
            out.ack_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = t.connect_timeout_ms {
            out.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = t.publish_lock_timeout_ms {
            out.publish_lock_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = t.scan_lock_timeout_ms {
            out.scan_lock_timeout = Duration::from_millis(ms);
        }
        out
    }
}

pub fn manager_config_from_toml_str(s: &str) -> ManagerConfig {
    let parsed: ManagerConfigFile = toml::from_str(s).expect("Failed to parse manager config TOML");
    ManagerConfig::from(parsed)
}
