//! Supervisor for the manager task.
//!
//! Builds the driver and the credential store, runs the manager, and re-runs
//! it from bootstrap whenever a verified connection asks for a full
//! re-initialization. Fatal manager errors bubble up to `main`; the process
//! owner (systemd, a watchdog) decides what happens next.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wifi_manager_core::backends::mock::MockDriver;
use wifi_manager_core::config::manager_config_from_toml_str;
use wifi_manager_core::manager::{ManagerExit, ManagerHandle, WifiManager};
use wifi_manager_core::store::fs::FsCredentialStore;

// 默认配置编译期内嵌
const CONFIG_TOML: &str = include_str!("../config.toml");

pub async fn run() -> anyhow::Result<()> {
    let config = manager_config_from_toml_str(CONFIG_TOML);

    let store_dir = std::env::var_os("WIFI_MANAGER_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/var/lib/wifi-manager"));
    tracing::info!(store = %store_dir.display(), "Using filesystem credential store");
    let store = Arc::new(FsCredentialStore::new(store_dir));

    loop {
        // 真实部署在这里注入硬件驱动；演示运行使用 mock
        let driver = Arc::new(MockDriver::new());
        let manager = WifiManager::new(driver, store.clone(), config.clone());
        tokio::spawn(report_initial_scan(manager.handle()));

        match manager.run().await {
            Ok(ManagerExit::Restart) => {
                tracing::info!("🔁 Verified connection, re-initializing the manager context");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                tracing::error!("Manager task hit a fatal condition: {}", e);
                return Err(e.into());
            }
        }
    }
}

/// Demo producer: request one scan once the softAP is up and log the list.
async fn report_initial_scan(handle: ManagerHandle) {
    for _ in 0..100 {
        if handle.is_access_point_started() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    handle.request_scan();
    tokio::time::sleep(Duration::from_secs(1)).await;

    match handle.status().lock(Duration::from_millis(500)).await {
        Ok(status) => tracing::info!("📶 Access points: {}", status.ap_list_json()),
        Err(e) => tracing::warn!("Could not read the access-point list: {}", e),
    }
}
