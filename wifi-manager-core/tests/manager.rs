//! End-to-end behavior of the manager task against the mock driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use wifi_manager_core::backends::mock::MockDriver;
use wifi_manager_core::config::ManagerConfig;
use wifi_manager_core::credentials::StaCredentials;
use wifi_manager_core::manager::{ManagerExit, ManagerHandle, WifiManager};
use wifi_manager_core::store::memory::MemoryStore;
use wifi_manager_core::traits::{AccessPointRecord, AuthMode};

fn test_config() -> ManagerConfig {
    ManagerConfig {
        ack_timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(2),
        publish_lock_timeout: Duration::from_secs(1),
        scan_lock_timeout: Duration::from_millis(100),
        ..ManagerConfig::default()
    }
}

fn build(
    driver: MockDriver,
    store: MemoryStore,
    config: ManagerConfig,
) -> (WifiManager, ManagerHandle, Arc<MockDriver>, Arc<MemoryStore>) {
    let driver = Arc::new(driver);
    let store = Arc::new(store);
    let manager = WifiManager::new(driver.clone(), store.clone(), config);
    let handle = manager.handle();
    (manager, handle, driver, store)
}

async fn connection_json(handle: &ManagerHandle) -> String {
    handle
        .status()
        .lock(Duration::from_secs(1))
        .await
        .unwrap()
        .connection_json()
        .to_string()
}

async fn ap_list_json(handle: &ManagerHandle) -> String {
    handle
        .status()
        .lock(Duration::from_secs(1))
        .await
        .unwrap()
        .ap_list_json()
        .to_string()
}

async fn wait_for_ap_started(handle: &ManagerHandle) {
    for _ in 0..400 {
        if handle.is_access_point_started() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("softAP never started");
}

async fn wait_for_connection_json_contains(handle: &ManagerHandle, needle: &str) {
    for _ in 0..400 {
        if connection_json(handle).await.contains(needle) {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("connection JSON never contained {needle}");
}

async fn wait_for_ap_list_len(handle: &ManagerHandle, expected: usize) {
    for _ in 0..400 {
        let list: serde_json::Value = serde_json::from_str(&ap_list_json(handle).await).unwrap();
        if list.as_array().map(Vec::len) == Some(expected) {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("access-point list never reached {expected} entries");
}

// 没有已保存凭据时：只开 AP，不尝试连接
#[tokio::test]
async fn startup_without_credentials_serves_ap_only() {
    let (manager, handle, driver, store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    // give a bootstrap-raised connect plenty of time to surface
    sleep(Duration::from_millis(100)).await;
    assert_eq!(connection_json(&handle).await, "{}");
    assert_eq!(driver.connect_calls(), 0);
    assert!(store.stored().is_none());
    assert!(!task.is_finished());
    task.abort();
}

#[tokio::test]
async fn stored_credentials_auto_connect_and_trigger_restart() {
    let credentials = StaCredentials::new("MyHomeWiFi", "correct horse").unwrap();
    let (manager, handle, driver, store) = build(
        MockDriver::new(),
        MemoryStore::preloaded(credentials.clone()),
        test_config(),
    );

    let exit = manager.run().await.unwrap();
    assert_eq!(exit, ManagerExit::Restart);
    assert_eq!(driver.connect_calls(), 1);

    let json = connection_json(&handle).await;
    assert!(json.contains(r#""ssid":"MyHomeWiFi""#));
    assert!(json.contains(r#""ip":"192.168.0.42""#));
    assert!(json.contains(r#""netmask":"255.255.255.0""#));
    assert!(json.contains(r#""gw":"192.168.0.1""#));
    assert!(json.contains(r#""urc":0"#));

    // credentials re-saved after the verified connection
    assert_eq!(store.save_calls(), 1);
    assert_eq!(store.stored().unwrap(), credentials);
}

#[tokio::test]
async fn failed_attempt_reports_urc_2_without_restart_or_save() {
    let (manager, handle, driver, store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    handle.request_connect(StaCredentials::new("xfinitywifi", "whatever").unwrap());
    wait_for_connection_json_contains(&handle, r#""urc":2"#).await;

    let json = connection_json(&handle).await;
    assert!(json.contains(r#""ssid":"xfinitywifi""#));
    assert!(json.contains(r#""ip":"0""#));
    assert_eq!(driver.connect_calls(), 1);
    assert_eq!(store.save_calls(), 0);
    assert!(store.stored().is_none());
    // no restart on a failed attempt; the task keeps serving
    assert!(!task.is_finished());
    task.abort();
}

#[tokio::test]
async fn failed_attempt_does_not_retry_on_its_own() {
    let (manager, handle, driver, _store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    handle.request_connect(StaCredentials::new("xfinitywifi", "whatever").unwrap());
    wait_for_connection_json_contains(&handle, r#""urc":2"#).await;

    sleep(Duration::from_millis(150)).await;
    assert_eq!(driver.connect_calls(), 1);

    // a new external request is required for the next attempt
    handle.request_connect(StaCredentials::new("xfinitywifi", "whatever").unwrap());
    sleep(Duration::from_millis(150)).await;
    assert_eq!(driver.connect_calls(), 2);
    task.abort();
}

#[tokio::test]
async fn explicit_disconnect_clears_credentials_and_publishes_urc_1() {
    let (manager, handle, driver, store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    // the driver reports an established association out-of-band
    driver.event_sink().unwrap().station_got_ip();
    assert!(handle.is_station_connected());

    handle.request_disconnect();
    wait_for_connection_json_contains(&handle, r#""urc":1"#).await;

    assert_eq!(driver.disconnect_calls(), 1);
    assert!(store.clear_calls() >= 1);
    assert!(store.stored().is_none());
    assert!(!handle.is_station_connected());
    assert!(connection_json(&handle).await.contains(r#""ip":"0""#));
    task.abort();
}

#[tokio::test]
async fn disconnect_without_a_connection_skips_the_driver_call() {
    let (manager, handle, driver, store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    handle.request_disconnect();
    wait_for_connection_json_contains(&handle, r#""urc":1"#).await;

    assert_eq!(driver.disconnect_calls(), 0);
    assert!(store.clear_calls() >= 1);
    task.abort();
}

#[tokio::test]
async fn scan_projects_driver_order_and_replaces_wholesale() {
    let (manager, handle, driver, _store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    handle.request_scan();
    wait_for_ap_list_len(&handle, 5).await;

    let list: serde_json::Value = serde_json::from_str(&ap_list_json(&handle).await).unwrap();
    assert_eq!(list[0]["ssid"], "MyHomeWiFi");
    assert_eq!(list[0]["chan"], 6);
    assert_eq!(list[0]["rssi"], -42);
    assert_eq!(list[3]["ssid"], "xfinitywifi");
    assert_eq!(list[4]["ssid"], "HiddenNetwork");

    // a rescan with fewer networks fully replaces the list
    driver.set_networks(vec![
        AccessPointRecord {
            ssid: "only-one".to_string(),
            channel: 2,
            rssi: -30,
            auth: AuthMode::Wpa2Psk,
        },
        AccessPointRecord {
            ssid: "only-two".to_string(),
            channel: 9,
            rssi: -60,
            auth: AuthMode::Open,
        },
    ]);
    handle.request_scan();
    wait_for_ap_list_len(&handle, 2).await;

    let list: serde_json::Value = serde_json::from_str(&ap_list_json(&handle).await).unwrap();
    assert_eq!(list[0]["ssid"], "only-one");
    assert_eq!(list[1]["ssid"], "only-two");
    task.abort();
}

#[tokio::test]
async fn scan_results_are_capped_at_the_configured_maximum() {
    let config = ManagerConfig {
        max_access_points: 3,
        ..test_config()
    };
    let (manager, handle, _driver, _store) = build(MockDriver::new(), MemoryStore::new(), config);
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    handle.request_scan();
    wait_for_ap_list_len(&handle, 3).await;
    task.abort();
}

#[tokio::test]
async fn duplicate_scan_requests_coalesce_into_one_pass() {
    let driver = MockDriver::new().with_latency(Duration::from_millis(80));
    let (manager, handle, driver, _store) = build(driver, MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    for _ in 0..5 {
        handle.request_scan();
    }
    sleep(Duration::from_millis(400)).await;
    assert_eq!(driver.scan_calls(), 1);

    // once the flag is cleared a fresh request is serviced again
    handle.request_scan();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(driver.scan_calls(), 2);
    task.abort();
}

#[tokio::test]
async fn duplicate_connect_requests_coalesce_into_one_attempt() {
    let driver = MockDriver::new().with_latency(Duration::from_millis(80));
    let (manager, handle, driver, _store) = build(driver, MemoryStore::new(), test_config());
    let task = tokio::spawn(manager.run());
    wait_for_ap_started(&handle).await;

    let credentials = StaCredentials::new("xfinitywifi", "whatever").unwrap();
    handle.request_connect(credentials.clone());
    handle.request_connect(credentials.clone());
    handle.request_connect(credentials);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(driver.connect_calls(), 1);
    task.abort();
}

// disconnect 优先于同一次唤醒中 pending 的 connect
#[tokio::test]
async fn disconnect_takes_priority_over_a_simultaneous_connect() {
    let (manager, handle, driver, store) =
        build(MockDriver::new(), MemoryStore::new(), test_config());

    // both requests are pending before the service loop ever wakes
    handle.request_connect(StaCredentials::new("MyHomeWiFi", "correct horse").unwrap());
    handle.request_disconnect();

    let task = tokio::spawn(manager.run());
    wait_for_connection_json_contains(&handle, r#""urc":1"#).await;

    // the disconnect wiped the staged target, so the connect was dropped
    sleep(Duration::from_millis(150)).await;
    assert!(store.clear_calls() >= 1);
    assert_eq!(driver.connect_calls(), 0);
    assert!(!task.is_finished());
    task.abort();
}
