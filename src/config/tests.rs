use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{load_config, load_config_from};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.base_url, "http://127.0.0.1:8083");
    assert_eq!(settings.server.events_url, "ws://127.0.0.1:8083/events");
    assert_eq!(settings.server.request_timeout_ms, 5000);
    assert_eq!(settings.dashboard.message_capacity, 100);
    assert_eq!(settings.dashboard.dashboard_log_capacity, 100);
    assert_eq!(settings.dashboard.housekeeping_interval_ms, 1000);
    assert_eq!(settings.dashboard.reconnect_delay_ms, 2000);
    assert_eq!(settings.dashboard.update_channel_capacity, 1024);
    assert!(settings.dashboard.auto_select_first_topic);
    assert_eq!(settings.dashboard.log_level, "info");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let settings = temp_env::with_vars_unset(
        [
            "DASHBOARD__SERVER__BASE_URL",
            "DASHBOARD__DASHBOARD__MESSAGE_CAPACITY",
        ],
        || load_config_from(path.to_str().unwrap()),
    )
    .expect("load_config_from failed");
    assert_eq!(settings, Settings::default());
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        base_url = "http://broker.local:9000"

        [dashboard]
        message_capacity = 25
        auto_select_first_topic = false
    "#;
    fs::write(tmp.path().join("dashboard.toml"), toml).expect("write config file");
    let path = tmp.path().join("dashboard");

    let settings = load_config_from(path.to_str().unwrap()).expect("load_config_from failed");
    assert_eq!(settings.server.base_url, "http://broker.local:9000");
    assert_eq!(settings.server.events_url, "ws://127.0.0.1:8083/events");
    assert_eq!(settings.dashboard.message_capacity, 25);
    assert!(!settings.dashboard.auto_select_first_topic);
    assert_eq!(settings.dashboard.reconnect_delay_ms, 2000);
    assert_eq!(settings.dashboard.aggregator_settings().message_capacity, 25);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("dashboard.toml"),
        "[dashboard]\nmessage_capacity = 25\n",
    )
    .expect("write config file");
    let path = tmp.path().join("dashboard");

    let settings = temp_env::with_vars(
        [
            ("DASHBOARD__DASHBOARD__MESSAGE_CAPACITY", Some("40")),
            ("DASHBOARD__SERVER__EVENTS_URL", Some("ws://10.0.0.5:8083/events")),
        ],
        || load_config_from(path.to_str().unwrap()),
    )
    .expect("load_config_from failed");

    assert_eq!(settings.dashboard.message_capacity, 40);
    assert_eq!(settings.server.events_url, "ws://10.0.0.5:8083/events");
}

#[test]
#[serial]
fn test_load_config_reads_working_directory() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = std::env::current_dir().expect("current_dir");
    fs::create_dir_all(tmp.path().join("config")).expect("create config dir");
    fs::write(
        tmp.path().join("config/default.toml"),
        "[dashboard]\nlog_level = \"debug\"\n",
    )
    .expect("write config file");

    std::env::set_current_dir(tmp.path()).expect("set current dir");
    let result = load_config();
    std::env::set_current_dir(orig).expect("restore cwd");

    assert_eq!(result.expect("load_config failed").dashboard.log_level, "debug");
}

#[test]
fn test_zero_capacities_are_clamped() {
    let mut settings = Settings::default();
    settings.dashboard.message_capacity = 0;
    settings.dashboard.housekeeping_interval_ms = 0;
    assert_eq!(settings.dashboard.aggregator_settings().message_capacity, 1);
    assert!(!settings.dashboard.housekeeping_interval().is_zero());
}
