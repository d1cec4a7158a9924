use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

use charger_app::ChargerConfig;
use types::ApiVersion;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn toml_config_validates() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("GOE_CONFIG", fixture_path("config-valid.toml"));

    let config = ChargerConfig::load().expect("load config");
    config.validate().expect("validate config");

    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[0].ip, "192.168.1.40");
    assert_eq!(config.devices[0].api_version, ApiVersion::V1);
    assert_eq!(config.devices[1].api_version, ApiVersion::V2);
    assert_eq!(config.poller.jitter_ms, 250);

    env::remove_var("GOE_CONFIG");
}

#[test]
fn json_config_validates() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("GOE_CONFIG", fixture_path("config-valid.json"));

    let config = ChargerConfig::load().expect("load config");
    config.validate().expect("validate config");
    assert_eq!(config.devices.len(), 1);

    env::remove_var("GOE_CONFIG");
}

#[test]
fn invalid_config_fails_validation() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("GOE_CONFIG", fixture_path("config-invalid.toml"));

    let config = ChargerConfig::load().expect("load config");
    assert!(config.validate().is_err());

    env::remove_var("GOE_CONFIG");
}

#[test]
fn env_overrides_take_precedence() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    env::set_var("GOE_CONFIG", fixture_path("config-valid.toml"));
    env::set_var("GOE_DEVICES", "10.0.0.5:2, 10.0.0.6");
    env::set_var("GOE_POLL_INTERVAL_MS", "2500");

    let config = ChargerConfig::load().expect("load config");
    config.validate().expect("validate config");

    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[0].ip, "10.0.0.5");
    assert_eq!(config.devices[0].api_version, ApiVersion::V2);
    assert_eq!(config.devices[1].api_version, ApiVersion::V1);
    assert_eq!(config.poller.poll_interval.as_millis(), 2500);

    env::remove_var("GOE_POLL_INTERVAL_MS");
    env::remove_var("GOE_DEVICES");
    env::remove_var("GOE_CONFIG");
}

#[test]
fn unsupported_api_version_is_rejected_at_load() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    let path = std::env::temp_dir().join(format!("goe-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[[devices]]\nip = \"192.168.1.40\"\napi_version = 3\n")
        .expect("write fixture");

    let result = ChargerConfig::load_with_path(Some(path.to_string_lossy().to_string()));
    assert!(result.is_err());

    let _ = std::fs::remove_file(path);
}

fn fixture_path(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().to_string()
}
