use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{TopicStrategy, load_config_from};
use crate::connection::Framing;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.view.error_target, "glv-error");
    assert_eq!(settings.view.flash_template, "glv-flash-message");
    assert_eq!(settings.view.flash_duration_ms, 2000);
    assert_eq!(settings.view.topic_strategy, TopicStrategy::Handshake);
    assert_eq!(settings.view.framing, Framing::Text);
}

#[test]
fn cookie_name_uses_view_name() {
    let settings = Settings::default();
    assert_eq!(settings.view.cookie_name(), "_glv_key_glv");
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load config");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let file = tmp.path().join("default.toml");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [view]
        topic_strategy = "viewer"
        framing = "binary"
        flash_duration_ms = 500
    "#;
    fs::write(&file, toml).expect("write config file");

    let path = tmp.path().join("default");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.view.topic_strategy, TopicStrategy::Viewer);
    assert_eq!(cfg.view.framing, Framing::Binary);
    assert_eq!(cfg.view.flash_duration_ms, 500);
    assert_eq!(cfg.view.error_target, "glv-error");
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default");
    temp_env::with_vars(
        [
            ("HOTVIEW__SERVER__PORT", Some("7070")),
            ("HOTVIEW__VIEW__NAME", Some("todos")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load config");
            assert_eq!(cfg.server.port, 7070);
            assert_eq!(cfg.view.name, "todos");
            assert_eq!(cfg.view.cookie_name(), "_glv_key_todos");
        },
    );
}
