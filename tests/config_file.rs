use std::io::Write;
use tdcdtc::config::{ConfigError, EngineConfig, Resolution};
use tdcdtc::EngineBuilder;

fn write_temp(name: &str, text: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("tdcdtc_{}_{}.toml", name, std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
fn load_full_document() {
    let path = write_temp(
        "full",
        r#"
channels = 8
capture_depth = 64
schedule_depth = 32
timestamp_width = 24
resolution = "low"
fast_bus = false
"#,
    );
    let config = EngineConfig::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.channels, 8);
    assert_eq!(config.capture_depth, 64);
    assert_eq!(config.schedule_depth, 32);
    assert_eq!(config.cycle_width(), 21);
    assert_eq!(config.resolution, Resolution::Low);
    assert!(!config.fast_bus);

    let engine = EngineBuilder::from_config(config).build().unwrap();
    assert_eq!(engine.channels(), 8);
}

#[test]
fn load_rejects_illegal_values() {
    let path = write_temp("wide", "channels = 40\n");
    let err = EngineConfig::load_from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::Channels(40)));
}

#[test]
fn load_rejects_malformed_toml() {
    let path = write_temp("bad", "channels = \"four\"\n");
    let err = EngineConfig::load_from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn saved_config_reloads() {
    let config = EngineConfig {
        channels: 3,
        resolution: Resolution::Low,
        ..EngineConfig::default()
    };
    let path = write_temp("saved", &config.to_toml_string().unwrap());
    let loaded = EngineConfig::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, config);
}
