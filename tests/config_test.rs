// ABOUTME: Integration tests for loading pair configuration files from disk
// ABOUTME: Covers JSON and TOML documents, schedule overrides, and load errors

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tunnel_replicator::{load_config, ConfigError, SchedulerConfig};

const TWO_PAIRS_JSON: &str = r#"{
    "app": [
        {
            "active": true,
            "comm": [
                {"name": "pulp2", "ip": "10.29.13.222", "port": 1521, "user": "abbsg",
                 "passwd": "abbsg", "sid": "ADVA", "send": ["T1", "T2"], "receive": ["R1"]},
                {"name": "nps", "ip": "10.29.12.245", "port": 1521, "user": "abbsg",
                 "passwd": "abbsg", "sid": "ADVA", "send": ["S1"], "receive": ["T1", "T2"]}
            ]
        },
        {
            "active": false,
            "comm": [
                {"name": "kiln", "ip": "10.29.14.10", "port": 1521, "user": "abbsg",
                 "passwd": "abbsg", "sid": "ADVA"},
                {"name": "mill", "ip": "10.29.14.11", "port": 1522, "user": "abbsg",
                 "passwd": "abbsg", "sid": "ADVA"}
            ]
        }
    ]
}"#;

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_json_pairs_in_order() {
    let file = write_config(".json", TWO_PAIRS_JSON);

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.pairs.len(), 2);
    let first = &config.pairs[0];
    assert!(first.is_active());
    assert_eq!(first.label(), "pulp2<->nps");
    assert_eq!(first.first().send_tables, vec!["T1", "T2"]);
    assert_eq!(first.second().receive_tables, vec!["T1", "T2"]);
    assert_eq!(first.second().address.port, 1521);

    let second = &config.pairs[1];
    assert!(!second.is_active());
    assert!(second.first().send_tables.is_empty());
    assert_eq!(second.second().address.port, 1522);
}

#[test]
fn test_load_toml_with_schedule() {
    let toml = r#"
[schedule]
trigger_second = 15
cooldown_secs = 40

[[app]]
active = true

[[app.comm]]
name = "pulp2"
host = "10.29.13.222"
port = 5432
user = "replicator"
password = "secret"
database = "plant"
send = ["T1"]
tls = true

[[app.comm]]
name = "nps"
host = "10.29.12.245"
port = 5432
user = "replicator"
password = "secret"
database = "plant"
receive = ["T1"]
"#;
    let file = write_config(".toml", toml);

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.pairs.len(), 1);
    let pair = &config.pairs[0];
    assert!(pair.first().tls);
    assert!(!pair.second().tls);
    assert_eq!(pair.first().database_id, "plant");
    assert_eq!(pair.first().credentials.password(), "secret");

    let mut scheduler = SchedulerConfig::default();
    scheduler.apply_settings(&config.schedule).unwrap();
    assert_eq!(scheduler.trigger.second(), 15);
    assert_eq!(scheduler.cooldown, Duration::from_secs(40));
    assert_eq!(scheduler.poll_interval, Duration::from_millis(200));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = load_config(&path).unwrap_err();

    match err {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_json_is_parse_error() {
    let file = write_config(".json", r#"{"app": [{"active": true, "comm": ["#);

    let err = load_config(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Json { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_unknown_extension_is_read_as_json() {
    let file = write_config(".conf", TWO_PAIRS_JSON);
    assert_eq!(load_config(file.path()).unwrap().pairs.len(), 2);
}

#[test]
fn test_table_count_mismatch_is_rejected() {
    let json = r#"{
        "app": [{
            "active": true,
            "comm": [
                {"name": "a", "ip": "h1", "port": 1521, "user": "u", "passwd": "p",
                 "sid": "s", "send": ["T1", "T2"]},
                {"name": "b", "ip": "h2", "port": 1521, "user": "u", "passwd": "p",
                 "sid": "s", "receive": ["T1"]}
            ]
        }]
    }"#;
    let file = write_config(".json", json);

    let err = load_config(file.path()).unwrap_err();

    assert!(matches!(
        err,
        ConfigError::TableCountMismatch {
            send: 2,
            receive: 1,
            ..
        }
    ));
}

#[test]
fn test_single_endpoint_pair_is_rejected() {
    let json = r#"{"app": [{"active": true, "comm": [
        {"name": "a", "ip": "h1", "port": 1521, "user": "u", "passwd": "p", "sid": "s"}
    ]}]}"#;
    let file = write_config(".json", json);

    let err = load_config(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::EndpointCount { index: 0, found: 1 }));
}

#[test]
fn test_unknown_schedule_key_is_rejected() {
    let json = r#"{"schedule": {"trigger_minute": 3}, "app": []}"#;
    let file = write_config(".json", json);

    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Json { .. })
    ));
}
