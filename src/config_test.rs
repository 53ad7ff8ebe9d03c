use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    ServerConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn empty_lookup_yields_defaults() {
    assert_eq!(config_from(&[]), ServerConfig::default());
}

#[test]
fn session_defaults_match_protocol() {
    let cfg = SessionConfig::default();
    assert_eq!(cfg.disconnect_delay, Duration::from_secs(5));
    assert_eq!(cfg.heartbeat_interval, Duration::from_secs(25));
    assert_eq!(cfg.response_limit, 128_000);
}

#[test]
fn overrides_are_parsed() {
    let cfg = config_from(&[
        ("PORT", "9999"),
        ("SOCKJS_DISCONNECT_DELAY_MS", "250"),
        ("SOCKJS_HEARTBEAT_INTERVAL_MS", "1000"),
        ("SOCKJS_RESPONSE_LIMIT", "4096"),
        ("SOCKJS_WEBSOCKET", "off"),
        ("SOCKJS_COOKIE_NEEDED", "0"),
        ("SOCKJS_URL", "http://localhost/sockjs.js"),
    ]);
    assert_eq!(cfg.port, 9999);
    assert_eq!(cfg.session.disconnect_delay, Duration::from_millis(250));
    assert_eq!(cfg.session.heartbeat_interval, Duration::from_secs(1));
    assert_eq!(cfg.session.response_limit, 4096);
    assert!(!cfg.websocket);
    assert!(!cfg.cookie_needed);
    assert_eq!(cfg.sockjs_url, "http://localhost/sockjs.js");
}

#[test]
fn garbage_values_fall_back_to_defaults() {
    let cfg = config_from(&[("PORT", "not-a-port"), ("SOCKJS_WEBSOCKET", "maybe"), ("SOCKJS_URL", "  ")]);
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert!(cfg.websocket);
    assert_eq!(cfg.sockjs_url, DEFAULT_SOCKJS_URL);
}

#[test]
fn zero_heartbeat_is_clamped() {
    let cfg = config_from(&[("SOCKJS_HEARTBEAT_INTERVAL_MS", "0")]);
    assert_eq!(cfg.session.heartbeat_interval, Duration::from_millis(1));
}
