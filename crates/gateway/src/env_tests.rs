// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_relay_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("RELAY_") {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear_relay_vars();
    std::env::set_var("RELAY_STATE_DIR", "/tmp/relay-test");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/relay-test"));
    std::env::remove_var("RELAY_STATE_DIR");
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    clear_relay_vars();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
    let dir = state_dir().unwrap();
    assert_eq!(dir, PathBuf::from("/tmp/xdg-state/relay"));
    std::env::remove_var("XDG_STATE_HOME");
}

#[test]
#[serial]
fn bind_addr_default_and_override() {
    clear_relay_vars();
    assert_eq!(bind_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));

    std::env::set_var("RELAY_BIND_ADDR", "127.0.0.1:9901");
    assert_eq!(bind_addr(), SocketAddr::from(([127, 0, 0, 1], 9901)));
    std::env::remove_var("RELAY_BIND_ADDR");

    std::env::set_var("RELAY_BIND_ADDR", "not an address");
    assert_eq!(bind_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));
    std::env::remove_var("RELAY_BIND_ADDR");
}

#[test]
#[serial]
fn stream_config_defaults_without_env() {
    clear_relay_vars();
    let config = stream_config();
    assert_eq!(config.log_prefix, "relay");
    assert_eq!(config.max_log_length, 1000);
    assert_eq!(config.keep_alive_interval, Duration::from_secs(15));
}

#[test]
#[serial]
fn stream_config_env_overrides() {
    clear_relay_vars();
    std::env::set_var("RELAY_LOG_PREFIX", "agents");
    std::env::set_var("RELAY_MAX_LOG_LENGTH", "50");
    std::env::set_var("RELAY_TAIL_BLOCK_MS", "250");
    std::env::set_var("RELAY_BUSINESS_TIMEOUT_MINUTES", "5");
    std::env::set_var("RELAY_THREAD_TTL_SECONDS", "3600");

    let config = stream_config();
    assert_eq!(config.log_prefix, "agents");
    assert_eq!(config.max_log_length, 50);
    assert_eq!(config.tail_block, Duration::from_millis(250));
    assert_eq!(config.business_timeout, Duration::from_secs(300));
    assert_eq!(config.thread_ttl, Duration::from_secs(3600));

    clear_relay_vars();
}

#[test]
#[serial]
fn unparseable_numeric_overrides_are_ignored() {
    clear_relay_vars();
    std::env::set_var("RELAY_MAX_LOG_LENGTH", "many");
    let config = stream_config();
    assert_eq!(config.max_log_length, 1000);
    clear_relay_vars();
}

#[test]
#[serial]
fn result_api_url_requires_non_blank() {
    clear_relay_vars();
    assert!(result_api_url().is_none());
    std::env::set_var("RELAY_RESULT_API_URL", "   ");
    assert!(result_api_url().is_none());
    std::env::set_var("RELAY_RESULT_API_URL", "http://backend:8080");
    assert_eq!(result_api_url().as_deref(), Some("http://backend:8080"));
    clear_relay_vars();
}
