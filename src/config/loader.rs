//! Configuration loader

use std::path::Path;

use crate::error::{ProxyError, Result};

use super::Config;

/// Load configuration from a YAML file
///
/// Also resolves `${VAR}` references and applies AMQP_PROXY_* env var
/// overrides after loading.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(yaml)?;
    resolve_config_env_vars(&mut config);
    apply_env_overrides(&mut config);
    config.validate().map_err(ProxyError::Config)?;
    Ok(config)
}

/// Apply AMQP_PROXY_* environment variable overrides to a config.
///
/// Any set env var overrides the corresponding config value:
/// - `AMQP_PROXY_LISTEN_ADDRESS` - Override listen address
/// - `AMQP_PROXY_LISTEN_PORT` - Override listen port
/// - `AMQP_PROXY_CONTROL_PLANE_URL` - Override control-plane base URL
/// - `AMQP_PROXY_AUTH_TOKEN` - Override control-plane auth token
/// - `AMQP_PROXY_REDIS_URL` - Override Redis connection URL
/// - `AMQP_PROXY_LOG_LEVEL` - Override log level
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("AMQP_PROXY_LISTEN_ADDRESS") {
        debug!("Overriding listen_address from AMQP_PROXY_LISTEN_ADDRESS");
        config.server.listen_address = val;
    }
    if let Ok(val) = std::env::var("AMQP_PROXY_LISTEN_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            debug!("Overriding listen_port from AMQP_PROXY_LISTEN_PORT");
            config.server.listen_port = port;
        }
    }
    if let Ok(val) = std::env::var("AMQP_PROXY_CONTROL_PLANE_URL") {
        debug!("Overriding control_plane.base_url from AMQP_PROXY_CONTROL_PLANE_URL");
        config.control_plane.base_url = val;
    }
    if let Ok(val) = std::env::var("AMQP_PROXY_AUTH_TOKEN") {
        debug!("Overriding control_plane.auth_token from AMQP_PROXY_AUTH_TOKEN");
        config.control_plane.auth_token = val;
    }
    if let Ok(val) = std::env::var("AMQP_PROXY_REDIS_URL") {
        debug!("Overriding redis.url from AMQP_PROXY_REDIS_URL");
        config.redis.url = val;
    }
    if let Ok(val) = std::env::var("AMQP_PROXY_LOG_LEVEL") {
        debug!("Overriding log level from AMQP_PROXY_LOG_LEVEL");
        config.logging.level = val;
    }
}

/// Resolve environment variables in a string value
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - curly brace syntax
/// - `$VAR_NAME` - simple syntax (for single variable values)
///
/// If the environment variable is not set, the original value is preserved.
fn resolve_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        return match std::env::var(var_name) {
            Ok(env_value) => {
                debug!("Resolved env var {} from config", var_name);
                env_value
            }
            Err(_) => value.to_string(),
        };
    }

    if value.starts_with('$') && !value.contains(' ') && value.len() > 1 {
        let var_name = &value[1..];
        return match std::env::var(var_name) {
            Ok(env_value) => {
                debug!("Resolved env var {} from config", var_name);
                env_value
            }
            Err(_) => value.to_string(),
        };
    }

    value.to_string()
}

/// Resolve environment variables in all config fields that support it
fn resolve_config_env_vars(config: &mut Config) {
    config.service_credentials.username = resolve_env_var(&config.service_credentials.username);
    config.service_credentials.password = resolve_env_var(&config.service_credentials.password);
    config.control_plane.base_url = resolve_env_var(&config.control_plane.base_url);
    config.control_plane.auth_token = resolve_env_var(&config.control_plane.auth_token);
    config.redis.url = resolve_env_var(&config.redis.url);
    if let Some(ref addr) = config.routing.backend_override {
        config.routing.backend_override = Some(resolve_env_var(addr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_minimal() {
        let yaml = r#"
server:
  listen_port: 5671

service_credentials:
  username: proxy-svc
  password: secret

control_plane:
  base_url: "https://cp.example.com"
  auth_token: tok
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.server.listen_port, 5671);
        assert_eq!(config.server.listen_address, "0.0.0.0"); // default
        assert_eq!(config.service_credentials.username, "proxy-svc");
        assert_eq!(config.control_plane.base_url, "https://cp.example.com");
        // defaults
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.redis.update_channel, "update-table");
        assert_eq!(config.amqp.vhost, "/");
        assert_eq!(config.amqp.frame_max, 131072);
        assert_eq!(config.amqp.channel_max, 1024);
        assert_eq!(config.amqp.heartbeat, 60);
        assert!(config.routing.backend_override.is_none());
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
server:
  listen_address: "127.0.0.1"
  listen_port: 5671
  connect_timeout_secs: 10
  handshake_timeout_secs: 5
  max_connections: 64

service_credentials:
  username: svc
  password: pw

amqp:
  vhost: "/tenants"
  channel_max: 256
  frame_max: 65536
  heartbeat: 30
  locale: en_GB

control_plane:
  base_url: "https://cp.example.com"
  auth_token: tok

redis:
  url: "redis://cache:6379"
  update_channel: route-updates

routing:
  backend_override: "10.0.0.9:5672"

logging:
  level: debug
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.server.connect_timeout_secs, 10);
        assert_eq!(config.server.handshake_timeout_secs, 5);
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.amqp.vhost, "/tenants");
        assert_eq!(config.amqp.channel_max, 256);
        assert_eq!(config.amqp.locale, "en_GB");
        assert_eq!(config.redis.update_channel, "route-updates");
        assert_eq!(
            config.routing.backend_override.as_deref(),
            Some("10.0.0.9:5672")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_config_missing_base_url_fails() {
        let yaml = r#"
server:
  listen_port: 5671

service_credentials:
  username: svc
  password: pw

control_plane:
  base_url: ""
"#;
        let err = load_config_from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_resolve_env_var_curly_brace_syntax() {
        std::env::set_var("TEST_AMQP_PROXY_TOKEN", "tok_from_env");

        let result = resolve_env_var("${TEST_AMQP_PROXY_TOKEN}");
        assert_eq!(result, "tok_from_env");

        std::env::remove_var("TEST_AMQP_PROXY_TOKEN");
    }

    #[test]
    fn test_resolve_env_var_simple_syntax() {
        std::env::set_var("TEST_AMQP_PROXY_USER", "svc_from_env");

        let result = resolve_env_var("$TEST_AMQP_PROXY_USER");
        assert_eq!(result, "svc_from_env");

        std::env::remove_var("TEST_AMQP_PROXY_USER");
    }

    #[test]
    fn test_resolve_env_var_not_set_keeps_original() {
        std::env::remove_var("NONEXISTENT_AMQP_VAR_98765");
        assert_eq!(
            resolve_env_var("${NONEXISTENT_AMQP_VAR_98765}"),
            "${NONEXISTENT_AMQP_VAR_98765}"
        );
        assert_eq!(resolve_env_var("plain_value"), "plain_value");
    }

    #[test]
    fn test_load_config_with_env_vars() {
        std::env::set_var("TEST_AMQP_SVC_PASS", "pw_from_env");

        let yaml = r#"
server:
  listen_port: 5671

service_credentials:
  username: svc
  password: "${TEST_AMQP_SVC_PASS}"

control_plane:
  base_url: "https://cp.example.com"
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.service_credentials.password, "pw_from_env");

        std::env::remove_var("TEST_AMQP_SVC_PASS");
    }
}
