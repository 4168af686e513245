//! Configuration types

use serde::Deserialize;

/// Root configuration structure
///
/// # Example
///
/// ```yaml
/// server:
///   listen_port: 5671
///
/// service_credentials:
///   username: proxy-svc
///   password: "${AMQP_PROXY_SERVICE_PASSWORD}"
///
/// control_plane:
///   base_url: "https://cp.internal.example.com"
///   auth_token: "${AMQP_PROXY_AUTH_TOKEN}"
///
/// redis:
///   url: "redis://cache.internal:6379"
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,

    /// Credentials the proxy presents to backend brokers
    pub service_credentials: ServiceCredentials,

    /// Protocol tuning advertised during handshakes
    #[serde(default)]
    pub amqp: AmqpConfig,

    /// Control-plane lookup endpoint
    pub control_plane: ControlPlaneConfig,

    /// Distributed route cache
    #[serde(default)]
    pub redis: RedisConfig,

    /// Routing behavior overrides
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.control_plane.base_url.is_empty() {
            return Err("control_plane.base_url must not be empty".into());
        }
        if self.service_credentials.username.is_empty() {
            return Err("service_credentials.username must not be empty".into());
        }
        if self.redis.url.is_empty() {
            return Err("redis.url must not be empty".into());
        }
        Ok(())
    }
}

/// Listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Port to listen on
    pub listen_port: u16,
    /// Backend dial timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Deadline for each handshake leg in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
    /// Maximum number of concurrent connections (0 = unlimited)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Credentials injected into the upstream Start-Ok
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCredentials {
    /// Username presented to backend brokers
    pub username: String,
    /// Password presented to backend brokers
    pub password: String,
}

/// Protocol tuning values used on both handshake legs
#[derive(Debug, Clone, Deserialize)]
pub struct AmqpConfig {
    /// Virtual host opened on the backend
    #[serde(default = "default_vhost")]
    pub vhost: String,
    /// Advertised channel-max
    #[serde(default = "default_channel_max")]
    pub channel_max: u16,
    /// Advertised frame-max in bytes
    #[serde(default = "default_frame_max")]
    pub frame_max: u32,
    /// Advertised heartbeat interval in seconds
    #[serde(default = "default_heartbeat")]
    pub heartbeat: u16,
    /// Locale advertised in Start/Start-Ok
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            vhost: default_vhost(),
            channel_max: default_channel_max(),
            frame_max: default_frame_max(),
            heartbeat: default_heartbeat(),
            locale: default_locale(),
        }
    }
}

/// Control-plane lookup endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneConfig {
    /// Base URL of the control-plane API
    pub base_url: String,
    /// Shared token sent with every lookup
    #[serde(default)]
    pub auth_token: String,
}

/// Distributed route cache connection
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Pub/sub channel carrying route updates
    #[serde(default = "default_update_channel")]
    pub update_channel: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            update_channel: default_update_channel(),
        }
    }
}

/// Routing behavior overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingConfig {
    /// When set, every connection dials this address and resolution acts
    /// only as an access check.
    #[serde(default)]
    pub backend_override: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_channel_max() -> u16 {
    1024
}

fn default_frame_max() -> u32 {
    131072
}

fn default_heartbeat() -> u16 {
    60
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_update_channel() -> String {
    "update-table".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
