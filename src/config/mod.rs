//! Process configuration: YAML file + environment resolution/overrides

mod loader;
mod types;

pub use loader::{apply_env_overrides, load_config, load_config_from_str};
pub use types::{
    AmqpConfig, Config, ControlPlaneConfig, LoggingConfig, RedisConfig, RoutingConfig,
    ServerConfig, ServiceCredentials,
};
