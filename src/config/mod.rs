mod settings;

pub use settings::{
    default_config_path, Config, PersistenceConfig, ProtectionMode, ServerConfig, EXAMPLE_CONFIG,
};
