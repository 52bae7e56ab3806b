//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "orbiter.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "orbiter.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".orbiter.yaml";

/// Alternative configuration file name (TOML)
pub const ALT_CONFIG_TOML: &str = ".orbiter.toml";

/// JSON configuration file name
pub const JSON_CONFIG_FILE: &str = "orbiter.json";

/// Environment variable forcing output streaming for every task
pub const STREAM_OUTPUT_ENV: &str = "ORBITER_STREAM_OUTPUT";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ALT_CONFIG_TOML,
        JSON_CONFIG_FILE,
    ]
}
