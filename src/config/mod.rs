mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    PartialSettings, ServerSettings, Settings, TopicStrategy, ViewSettings,
};

/// Prefix of environment variables read by [`load_config`],
/// e.g. `HOTVIEW__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "HOTVIEW";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server and view configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Like [`load_config`], reading the optional file at `path` (extension
/// inferred by the `config` crate).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}

#[cfg(test)]
mod tests;
