mod settings;

use config::{Config, Environment, File};

use crate::utils::Result;

pub use settings::{
    DashboardSettings, PartialDashboardSettings, PartialServerSettings, PartialSettings,
    ServerSettings, Settings,
};

/// Default location of the optional settings file, without extension.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
pub fn load_config() -> Result<Settings> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Like [`load_config`], reading the optional settings file at `path`
/// (any extension the `config` crate understands).
///
/// Environment variables use the `DASHBOARD` prefix and `__` between
/// levels, e.g. `DASHBOARD__SERVER__BASE_URL`.
pub fn load_config_from(path: &str) -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merged(partial))
}

#[cfg(test)]
mod tests;
