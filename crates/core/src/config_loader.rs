use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging defaults, TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads application configuration with a specific profile layered over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        Self::load_profile_from("config/Config.toml", profile)
    }

    /// Loads `path` with a profile file layered over it. The profile file sits next to the
    /// base file: `dir/Config.toml` with profile `prod` reads `dir/Config.prod.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be parsed.
    pub fn load_profile_from(path: impl AsRef<Path>, profile: &str) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Self::base(path)
            .merge(Toml::file(Self::profile_path(path, profile)))
            .merge(Env::prefixed("APP_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }

    /// Loads application configuration from an explicit TOML path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::base(path)
            .merge(Env::prefixed("APP_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }

    fn profile_path(path: &Path, profile: &str) -> PathBuf {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Config");
        path.with_file_name(format!("{stem}.{profile}.toml"))
    }

    fn base(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(path.as_ref()))
    }
}
