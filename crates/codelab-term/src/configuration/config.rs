#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::IntoEnumIterator;
use strum_macros::Display;
use strum_macros::EnumIter;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Eq, PartialEq, EnumIter, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiBaseUrl,
    ConfigFile,
    RecordsPageSize,
    StateDir,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    fn default_dir(base: Option<path::PathBuf>) -> path::PathBuf {
        return base
            .unwrap_or_else(|| path::PathBuf::from("."))
            .join("codelab");
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = Config::default_dir(dirs::config_local_dir()).join("config.toml");
        let state_dir = Config::default_dir(dirs::data_local_dir());

        let res = match key {
            ConfigKey::ApiBaseUrl => "http://localhost:8000/api/v1".to_string(),
            ConfigKey::RecordsPageSize => "12".to_string(),
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
            ConfigKey::StateDir => state_dir.to_string_lossy().to_string(),
        };

        return res;
    }

    /// Seed defaults, then layer the config file over them, then any caller
    /// overrides. Empty values never shadow a seeded one.
    pub async fn load(overrides: &[(ConfigKey, String)]) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key));
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for (key, value) in overrides {
            if *key == ConfigKey::ConfigFile && !value.is_empty() {
                config_file = value.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::set(key, val_str);
                    }
                }
            }
        }

        for (key, value) in overrides {
            if value.is_empty() {
                continue;
            }
            Config::set(*key, value);
        }

        log::debug!(
            "config: api-base-url={} records-page-size={}",
            Config::get(ConfigKey::ApiBaseUrl),
            Config::get(ConfigKey::RecordsPageSize),
        );

        return Ok(());
    }
}
