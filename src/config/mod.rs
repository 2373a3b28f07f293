use crate::config::app::{ApplicationSettings, ApplicationSettingsModel, NAME_ORIGIN, NAME_PORT};
use crate::config::database::{PostgresSettings, PostgresSettingsModel, NAME_POSTGRES};
use crate::config::environment::Environment;
use crate::config::store::{
    LotterySettings, LotterySettingsModel, StoreSettings, StoreSettingsModel,
};
use anyhow::anyhow;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::env;
use tracing::{error, warn};

pub mod app;
pub mod database;
pub mod environment;
pub mod store;

const CONFIG_DIR: &str = "configuration";
const CONFIG_FILE_NAME: &str = "settings.toml";
const NAME_ENVIRONMENT: &str = "APP_ENVIRONMENT";

#[derive(Deserialize)]
pub struct SettingsModel {
    pub app: Option<ApplicationSettingsModel>,
    pub postgres: Option<PostgresSettingsModel>,
    pub store: Option<StoreSettingsModel>,
    pub lottery: Option<LotterySettingsModel>,
}

impl SettingsModel {
    fn parse() -> Result<Self, ConfigError> {
        let base_path = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("No working directory: {e}")))?;
        let config_dir = base_path.join(CONFIG_DIR);
        let settings = Config::builder()
            .add_source(config::File::from(config_dir.join(CONFIG_FILE_NAME)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        settings.build()?.try_deserialize()
    }
}

#[derive(Clone)]
pub struct Settings {
    pub app: ApplicationSettings,
    /// `None` selects the in-memory store.
    pub postgres: Option<PostgresSettings>,
    pub store: StoreSettings,
    pub lottery: LotterySettings,
    pub environment: Environment,
}

impl Settings {
    fn dev(model: SettingsModel) -> Self {
        let app = model.app.map_or_else(
            || {
                warn!("Using default `app` settings!");
                ApplicationSettings::default()
            },
            |x| x.to_settings(),
        );

        let postgres = model
            .postgres
            .and_then(|x| x.to_settings())
            .or_else(PostgresSettings::try_from_env);
        if postgres.is_none() {
            warn!("No `postgres` settings, falling back to the in-memory store!");
        }

        let store = model.store.map_or_else(
            || {
                warn!("Using default `store` settings!");
                StoreSettings::default()
            },
            |x| x.to_settings(),
        );

        let lottery = model.lottery.map_or_else(
            || {
                warn!("Using default `lottery` settings!");
                LotterySettings::default()
            },
            |x| x.to_settings(),
        );

        Self {
            app,
            postgres,
            store,
            lottery,
            environment: Environment::Development,
        }
    }

    fn prod() -> Self {
        Self {
            app: ApplicationSettings::from_env(),
            postgres: Some(PostgresSettings::from_env()),
            store: StoreSettings::from_env(),
            lottery: LotterySettings::from_env(),
            environment: Environment::Production,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: ApplicationSettings::default(),
            postgres: PostgresSettings::try_from_env(),
            store: StoreSettings::default(),
            lottery: LotterySettings::default(),
            environment: Environment::default(),
        }
    }
}

pub fn get_config() -> Result<Settings, anyhow::Error> {
    let environment = match env::var(NAME_ENVIRONMENT) {
        Ok(value) => Environment::try_from(value)
            .map_err(|e| anyhow!("Failed to parse {NAME_ENVIRONMENT}: {e}"))?,
        Err(_) => Environment::Development,
    };

    match environment {
        Environment::Development => match SettingsModel::parse() {
            Ok(model) => Ok(Settings::dev(model)),
            Err(e) => {
                error!("{e}\n - check {CONFIG_DIR}/{CONFIG_FILE_NAME}");
                warn!("Using default configuration!");
                Ok(Settings::default())
            }
        },
        Environment::Production => {
            let missing = missing_env();
            if !missing.is_empty() {
                return Err(anyhow!(
                    "Provide missing environment variables {missing:?}"
                ));
            }
            Ok(Settings::prod())
        }
    }
}

pub fn try_get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Only called after [`missing_env`] confirmed the variable exists.
pub fn get_env(name: &str) -> String {
    try_get_env(name).unwrap_or_default()
}

fn missing_env() -> Vec<&'static str> {
    let present: Vec<String> = env::vars().map(|(key, _)| key).collect();
    [NAME_ORIGIN, NAME_PORT, NAME_POSTGRES]
        .into_iter()
        .filter(|required| !present.iter().any(|key| key == required))
        .collect()
}
