//! Process-wide configuration, read once from the environment.

use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{Context as _, Result};
use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Connection string for the Postgres store
    pub database_url: Option<String>,
    /// Whether excuse resolutions are sent to the notifier
    pub notify: bool,
    pub election: ElectionSettings,
}

/// Which stages of the internal elections are currently open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct ElectionSettings {
    /// Whether this cycle elects the executive board
    pub exec_election: bool,
    /// Whether expressions of interest are being collected
    pub ois_open: bool,
    /// Whether expression of interest results are visible
    pub ois_results_open: bool,
    /// Whether letters of intent are being collected
    pub loi_open: bool,
    /// Whether slating is underway
    pub slating_open: bool,
    /// The class year of the current seniors
    pub senior_class_year: Option<i32>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            notify: env_var("AXO_NOTIFY")?.unwrap_or(true),
            election: ElectionSettings {
                exec_election: env_var("AXO_EXEC_ELECTION")?.unwrap_or(false),
                ois_open: env_var("AXO_OIS_OPEN")?.unwrap_or(false),
                ois_results_open: env_var("AXO_OIS_RESULTS_OPEN")?.unwrap_or(false),
                loi_open: env_var("AXO_LOI_OPEN")?.unwrap_or(false),
                slating_open: env_var("AXO_SLATING_OPEN")?.unwrap_or(false),
                senior_class_year: env_var("AXO_SENIOR_CLASS_YEAR")?,
            },
        })
    }
}

/// Install the settings for this process. Returns false if they were already set.
pub fn init(settings: Settings) -> bool {
    SETTINGS.set(settings).is_ok()
}

pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| Settings {
        notify: true,
        ..Default::default()
    })
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("`{name}` has an invalid value: `{value}`")),
        Err(_) => Ok(None),
    }
}
