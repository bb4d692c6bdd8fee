use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::Result,
    models::{Grouping, StyleVariant},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: String,
    pub api_base: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub chunk_size: usize,
    pub pacing_ms: u64,
    pub grouping: Grouping,
    pub style: StyleVariant,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: "decklist-meta.json".to_owned(),
            api_base: "https://api.scryfall.com".to_owned(),
            user_agent: format!("MTGDecklist/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 15,
            chunk_size: crate::mtg::COLLECTION_LIMIT,
            pacing_ms: 110,
            grouping: Grouping::Alpha,
            style: StyleVariant::A,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        // the catalog refuses bigger collection requests
        config.chunk_size = config.chunk_size.clamp(1, crate::mtg::COLLECTION_LIMIT);
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
