use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub product: ProductSettings,
    pub polling: PollingSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    pub data_url: String,
    pub orders_url: String,
    pub timeout_secs: u64,
    pub max_search_pages: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            data_url: "https://api.planet.com/data/v1".to_string(),
            orders_url: "https://api.planet.com/compute/ops/orders/v2".to_string(),
            timeout_secs: 60,
            max_search_pages: 10,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What gets searched for and ordered.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ProductSettings {
    pub item_type: String,
    pub asset_type: String,
    pub permission: String,
    pub product_bundle: String,
    pub order_name: String,
}

impl Default for ProductSettings {
    fn default() -> Self {
        Self {
            item_type: "PSScene".to_string(),
            asset_type: "ortho_visual".to_string(),
            permission: "assets.analytic:download".to_string(),
            product_bundle: "visual".to_string(),
            order_name: "simple order".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// Every attempt after the first submits a brand-new order.
    #[default]
    Recreate,
    /// Later attempts re-query the first order by id.
    Repoll,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PollingSettings {
    pub cooldown_secs: u64,
    pub max_attempts: u32,
    pub retry_mode: RetryMode,
}

impl Default for PollingSettings {
    fn default() -> Self {
        // Planet documents that most orders complete within two minutes
        Self {
            cooldown_secs: 120,
            max_attempts: 2,
            retry_mode: RetryMode::Recreate,
        }
    }
}

impl PollingSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Settings {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let settings: Self = toml::from_str(&table.to_string())?;
        Ok(settings)
    }
}
