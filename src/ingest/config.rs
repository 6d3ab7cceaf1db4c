use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use cypress_tiger::models::DEFAULT_COUNTRY;
use cypress_tiger::InterpolationConfig;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub interpolation: InterpolationConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdminConfig {
    pub country: String,
    pub fips_file: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            country: DEFAULT_COUNTRY.to_string(),
            fips_file: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let InterpolationConfig { offset, min_gap } = self.interpolation;
        ensure!(offset.is_finite(), "interpolation.offset must be finite");
        ensure!(
            min_gap.is_finite() && min_gap >= 0.0,
            "interpolation.min_gap must be a non-negative number"
        );
        Ok(())
    }
}
