//! Configuration management for opsreport
//!
//! Handles loading and parsing of the application config file:
//! - credential profiles to report on (or "all configured")
//! - region list
//! - output directory and worker-pool size
//!
//! Nothing here is bound at import time; reports receive the loaded config
//! explicitly so they stay independently testable.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::profiles;
use crate::utils::expand_tilde;

/// Regions reports fan out over when neither the config file nor the CLI
/// pins a list.
pub const DEFAULT_REGIONS: &[&str] = &["us-east-1", "eu-central-1"];

/// Main configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub profiles: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    #[serde(rename = "outputDir")]
    pub output_dir: Option<String>,
    pub workers: Option<usize>,
}

/// Application configuration manager
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    config: ConfigFile,
}

impl AppConfig {
    /// Load configuration from `~/.config/opsreport/config.json`, falling
    /// back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let config: ConfigFile = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            ConfigFile::default()
        };

        Ok(Self { config })
    }

    /// CLI overrides take precedence over the config file.
    pub fn override_profiles(&mut self, profiles: Option<Vec<String>>) {
        if profiles.is_some() {
            self.config.profiles = profiles;
        }
    }

    pub fn override_regions(&mut self, regions: Option<Vec<String>>) {
        if regions.is_some() {
            self.config.regions = regions;
        }
    }

    pub fn override_output_dir(&mut self, output_dir: Option<PathBuf>) {
        if let Some(dir) = output_dir {
            self.config.output_dir = Some(dir.to_string_lossy().into_owned());
        }
    }

    /// Profiles to report on: the pinned list if one is configured,
    /// otherwise everything in the AWS shared config files.
    pub fn resolve_profiles(&self) -> crate::error::Result<Vec<String>> {
        match &self.config.profiles {
            Some(profiles) if !profiles.is_empty() => Ok(profiles.clone()),
            _ => profiles::available_profiles(),
        }
    }

    pub fn regions(&self) -> Vec<String> {
        match &self.config.regions {
            Some(regions) if !regions.is_empty() => regions.clone(),
            _ => DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// First configured region, used by single-region reports.
    pub fn primary_region(&self) -> String {
        self.regions()
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_REGIONS[0].to_string())
    }

    pub fn workers(&self) -> Option<usize> {
        self.config.workers
    }

    /// Directory reports are written to. Defaults to the user's Downloads
    /// folder like the reports this replaces.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config.output_dir {
            return PathBuf::from(expand_tilde(dir));
        }
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".config/opsreport/config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_regions_when_unset() {
        let config = AppConfig::default();
        assert_eq!(config.regions(), vec!["us-east-1", "eu-central-1"]);
        assert_eq!(config.primary_region(), "us-east-1");
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{
            "profiles": ["prod", "staging"],
            "regions": ["eu-west-1"],
            "outputDir": "~/reports",
            "workers": 3
        }"#;
        let parsed: ConfigFile = serde_json::from_str(json).unwrap();
        let config = AppConfig { config: parsed };

        assert_eq!(config.resolve_profiles().unwrap(), vec!["prod", "staging"]);
        assert_eq!(config.regions(), vec!["eu-west-1"]);
        assert_eq!(config.workers(), Some(3));
        assert!(config.output_dir().ends_with("reports"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig {
            config: ConfigFile {
                regions: Some(vec!["eu-west-1".into()]),
                ..ConfigFile::default()
            },
        };
        config.override_regions(Some(vec!["ap-southeast-1".into()]));
        assert_eq!(config.regions(), vec!["ap-southeast-1"]);

        // None leaves the configured value alone
        config.override_regions(None);
        assert_eq!(config.regions(), vec!["ap-southeast-1"]);
    }
}
