use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::available::{AvailabilityLabels, AvailabilityPolicy};
use crate::error::ConfigError;
use crate::fetch::FetchOptions;

pub const DEFAULT_CONFIG_FILE: &str = "buddy-stats.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub availability: AvailabilityPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_buddy_exchange")]
    pub buddy_exchange: String,
    #[serde(default = "default_needs_codechecker")]
    pub needs_codechecker: String,
    /// Label filter of the leaderboard and buddy queries, empty for none
    #[serde(default = "default_buddy_exchange")]
    pub tracked: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_page_size")]
    pub page_size: u8,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            buddy_exchange: default_buddy_exchange(),
            needs_codechecker: default_needs_codechecker(),
            tracked: default_buddy_exchange(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_buddy_exchange() -> String {
    "buddy exchange".to_string()
}
fn default_needs_codechecker() -> String {
    "needs codechecker".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_page_size() -> u8 {
    FetchOptions::default().page_size
}
fn default_max_pages() -> u32 {
    FetchOptions::default().max_pages
}

impl Configuration {
    /// Read the configuration file.
    ///
    /// With no explicit path, a missing `buddy-stats.toml` in the current
    /// directory is not an error: every setting has a default except the
    /// repository, which can come from the environment or the command line.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            debug!("no {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        info!("reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// `GH_OWNER` and `GH_REPO` take precedence over the file.
    pub fn apply_env(mut self) -> Self {
        if let Ok(owner) = std::env::var("GH_OWNER") {
            self.repository.owner = owner;
        }
        if let Ok(name) = std::env::var("GH_REPO") {
            self.repository.name = name;
        }
        self
    }

    pub fn with_repository(mut self, owner: Option<String>, name: Option<String>) -> Self {
        if let Some(owner) = owner {
            self.repository.owner = owner;
        }
        if let Some(name) = name {
            self.repository.name = name;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.owner.trim().is_empty() || self.repository.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "repository owner and name are required (config file, GH_OWNER/GH_REPO or --owner/--repo)"
                    .into(),
            ));
        }
        if self.fetch.max_pages == 0 {
            return Err(ConfigError::Invalid("fetch.max_pages must be at least 1".into()));
        }
        if self.fetch.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("fetch.api_base must not be empty".into()));
        }
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.fetch.page_size,
            max_pages: self.fetch.max_pages,
        }
    }

    pub fn availability_labels(&self) -> AvailabilityLabels {
        AvailabilityLabels {
            buddy_exchange: self.labels.buddy_exchange.clone(),
            needs_codechecker: self.labels.needs_codechecker.clone(),
        }
    }

    pub fn tracked_label(&self) -> Option<&str> {
        let label = self.labels.tracked.trim();
        (!label.is_empty()).then_some(label)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn from_file(content: &str) -> Result<Configuration, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        Configuration::load(Some(file.path()))
    }

    #[test]
    fn test_defaults() {
        let config = from_file("[repository]\nowner = \"codecheckers\"\nname = \"register\"\n")
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.fetch.page_size, 100);
        assert_eq!(config.fetch.max_pages, 10);
        assert_eq!(config.fetch.api_base, "https://api.github.com");
        assert_eq!(config.tracked_label(), Some("buddy exchange"));
        assert!(!config.availability.require_buddy_label);
        assert_eq!(config.availability_labels(), AvailabilityLabels::default());
    }

    #[test]
    fn test_full_file() {
        let config = from_file(
            r#"
[repository]
owner = "o"
name = "r"

[labels]
needs_codechecker = "help wanted"
tracked = ""

[fetch]
page_size = 30
max_pages = 2

[availability]
require_buddy_label = true
"#,
        )
        .unwrap();
        assert_eq!(config.labels.needs_codechecker, "help wanted");
        assert_eq!(config.labels.buddy_exchange, "buddy exchange");
        assert_eq!(config.tracked_label(), None);
        assert_eq!(
            config.fetch_options(),
            FetchOptions {
                page_size: 30,
                max_pages: 2
            }
        );
        assert!(config.availability.require_buddy_label);
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = Configuration::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(from_file("repository = 3"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_repository_is_required() {
        let config = Configuration::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = config.with_repository(Some("o".into()), Some("r".into()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_pages_is_invalid() {
        let mut config =
            Configuration::default().with_repository(Some("o".into()), Some("r".into()));
        config.fetch.max_pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
