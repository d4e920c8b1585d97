// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::grammar::{DEFAULT_PRIORITY_TAGS, PriorityTags};
use crate::storage::LocalStorage;
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_project_tag() -> String {
    "projects".to_string()
}

fn default_individual_task_tag() -> String {
    "individualtasks".to_string()
}

fn default_priority_tags() -> Vec<String> {
    DEFAULT_PRIORITY_TAGS.iter().map(|t| t.to_string()).collect()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Documents tagged with this show their first actionable task.
    #[serde(default = "default_project_tag")]
    pub project_tag: String,
    /// Documents tagged with this show every actionable task.
    #[serde(default = "default_individual_task_tag")]
    pub individual_task_tag: String,
    /// Highest priority first.
    #[serde(default = "default_priority_tags")]
    pub priority_tags: Vec<String>,
    /// Root directory of the notes. The `--vault` flag takes precedence.
    #[serde(default)]
    pub vault: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_tag: default_project_tag(),
            individual_task_tag: default_individual_task_tag(),
            priority_tags: default_priority_tags(),
            vault: None,
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Detects whether an error means the config file was missing, either through the
    /// explicit not-found message or an IO `NotFound` anywhere in the error chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    /// The normalized priority tag list. Never empty.
    pub fn priority_tags(&self) -> PriorityTags {
        PriorityTags::new(&self.priority_tags)
    }

    /// Parses the comma-separated form, e.g. `"p1, p2,,p3"`.
    pub fn priority_tags_from_csv(csv: &str) -> Vec<String> {
        csv.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_missing_config_is_detected() {
        let ctx = TestContext::new();
        let err = Config::load(&ctx).unwrap_err();
        assert!(Config::is_missing_config_error(&err));
        assert_eq!(Config::load_or_default(&ctx).unwrap(), Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let ctx = TestContext::new();
        let config = Config {
            project_tag: "work".to_string(),
            priority_tags: vec!["high".to_string(), "low".to_string()],
            vault: Some(PathBuf::from("/notes")),
            ..Config::default()
        };
        config.save(&ctx).unwrap();
        assert_eq!(Config::load(&ctx).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "project_tag = \"#areas\"\n").unwrap();

        let config = Config::load(&ctx).unwrap();
        assert_eq!(config.project_tag, "#areas");
        assert_eq!(config.individual_task_tag, "individualtasks");
        assert_eq!(config.priority_tags.len(), 7);
        assert_eq!(config.vault, None);
    }

    #[test]
    fn test_malformed_file_is_not_missing() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "priority_tags = 12").unwrap();

        let err = Config::load(&ctx).unwrap_err();
        assert!(!Config::is_missing_config_error(&err));
        assert!(Config::load_or_default(&ctx).is_err());
    }

    #[test]
    fn test_priority_tags_normalized() {
        let config = Config {
            priority_tags: vec![" ".to_string(), String::new()],
            ..Config::default()
        };
        assert_eq!(config.priority_tags().len(), 7);
        assert_eq!(
            Config::priority_tags_from_csv("p1, p2,,p3 "),
            vec!["p1", "p2", "p3"]
        );
    }
}
