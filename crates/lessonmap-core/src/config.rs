use crate::lesson::{Grade, Model};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variables read for each override.
pub const ENV_API_URL: &str = "LESSONMAP_API_URL";
pub const ENV_MODEL: &str = "LESSONMAP_MODEL";
pub const ENV_GRADE: &str = "LESSONMAP_GRADE";

/// Client configuration as stored in `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_grade")]
    pub default_grade: String,
    /// Overrides the directory of the persistent content store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    Model::default().to_string()
}

fn default_grade() -> String {
    Grade::default().to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_model: default_model(),
            default_grade: default_grade(),
            store_dir: None,
        }
    }
}

/// Values that take precedence over the file. The CLI fills them from flags,
/// falling back to the `LESSONMAP_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub grade: Option<String>,
}

impl ClientConfig {
    /// Applies overrides on top of this (file or default) configuration.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(api_url) = overrides.api_url {
            self.api_url = api_url;
        }
        if let Some(model) = overrides.model {
            self.default_model = model;
        }
        if let Some(grade) = overrides.grade {
            self.default_grade = grade;
        }
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Sets a key by name, as `config set <key> <value>` does.
    pub fn set(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        match key {
            "api_url" => self.api_url = value.to_string(),
            "default_model" => self.default_model = value.to_string(),
            "default_grade" => self.default_grade = value.to_string(),
            "store_dir" => {
                self.store_dir = Some(value)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            }
            other => {
                return Err(crate::error::LessonMapError::config(format!(
                    "unknown key '{other}' (expected api_url, default_model, default_grade or store_dir)"
                )));
            }
        }
        Ok(())
    }
}
