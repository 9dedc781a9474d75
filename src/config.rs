//! Configuration loading.
//!
//! Looked up in order: an explicit path, the nearest `.fbp-lens.toml` from
//! the document's directory upward, `~/.config/fbp-lens/config.toml`, then
//! built-in defaults.

use crate::component::{AnalysisOptions, DEFAULT_COMMENT_WINDOW};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

pub const PROJECT_CONFIG_FILE: &str = ".fbp-lens.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML in {path}: {source}")]
    TomlError {
        path: Utf8PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub resolve: ResolveConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Max bytes between a comment's end and the key it documents.
    pub comment_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            comment_window: DEFAULT_COMMENT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Appended to a component reference to form its file name.
    pub suffix: String,
    /// File marking a package root.
    pub manifest: String,
    /// Dependency directory under a package root.
    pub modules_dir: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            suffix: ".node.js".to_string(),
            manifest: "package.json".to_string(),
            modules_dir: "node_modules".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::TomlError {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve the configuration that applies to files under `start`.
    pub fn discover(explicit: Option<&Utf8Path>, start: &Utf8Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = find_project_config(start) {
            tracing::debug!("using project config {}", path);
            return Self::from_file(&path);
        }

        if let Some(path) = user_config_path().filter(|p| p.is_file()) {
            tracing::debug!("using user config {}", path);
            return Self::from_file(&path);
        }

        Ok(Self::default())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            comment_window: self.analysis.comment_window,
            ..AnalysisOptions::default()
        }
    }
}

fn find_project_config(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let start = if start.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        start
    };
    let start = std::path::absolute(start)
        .ok()
        .and_then(|abs| Utf8PathBuf::try_from(abs).ok())
        .unwrap_or_else(|| start.to_owned());
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// `~/.config/fbp-lens/config.toml`
pub fn user_config_path() -> Option<Utf8PathBuf> {
    let home = home::home_dir()?;
    let home = Utf8PathBuf::try_from(home).ok()?;
    Some(home.join(".config/fbp-lens/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.analysis.comment_window, 3);
        assert_eq!(config.resolve.suffix, ".node.js");
        assert_eq!(config.resolve.manifest, "package.json");
        assert_eq!(config.resolve.modules_dir, "node_modules");
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
[analysis]
comment_window = 6

[resolve]
suffix = ".component.js"
"#,
        )
        .unwrap();
        assert_eq!(config.analysis.comment_window, 6);
        assert_eq!(config.resolve.suffix, ".component.js");
        assert_eq!(config.resolve.modules_dir, "node_modules");
        assert_eq!(config.analysis_options().comment_window, 6);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_toml("[analysis]\nwindow = 1\n").is_err());
    }

    #[test]
    fn test_discover_project_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(
            root.join(PROJECT_CONFIG_FILE),
            "[analysis]\ncomment_window = 9\n",
        )
        .unwrap();
        let nested = root.join("graphs/sub");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(None, &nested).unwrap();
        assert_eq!(config.analysis.comment_window, 9);
    }

    #[test]
    fn test_explicit_path_errors_surface() {
        let missing = Utf8Path::new("/definitely/not/here/fbp-lens.toml");
        assert!(matches!(
            Config::discover(Some(missing), Utf8Path::new("/")),
            Err(ConfigError::ReadError { .. })
        ));
    }
}
