use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::infra::opensubtitles::{ServiceSettings, DEFAULT_SERVER, DEFAULT_USER_AGENT};
use crate::media::encoding::DEFAULT_ENCODINGS;
use crate::workflows::correlator::{CorrelationPolicy, KeyMatching};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub languages: Vec<String>,
    pub choose_subtitle: bool,
    pub matching: MatchingConfig,
    pub encoding: EncodingConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    pub strict_episode_keys: bool,
    pub single_pair_shortcut: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncodingConfig {
    pub candidates: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: String,
    pub user_agent: String,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            choose_subtitle: false,
            matching: MatchingConfig::default(),
            encoding: EncodingConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strict_episode_keys: false,
            single_pair_shortcut: true,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads the config file (explicit path, else the default location if it
    /// exists), then applies the environment and command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::read(path)?,
            None => {
                let path = get_config_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(languages) = env::var("SUBTITLER_LANGUAGES") {
            config.languages = split_languages(&languages);
        }
        config.apply_cli(cli);
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(languages) = &cli.languages {
            self.languages = languages
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
        }
        if cli.choose_subtitle {
            self.choose_subtitle = true;
        }
        if cli.strict_episodes {
            self.matching.strict_episode_keys = true;
        }
        if cli.no_single_pair_shortcut {
            self.matching.single_pair_shortcut = false;
        }
    }

    pub fn correlation_policy(&self) -> CorrelationPolicy {
        CorrelationPolicy {
            matching: if self.matching.strict_episode_keys {
                KeyMatching::Strict
            } else {
                KeyMatching::Loose
            },
            single_pair_shortcut: self.matching.single_pair_shortcut,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            url: self.service.url.clone(),
            user_agent: self.service.user_agent.clone(),
            language: self.service.language.clone(),
            timeout: Duration::from_secs(self.service.timeout_secs),
        }
    }
}

fn split_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subtitler"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.languages, vec!["eng"]);
        assert!(config.matching.single_pair_shortcut);
        assert_eq!(config.correlation_policy(), CorrelationPolicy::default());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::from_toml(
            r#"
languages = ["eng", "pob"]
choose_subtitle = true

[matching]
strict_episode_keys = true

[service]
timeout_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.languages, vec!["eng", "pob"]);
        assert!(config.choose_subtitle);
        assert_eq!(config.correlation_policy().matching, KeyMatching::Strict);
        assert!(config.correlation_policy().single_pair_shortcut);
        assert_eq!(config.service.url, DEFAULT_SERVER);
        assert_eq!(config.service_settings().timeout, Duration::from_secs(5));
        assert_eq!(config.encoding.candidates.len(), DEFAULT_ENCODINGS.len());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(Config::from_toml("languages = 3").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "languages = [\"fre\"]").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "subtitler",
            "--config",
            path.as_str(),
            "--languages",
            "eng, ger",
            "--choose-subtitle",
            "--no-single-pair-shortcut",
            "videos",
        ]);
        let mut config = Config::read(file.path()).unwrap();
        assert_eq!(config.languages, vec!["fre"]);

        config.apply_cli(&cli);
        assert_eq!(config.languages, vec!["eng", "ger"]);
        assert!(config.choose_subtitle);
        assert!(!config.correlation_policy().single_pair_shortcut);
        assert_eq!(cli.inputs, vec![PathBuf::from("videos")]);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = Cli::parse_from(["subtitler", "--config", "/nonexistent/subtitler.toml"]);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn test_split_languages() {
        assert_eq!(split_languages("eng, pob,,"), vec!["eng", "pob"]);
    }
}
