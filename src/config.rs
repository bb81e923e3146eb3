use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Level, Rating, ReviewScore};

/// Where the CLI looks for its configuration unless told otherwise
pub const DEFAULT_CONFIG_PATH: &str = ".crev-helper/config.yml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crev: CrevConfig,
    pub review: ReviewDefaults,
}

/// Where the tool lives and where its scratch files go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrevConfig {
    /// The `cargo` executable; `crev` is invoked as its subcommand
    pub cargo: PathBuf,
    /// Holds the scratch project, the review draft and the editor shim
    pub scratch_dir: PathBuf,
    /// How long the editor shim waits before touching the file it wrote
    pub editor_delay_secs: u64,
}

impl Default for CrevConfig {
    fn default() -> Self {
        Self {
            cargo: PathBuf::from("cargo"),
            scratch_dir: std::env::temp_dir().join("crev-helper"),
            editor_delay_secs: 1,
        }
    }
}

impl CrevConfig {
    pub fn scratch_project(&self) -> PathBuf {
        self.scratch_dir.join("cargo-crev-helper-repo")
    }

    pub fn draft_path(&self) -> PathBuf {
        self.scratch_dir.join("cargo-crev-review-draft.yaml")
    }

    pub fn shim_path(&self) -> PathBuf {
        self.scratch_dir.join("cat-cargo-crev-review-draft-to-file.sh")
    }
}

/// Defaults for new reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewDefaults {
    pub thoroughness: Level,
    pub understanding: Level,
    pub rating: Rating,
    /// Publish the proof repository after submitting a review
    pub publish: bool,
}

impl Default for ReviewDefaults {
    fn default() -> Self {
        let score = ReviewScore::default();
        Self {
            thoroughness: score.thoroughness,
            understanding: score.understanding,
            rating: score.rating,
            publish: true,
        }
    }
}

impl ReviewDefaults {
    pub fn score(&self) -> ReviewScore {
        ReviewScore {
            thoroughness: self.thoroughness,
            understanding: self.understanding,
            rating: self.rating,
        }
    }
}

impl Config {
    /// Read a YAML config file. A file that does not exist means defaults;
    /// any other read or parse failure is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()));
            }
        };

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(
            path = %path.display(),
            cargo = %config.crev.cargo.display(),
            "Loaded configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crev.cargo, PathBuf::from("cargo"));
        assert_eq!(config.crev.editor_delay_secs, 1);
        assert_eq!(config.review.score(), ReviewScore::default());
        assert!(config.review.publish);
    }

    #[test]
    fn test_scratch_paths_live_in_scratch_dir() {
        let crev = CrevConfig {
            scratch_dir: PathBuf::from("/var/tmp/x"),
            ..CrevConfig::default()
        };
        assert_eq!(crev.scratch_project(), PathBuf::from("/var/tmp/x/cargo-crev-helper-repo"));
        assert_eq!(
            crev.draft_path(),
            PathBuf::from("/var/tmp/x/cargo-crev-review-draft.yaml")
        );
        assert!(crev.shim_path().starts_with("/var/tmp/x"));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
crev:
  cargo: /opt/rust/bin/cargo
  editor_delay_secs: 2

review:
  thoroughness: high
  rating: strong
  publish: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.crev.cargo, PathBuf::from("/opt/rust/bin/cargo"));
        assert_eq!(config.crev.editor_delay_secs, 2);
        assert_eq!(config.crev.scratch_dir, CrevConfig::default().scratch_dir);
        assert_eq!(config.review.thoroughness, Level::High);
        assert_eq!(config.review.understanding, Level::Medium);
        assert_eq!(config.review.rating, Rating::Strong);
        assert!(!config.review.publish);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.yml")).unwrap();
        assert_eq!(config.crev, CrevConfig::default());
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "crev:\n  editor_delay_secs: 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.crev.editor_delay_secs, 5);
        assert_eq!(config.crev.cargo, PathBuf::from("cargo"));
    }

    #[test]
    fn test_bad_level_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "review:\n  thoroughness: High\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
