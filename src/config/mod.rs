//! YAML configuration with environment overrides.

mod types;

pub use types::{
    BaseConfig, Config, ConfigError, FileTypesConfig, LoggingConfig, OrganizerConfig,
    ScraperConfig, DEFAULT_CONFIG_PATH,
};

use crate::fileops::FsRelocator;
use crate::scanner::ScanOptions;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_SOURCE_DIR: &str = "JAVDB2FOLDER_SOURCE_DIR";
pub const ENV_OUTPUT_DIR: &str = "JAVDB2FOLDER_OUTPUT_DIR";
pub const ENV_BASE_URL: &str = "JAVDB_BASE_URL";
pub const ENV_COOKIE_FILE: &str = "JAVDB_COOKIE_FILE";

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicitly given file must exist. A missing file at the default
    /// location means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::NotFound(path));
                }
                debug!(path = ?path, "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        info!(path = ?path, "Loaded config file");
        Self::from_yaml(&content, &path)
    }

    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_SOURCE_DIR) {
            debug!(key = ENV_SOURCE_DIR, value = %dir, "Override");
            self.base.source_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            debug!(key = ENV_OUTPUT_DIR, value = %dir, "Override");
            self.base.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(ENV_BASE_URL) {
            debug!(key = ENV_BASE_URL, value = %url, "Override");
            self.scraper.javdb.base_url = url;
        }
        if let Some(file) = get(ENV_COOKIE_FILE) {
            debug!(key = ENV_COOKIE_FILE, value = %file, "Override");
            self.scraper.javdb.cookie_file = Some(PathBuf::from(file));
        }
    }

    /// Make the source directory absolute against `cwd` and the output
    /// directory absolute against the source directory
    pub fn resolve_paths(&mut self, cwd: &Path) {
        if self.base.source_dir.is_relative() {
            self.base.source_dir = cwd.join(&self.base.source_dir);
        }
        if self.base.output_dir.is_relative() {
            self.base.output_dir = self.base.source_dir.join(&self.base.output_dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organizer.retry_count < 1 {
            return Err(ConfigError::Invalid(
                "organizer.retry_count must be at least 1".to_string(),
            ));
        }
        if self.file_types.video.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "file_types.video must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new(
            self.file_types.video.iter().filter(|e| !e.trim().is_empty()),
            self.base.skip_hidden_files,
            self.base.exclude_dirs.iter().cloned(),
        )
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.organizer
            .trash_dir
            .clone()
            .unwrap_or_else(FsRelocator::default_trash_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MatchStrictness;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.base.source_dir, PathBuf::from("."));
        assert_eq!(config.base.output_dir, PathBuf::from("output"));
        assert!(config.base.skip_hidden_files);
        assert!(config.base.exclude_dirs.contains(&"@eaDir".to_string()));
        assert_eq!(config.file_types.video.len(), 13);
        assert_eq!(config.scraper.javdb.base_url, "https://javdb.com");
        assert_eq!(config.scraper.javdb.timeout_ms, 10_000);
        assert_eq!(config.scraper.javdb.image_timeout_ms, 30_000);
        assert_eq!(config.organizer.retry_count, 3);
        assert_eq!(config.organizer.retry_delay_ms, 1_000);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "\
base:
  output_dir: sorted
scraper:
  javdb:
    retry: 5
    image_timeout_ms: 60000
    match_strictness: prefix
organizer:
  retry_count: 2
";
        let config = Config::from_yaml(yaml, Path::new("test.yml")).unwrap();

        assert_eq!(config.base.output_dir, PathBuf::from("sorted"));
        assert_eq!(config.base.source_dir, PathBuf::from("."));
        assert_eq!(config.scraper.javdb.retry, 5);
        assert_eq!(config.scraper.javdb.image_timeout_ms, 60_000);
        assert_eq!(config.scraper.javdb.timeout_ms, 10_000);
        assert_eq!(config.scraper.javdb.match_strictness, MatchStrictness::Prefix);
        assert_eq!(config.scraper.javdb.base_url, "https://javdb.com");
        assert_eq!(config.organizer.retry_count, 2);
        assert_eq!(config.organizer.retry_delay_ms, 1_000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("  \n", Path::new("empty.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Config::from_yaml("base: [unclosed", Path::new("bad.yml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_explicit_missing_is_error() {
        let dir = tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.yml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "logging:\n  enabled: true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = Config::default();
        config.base.source_dir = PathBuf::from("videos");

        config.resolve_paths(Path::new("/data"));

        assert_eq!(config.base.source_dir, PathBuf::from("/data/videos"));
        assert_eq!(config.base.output_dir, PathBuf::from("/data/videos/output"));
    }

    #[test]
    fn test_resolve_keeps_absolute_output() {
        let mut config = Config::default();
        config.base.output_dir = PathBuf::from("/library");

        config.resolve_paths(Path::new("/data"));

        assert_eq!(config.base.source_dir, PathBuf::from("/data/."));
        assert_eq!(config.base.output_dir, PathBuf::from("/library"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SOURCE_DIR, "/videos"),
            (ENV_BASE_URL, "https://mirror.example.com"),
            (ENV_COOKIE_FILE, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base.source_dir, PathBuf::from("/videos"));
        assert_eq!(config.base.output_dir, PathBuf::from("output"));
        assert_eq!(config.scraper.javdb.base_url, "https://mirror.example.com");
        assert_eq!(
            config.scraper.javdb.cookie_file,
            Some(PathBuf::from("config/cookie.txt"))
        );
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.organizer.retry_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.file_types.video.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_scan_options() {
        let mut config = Config::default();
        config.file_types.video = vec!["MP4".to_string(), "".to_string()];

        let options = config.scan_options();
        assert!(options.is_video("a.mp4"));
        assert!(!options.is_video("a.mkv"));
        assert!(options.exclude_dirs.contains("node_modules"));
    }
}
