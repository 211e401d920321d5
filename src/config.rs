use std::path::{Path, PathBuf};

use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use serde::{Deserialize, Serialize};

use crate::archive_import::ImportOptions;

const DEFAULT_UPLOAD_LIMIT_MB: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    database: String,
    media_directory: String,
    #[serde(default = "default_upload_limit_mb")]
    upload_limit_mb: usize,
    #[serde(default)]
    import: ImportConfig,
}

/// Prices given to albums and tracks created by the importer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub album_price: f64,
    #[serde(default)]
    pub track_price: f64,
}

impl ImportConfig {
    fn validate(&self) -> Result<()> {
        for (name, price) in [
            ("album_price", self.album_price),
            ("track_price", self.track_price),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(eyre!("import.{name} must be a non-negative number, got {price}"));
            }
        }
        Ok(())
    }
}

fn default_upload_limit_mb() -> usize {
    DEFAULT_UPLOAD_LIMIT_MB
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "~/.local/share/music-store/music-store.db".to_string(),
            media_directory: "~/.local/share/music-store/media".to_string(),
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
            import: ImportConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.import.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("music-store").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_else(|| eyre!("No config directory found"))?;

        Self::from_file(&config_path)
    }

    /// Write the default config, leaving an existing file untouched
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or_else(|| eyre!("No config directory found"))?;
        if config_path.exists() {
            tracing::info!("Config already exists at {}", config_path.display());
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).wrap_err("Failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .wrap_err_with(|| format!("Failed to write config: {}", config_path.display()))?;

        Ok(config_path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    pub fn media_directory(&self) -> PathBuf {
        self.expand_path(&self.media_directory)
    }

    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb * 1024 * 1024
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            album_price: self.import.album_price,
            track_price: self.import.track_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            database = "/srv/store.db"
            media_directory = "/srv/media"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/srv/store.db"));
        assert_eq!(config.upload_limit_bytes(), 200 * 1024 * 1024);
        assert_eq!(config.import_options().track_price, 0.0);
    }

    #[test]
    fn test_import_prices() {
        let config = Config::from_toml(
            r#"
            database = "store.db"
            media_directory = "media"
            upload_limit_mb = 5

            [import]
            album_price = 9.5
            track_price = 1.25
            "#,
        )
        .unwrap();

        let options = config.import_options();
        assert_eq!(options.album_price, 9.5);
        assert_eq!(options.track_price, 1.25);
        assert_eq!(config.upload_limit_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_import_prices_are_rejected() {
        for import in ["album_price = -1.0", "track_price = inf", "track_price = nan"] {
            let contents = format!(
                "database = \"store.db\"\nmedia_directory = \"media\"\n[import]\n{import}\n"
            );
            assert!(Config::from_toml(&contents).is_err(), "{import} was accepted");
        }
    }

    #[test]
    fn test_expand_home() {
        let config = Config::default();
        let media = config.media_directory();
        if let Some(home) = dirs::home_dir() {
            assert!(media.starts_with(home));
        }
        assert!(media.ends_with("music-store/media"));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let contents = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed = Config::from_toml(&contents).unwrap();
        assert_eq!(parsed.database, Config::default().database);
    }

    #[test]
    fn test_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
