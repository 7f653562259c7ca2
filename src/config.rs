use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::AvifloraError;

/// On-disk shape of `aviflora.json`. Every field is optional; anything left
/// out falls back to a default relative to the current directory.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub media_dir: Option<String>,
    #[serde(default)]
    pub birds_csv: Option<String>,
    #[serde(default)]
    pub plants_csv: Option<String>,
    #[serde(default)]
    pub export_csv: Option<String>,
    #[serde(default)]
    pub gaps_csv: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub db_path: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub media_dir: Utf8PathBuf,
    pub birds_csv: Utf8PathBuf,
    pub plants_csv: Utf8PathBuf,
    pub export_csv: Utf8PathBuf,
    pub gaps_csv: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the effective configuration. An explicit path must exist and
    /// parse; the default `aviflora.json` is optional and its absence just
    /// yields the defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AvifloraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("aviflora.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| AvifloraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AvifloraError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            db_path: path_or(config.db_path, "catalog.db"),
            cache_dir: path_or(config.cache_dir, "cache/species"),
            media_dir: path_or(config.media_dir, "media/species"),
            birds_csv: path_or(config.birds_csv, "birds.csv"),
            plants_csv: path_or(config.plants_csv, "plants.csv"),
            export_csv: path_or(config.export_csv, "enriched.csv"),
            gaps_csv: path_or(config.gaps_csv, "gaps.csv"),
        }
    }
}

fn path_or(value: Option<String>, default: &str) -> Utf8PathBuf {
    value
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| Utf8PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.db_path, "catalog.db");
        assert_eq!(resolved.cache_dir, "cache/species");
        assert_eq!(resolved.export_csv, "enriched.csv");
    }

    #[test]
    fn overrides_take_effect() {
        let config = Config {
            db_path: Some("/data/catalog.db".to_string()),
            gaps_csv: Some("missing.csv".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config);
        assert_eq!(resolved.db_path, "/data/catalog.db");
        assert_eq!(resolved.gaps_csv, "missing.csv");
        assert_eq!(resolved.birds_csv, "birds.csv");
    }
}
