use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use jiuyu::models::FeatureLevel;
use jiuyu::reference::{LevelColumns, LevelSource};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub document: PathBuf,
    pub maps_dir: PathBuf,
    pub layers: LayerConfig,
    pub columns: ColumnConfig,
}

/// Per-level file paths, relative to `maps_dir`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LayerConfig {
    pub country: PathBuf,
    pub province: PathBuf,
    pub city: PathBuf,
    pub district: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub country: LevelColumns,
    pub province: LevelColumns,
    pub city: LevelColumns,
    pub district: LevelColumns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: PathBuf::from("output.md"),
            maps_dir: PathBuf::from("maps"),
            layers: LayerConfig::default(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            country: PathBuf::from("1.Country/country.geojson"),
            province: PathBuf::from("2.Province/province.geojson"),
            city: PathBuf::from("3.City/city.geojson"),
            district: PathBuf::from("4.District/district.geojson"),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            country: LevelColumns::defaults(FeatureLevel::Country),
            province: LevelColumns::defaults(FeatureLevel::Province),
            city: LevelColumns::defaults(FeatureLevel::City),
            district: LevelColumns::defaults(FeatureLevel::District),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path)
                .with_context(|| format!("Config: {}", path.display())),
            None => Ok(Self::default()),
        }
    }

    /// Sources for every level, country first.
    pub fn level_sources(&self) -> Vec<LevelSource> {
        [
            (FeatureLevel::Country, &self.layers.country, &self.columns.country),
            (FeatureLevel::Province, &self.layers.province, &self.columns.province),
            (FeatureLevel::City, &self.layers.city, &self.columns.city),
            (FeatureLevel::District, &self.layers.district, &self.columns.district),
        ]
        .into_iter()
        .map(|(level, path, columns)| LevelSource {
            level,
            path: self.maps_dir.join(path),
            columns: columns.clone(),
        })
        .collect()
    }
}
