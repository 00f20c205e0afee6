//! Runtime settings: survey grid geometry, tile source and store location.

use crate::coord::SurveyPoint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Name of the vector tile layer holding building footprints.
pub const DEFAULT_BUILDING_LAYER: &str = "bld_fts_buildingpart";

/// Geometry of the survey tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Top-left corner of the tile matrix in survey coordinates.
    pub origin: SurveyPoint,
    /// Survey units per cell.
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        // OS NGD tile matrix for EPSG:27700.
        Self {
            origin: SurveyPoint::new(-238_375.0, 1_376_256.0),
            cell_size: 0.875,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(Error::Config(format!(
                "cell_size must be a positive finite number, got {}",
                self.cell_size
            )));
        }
        if !(self.origin.x.is_finite() && self.origin.y.is_finite()) {
            return Err(Error::Config("grid origin must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the tiles API; `/{row}/{col}?key=...` is appended.
    pub base_url: String,
    pub api_key: String,
    /// Layer scanned for building features.
    pub layer: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            layer: DEFAULT_BUILDING_LAYER.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn tile_url(&self, row: i32, col: i32) -> String {
        format!(
            "{}/{}/{}?key={}",
            self.base_url.trim_end_matches('/'),
            row,
            col,
            self.api_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridConfig,
    pub source: SourceConfig,
    /// Directory of the persistent tile store.
    pub store_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            source: SourceConfig::default(),
            store_dir: PathBuf::from("tiles_store"),
        }
    }
}

impl Settings {
    /// Load settings from a JSON document; absent fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let settings: Settings = serde_json::from_reader(reader)?;
        settings.grid.validate()?;
        Ok(settings)
    }
}
