use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fill::DEFAULT_MAX_RELOAD;
use crate::tilebelt::MAX_ZOOM;

pub const DEFAULT_MAX_ZOOM: u8 = 16;

fn default_max_zoom() -> u8 {
  DEFAULT_MAX_ZOOM
}

fn default_max_reload() -> usize {
  DEFAULT_MAX_RELOAD
}

/// Tool configuration, read from a JSON file.
///
/// ```json
/// {
///   "datastore": "/srv/tiles/datastore.sqlite",
///   "cache": "/srv/tiles/cache.mbtiles",
///   "tiles": "/srv/tiles/collections",
///   "max_zoom": 16
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// sqlite datastore holding the staged `patch_delta` rows
  pub datastore: PathBuf,
  /// mbtiles file used as the tile cache
  pub cache: PathBuf,
  /// directory of per-collection `.mbtiles` archives used to refill the cache
  pub tiles: PathBuf,
  #[serde(default = "default_max_zoom")]
  pub max_zoom: u8,
  #[serde(default = "default_max_reload")]
  pub max_reload: usize,
  /// fill worker count, defaults to the number of CPUs less two
  #[serde(default)]
  pub workers: Option<usize>,
}

impl Config {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Config> {
    let file = std::fs::File::open(path)?;
    let config: Config = serde_json::from_reader(file)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.max_zoom > MAX_ZOOM {
      return Err(Error::InvalidZoom(self.max_zoom));
    }
    Ok(())
  }
}
