use thiserror::Error;

use crate::cache::CacheError;
use crate::tilebelt::MAX_ZOOM;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// A point-dump geometry that is not a single `POINT(x y)`
  #[error("malformed WKT point: {0:?}")]
  MalformedPoint(String),

  /// A point-dump record without any path components
  #[error("missing path data for point #{0}")]
  MissingPath(usize),

  #[error("malformed point path {path:?}: {source}")]
  MalformedPath {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid tile key: {0:?}")]
  InvalidTileKey(String),

  #[error("zoom level {0} is above the maximum of {}", MAX_ZOOM)]
  InvalidZoom(u8),

  #[error("tile {0} not found")]
  TileNotFound(String),

  #[error("datastore error: {0}")]
  Sqlite(#[from] sqlite::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid configuration: {0}")]
  Config(#[from] serde_json::Error),

  #[error(transparent)]
  Cache(#[from] CacheError),
}
