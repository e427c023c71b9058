//! Tile cache stores.
//!
//! The evictor and the fill workers only see the [`CacheStore`] trait. Two
//! stores are provided: an in-process [`MemoryCache`] and [`MbtilesCache`],
//! which keeps tiles in an mbtiles-schema sqlite file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::tilebelt::{flip_y, parse_tile_key};

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache store error: {0}")]
  Sqlite(#[from] sqlite::Error),

  /// The store only accepts `{z}/{x}/{y}` keys
  #[error("key {0:?} is not a tile key")]
  InvalidKey(String),
}

/// Get/set/delete access to a shared tile cache, keyed by `{z}/{x}/{y}`.
///
/// Deleting a missing key and overwriting an existing one both succeed.
pub trait CacheStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

  fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

  fn del(&self, key: &str) -> Result<(), CacheError>;

  /// Deletes a batch of keys and returns the keys that failed. An `Err`
  /// means the batch as a whole could not run and no key is known deleted.
  fn del_batch(&self, keys: &[String]) -> Result<Vec<(String, CacheError)>, CacheError> {
    Ok(
      keys
        .iter()
        .filter_map(|key| self.del(key).err().map(|err| (key.clone(), err)))
        .collect(),
    )
  }

  /// Drop every entry.
  fn clear(&self) -> Result<(), CacheError>;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
    (**self).set(key, value)
  }

  fn del(&self, key: &str) -> Result<(), CacheError> {
    (**self).del(key)
  }

  fn del_batch(&self, keys: &[String]) -> Result<Vec<(String, CacheError)>, CacheError> {
    (**self).del_batch(keys)
  }

  fn clear(&self) -> Result<(), CacheError> {
    (**self).clear()
  }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}

impl CacheStore for MemoryCache {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    Ok(self.entries.lock().get(key).cloned())
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
    self.entries.lock().insert(key.to_string(), value.to_vec());
    Ok(())
  }

  fn del(&self, key: &str) -> Result<(), CacheError> {
    self.entries.lock().remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<(), CacheError> {
    self.entries.lock().clear();
    Ok(())
  }
}

const MBTILES_SCHEMA: &str = "
  CREATE TABLE IF NOT EXISTS metadata (
    name text,
    value text
  );

  CREATE TABLE IF NOT EXISTS tiles (
    zoom_level INTEGER,
    tile_column INTEGER,
    tile_row INTEGER,
    tile_data blob
  );

  CREATE UNIQUE INDEX IF NOT EXISTS name ON metadata (name);
  CREATE UNIQUE INDEX IF NOT EXISTS xyz ON tiles (zoom_level, tile_column, tile_row);
";

const DELETE_TILE: &str =
  "DELETE FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?";

/// Per-zoom figures over the tiles currently held by an [`MbtilesCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomLevelStats {
  pub zoom: u8,
  pub min_tile_data: u32,
  pub max_tile_data: u32,
  pub avg_tile_data: f64,
  pub tile_count: u64,
}

/// Cache store backed by an mbtiles file. Every call opens its own
/// connection, so the store can be shared between worker threads; batch
/// deletes share one connection and one transaction.
#[derive(Debug, Clone)]
pub struct MbtilesCache {
  path: PathBuf,
}

impl MbtilesCache {
  /// Opens (creating if needed) the cache file and its tables.
  pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
    let cache = MbtilesCache {
      path: path.as_ref().to_path_buf(),
    };
    let connection = cache.connect()?;
    connection.execute(MBTILES_SCHEMA)?;
    debug!("opened mbtiles cache at {}", cache.path.display());
    Ok(cache)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn connect(&self) -> Result<sqlite::Connection, CacheError> {
    let connection = sqlite::open(&self.path)?;
    connection.execute("PRAGMA busy_timeout = 5000;")?;
    Ok(connection)
  }

  // keys are XYZ; rows are stored TMS like any other mbtiles file
  fn row_for_key(key: &str) -> Result<(i64, i64, i64), CacheError> {
    let tile = parse_tile_key(key).map_err(|_| CacheError::InvalidKey(key.to_string()))?;
    let tms = flip_y(tile);
    Ok((tms.2 as i64, tms.0 as i64, tms.1 as i64))
  }

  fn delete_row(stmt: &mut sqlite::Statement<'_>, key: &str) -> Result<(), CacheError> {
    let (z, x, y) = Self::row_for_key(key)?;
    stmt.reset()?;
    stmt.bind(1, z)?;
    stmt.bind(2, x)?;
    stmt.bind(3, y)?;
    stmt.next()?;
    Ok(())
  }

  pub fn zoom_level_stats(&self) -> Result<Vec<ZoomLevelStats>, CacheError> {
    let connection = self.connect()?;
    connection.execute("PRAGMA query_only = true;")?;
    let mut stmt = connection.prepare(
      "
      SELECT
        zoom_level,
        min(length(tile_data)),
        max(length(tile_data)),
        avg(length(tile_data)),
        count(*)
      FROM tiles
      GROUP BY zoom_level
      ORDER BY zoom_level ASC;
    ",
    )?;

    let mut out = Vec::<ZoomLevelStats>::new();
    while let sqlite::State::Row = stmt.next()? {
      out.push(ZoomLevelStats {
        zoom: stmt.read::<i64>(0)? as u8,
        min_tile_data: stmt.read::<i64>(1)? as u32,
        max_tile_data: stmt.read::<i64>(2)? as u32,
        avg_tile_data: stmt.read::<f64>(3)?,
        tile_count: stmt.read::<i64>(4)? as u64,
      });
    }
    Ok(out)
  }
}

impl CacheStore for MbtilesCache {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    let (z, x, y) = Self::row_for_key(key)?;
    let connection = self.connect()?;
    let mut stmt = connection.prepare(
      "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
    )?;
    stmt.bind(1, z)?;
    stmt.bind(2, x)?;
    stmt.bind(3, y)?;
    match stmt.next()? {
      sqlite::State::Row => Ok(Some(stmt.read::<Vec<u8>>(0)?)),
      sqlite::State::Done => Ok(None),
    }
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
    let (z, x, y) = Self::row_for_key(key)?;
    let connection = self.connect()?;
    let mut stmt = connection.prepare(
      "
      INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data)
      VALUES (?, ?, ?, ?)
    ",
    )?;
    stmt.bind(1, z)?;
    stmt.bind(2, x)?;
    stmt.bind(3, y)?;
    stmt.bind(4, value)?;
    stmt.next()?;
    Ok(())
  }

  fn del(&self, key: &str) -> Result<(), CacheError> {
    let connection = self.connect()?;
    let mut stmt = connection.prepare(DELETE_TILE)?;
    Self::delete_row(&mut stmt, key)
  }

  fn del_batch(&self, keys: &[String]) -> Result<Vec<(String, CacheError)>, CacheError> {
    let connection = self.connect()?;
    connection.execute("BEGIN TRANSACTION;")?;
    let mut failed = Vec::new();
    {
      let mut stmt = connection.prepare(DELETE_TILE)?;
      for key in keys {
        if let Err(err) = Self::delete_row(&mut stmt, key) {
          failed.push((key.clone(), err));
        }
      }
    }
    connection.execute("END TRANSACTION;")?;
    debug!(
      "deleted {} of {} keys from {}",
      keys.len() - failed.len(),
      keys.len(),
      self.path.display()
    );
    Ok(failed)
  }

  fn clear(&self) -> Result<(), CacheError> {
    self.connect()?.execute("DELETE FROM tiles;")?;
    Ok(())
  }
}
