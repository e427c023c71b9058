use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::tilebelt::{flip_y, tile_key, Tile};

/// Renders one MVT tile of a collection.
pub trait TileGenerator: Send + Sync {
  fn get_mvt(&self, collection_id: &str, tile: &Tile) -> Result<Vec<u8>>;
}

/// Serves pre-rendered tiles from `{dir}/{collection_id}.mbtiles` archives.
#[derive(Debug, Clone)]
pub struct MbtilesTileSource {
  dir: PathBuf,
}

impl MbtilesTileSource {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    MbtilesTileSource {
      dir: dir.as_ref().to_path_buf(),
    }
  }

  fn archive_path(&self, collection_id: &str) -> PathBuf {
    self.dir.join(format!("{}.mbtiles", collection_id))
  }
}

impl TileGenerator for MbtilesTileSource {
  fn get_mvt(&self, collection_id: &str, tile: &Tile) -> Result<Vec<u8>> {
    let archive = self.archive_path(collection_id);
    if !archive.exists() {
      return Err(Error::TileNotFound(format!(
        "{} ({} has no archive)",
        tile_key(tile),
        collection_id
      )));
    }
    let connection = sqlite::open(&archive)?;
    connection.execute("PRAGMA query_only = true;")?;
    let mut stmt = connection.prepare(
      "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
    )?;
    let tms = flip_y(*tile);
    stmt.bind(1, tms.2 as i64)?;
    stmt.bind(2, tms.0 as i64)?;
    stmt.bind(3, tms.1 as i64)?;
    match stmt.next()? {
      sqlite::State::Row => Ok(stmt.read::<Vec<u8>>(0)?),
      sqlite::State::Done => Err(Error::TileNotFound(tile_key(tile))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheStore, MbtilesCache};
  use tempfile::tempdir;

  #[test]
  fn test_get_mvt() {
    let dir = tempdir().unwrap();
    // an mbtiles cache file has the same layout as a source archive
    let archive = MbtilesCache::open(dir.path().join("parks.mbtiles")).unwrap();
    archive.set("3/5/2", b"mvt-bytes").unwrap();

    let source = MbtilesTileSource::new(dir.path());
    assert_eq!(
      source.get_mvt("parks", &(5, 2, 3)).unwrap(),
      b"mvt-bytes".to_vec()
    );
    assert!(matches!(
      source.get_mvt("parks", &(5, 3, 3)),
      Err(Error::TileNotFound(_))
    ));
    assert!(matches!(
      source.get_mvt("roads", &(5, 2, 3)),
      Err(Error::TileNotFound(_))
    ));
  }
}
