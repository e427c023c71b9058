use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::geom::DeltaRow;

/// Answers "what changed" for a collection: the point-dump of the symmetric
/// difference between its existing and patched geometries. Rows sharing a
/// ring must come back contiguous and in vertex order.
pub trait DiffQuery: Send + Sync {
  fn get_patch_delta(&self, collection_id: &str) -> Result<Vec<DeltaRow>>;
}

/// Reads point-dumps that the patch job staged into a sqlite datastore.
///
/// ```sql
/// CREATE TABLE patch_delta (collection_id TEXT, seq INTEGER, path TEXT, geom TEXT);
/// ```
///
/// `path` holds a JSON integer array such as `[1,1,4]`.
#[derive(Debug, Clone)]
pub struct SqliteDiffSource {
  path: PathBuf,
}

impl SqliteDiffSource {
  pub fn new(path: impl AsRef<Path>) -> Self {
    SqliteDiffSource {
      path: path.as_ref().to_path_buf(),
    }
  }
}

fn parse_path(raw: String) -> Result<Vec<i32>> {
  serde_json::from_str::<Vec<i32>>(&raw)
    .map_err(|source| Error::MalformedPath { path: raw, source })
}

impl DiffQuery for SqliteDiffSource {
  fn get_patch_delta(&self, collection_id: &str) -> Result<Vec<DeltaRow>> {
    let connection = sqlite::open(&self.path)?;
    connection.execute("PRAGMA query_only = true;")?;
    let mut stmt = connection.prepare(
      "
      SELECT path, geom
      FROM patch_delta
      WHERE collection_id = ?
      ORDER BY seq ASC
    ",
    )?;
    stmt.bind(1, collection_id)?;

    let mut rows = Vec::new();
    while let sqlite::State::Row = stmt.next()? {
      let path = parse_path(stmt.read::<String>(0)?)?;
      let geom = stmt.read::<String>(1)?;
      rows.push(DeltaRow { path, geom });
    }
    debug!(
      "collection {} has {} delta points",
      collection_id,
      rows.len()
    );
    Ok(rows)
  }
}
