use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cache::{CacheError, CacheStore};
use crate::diff::DiffQuery;
use crate::error::Result;
use crate::geom::{parse_poly_points, DeltaRow};
use crate::raster::rasterize;
use crate::tilebelt::{find_mvt_parents, tile_key, Tile};

/// Outcome of one eviction pass.
#[derive(Debug, Default)]
pub struct EvictionReport {
  /// Every tile the pass tried to evict, leaves and ancestors
  pub tiles: HashSet<Tile>,
  pub evicted: usize,
  /// Keys whose delete failed; those entries stay stale until rewritten
  pub failed: Vec<(String, CacheError)>,
}

/// Tiles made stale by a patch delta: the delta outline rasterized at
/// `max_zoom` plus all of their ancestors.
pub fn tiles_to_evict(delta: &[DeltaRow], max_zoom: u8) -> Result<HashSet<Tile>> {
  let poly = parse_poly_points(delta)?;
  let leaves = rasterize(&poly, max_zoom)?;
  let tiles = find_mvt_parents(max_zoom, &leaves);
  debug!(
    "{} leaf tiles at z{} expand to {} tiles",
    leaves.len(),
    max_zoom,
    tiles.len()
  );
  Ok(tiles)
}

pub struct CacheEvictor<D, C> {
  diff: D,
  cache: C,
}

impl<D: DiffQuery, C: CacheStore> CacheEvictor<D, C> {
  pub fn new(diff: D, cache: C) -> Self {
    CacheEvictor { diff, cache }
  }

  pub fn cache(&self) -> &C {
    &self.cache
  }

  /// Queries the patch delta of a collection and evicts it. A failing diff
  /// query fails the whole call before anything is deleted.
  pub fn evict_collection(&self, collection_id: &str, max_zoom: u8) -> Result<EvictionReport> {
    let delta = self.diff.get_patch_delta(collection_id)?;
    let report = self.evict_diff_from_cache(&delta, max_zoom)?;
    info!(
      "collection {}: evicted {} of {} tiles ({} failed)",
      collection_id,
      report.evicted,
      report.tiles.len(),
      report.failed.len()
    );
    Ok(report)
  }

  /// Deletes every tile touched by `delta` at `max_zoom` and below.
  ///
  /// Only malformed input is an error; per-key cache failures are logged and
  /// collected in the report while the remaining keys are still attempted.
  pub fn evict_diff_from_cache(&self, delta: &[DeltaRow], max_zoom: u8) -> Result<EvictionReport> {
    let tiles = tiles_to_evict(delta, max_zoom)?;
    Ok(self.evict_tiles(&tiles))
  }

  /// Deletes `tiles` as one batch. If the store cannot run the batch, every
  /// key is retried on its own so that per-key failures are still reported.
  pub fn evict_tiles(&self, tiles: &HashSet<Tile>) -> EvictionReport {
    let mut ordered: Vec<&Tile> = tiles.iter().collect();
    ordered.sort_by_key(|t| (t.2, t.0, t.1));
    let keys: Vec<String> = ordered.into_iter().map(tile_key).collect();

    let failed = match self.cache.del_batch(&keys) {
      Ok(failed) => failed,
      Err(err) => {
        warn!("batch eviction failed, deleting keys one by one: {}", err);
        keys
          .iter()
          .filter_map(|key| self.cache.del(key).err().map(|err| (key.clone(), err)))
          .collect()
      }
    };
    for (key, err) in &failed {
      warn!("failed to evict {}: {}", key, err);
    }

    EvictionReport {
      tiles: tiles.clone(),
      evicted: keys.len() - failed.len(),
      failed,
    }
  }
}
