use std::collections::HashSet;
use std::io::prelude::*;

use crossbeam_utils::atomic::AtomicCell;
use flate2::{write::GzEncoder, Compression};
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;
use crate::error::Result;
use crate::tilebelt::{tile_key, Tile};
use crate::tilegen::TileGenerator;

/// How many tiles a fill regenerates when the caller gives no limit.
pub const DEFAULT_MAX_RELOAD: usize = 1000;

pub fn default_workers() -> usize {
  std::cmp::max(num_cpus::get().saturating_sub(2), 2)
}

// cached tiles are served gzipped
fn maybe_compress(data: Vec<u8>) -> Result<Vec<u8>> {
  if data.starts_with(&[0x1f, 0x8b]) {
    return Ok(data);
  }
  let mut gz = GzEncoder::new(Vec::new(), Compression::default());
  gz.write_all(&data)?;
  Ok(gz.finish()?)
}

/// Regenerates tiles and writes them back into the cache.
pub struct CacheFill<G, C> {
  generator: G,
  cache: C,
  workers: usize,
}

impl<G: TileGenerator, C: CacheStore> CacheFill<G, C> {
  pub fn new(generator: G, cache: C) -> Self {
    CacheFill {
      generator,
      cache,
      workers: default_workers(),
    }
  }

  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }

  pub fn cache(&self) -> &C {
    &self.cache
  }

  /// Fills at most `max_reload` of `tiles`, lowest zoom first, and returns
  /// how many were stored. A tile that cannot be generated or stored is
  /// logged and skipped.
  pub fn fill(&self, collection_id: &str, tiles: &HashSet<Tile>, max_reload: usize) -> usize {
    let mut ordered: Vec<Tile> = tiles.iter().copied().collect();
    ordered.sort_by_key(|t| (t.2, t.0, t.1));
    if ordered.len() > max_reload {
      info!(
        "reload limit of {} reached, skipping {} tiles",
        max_reload,
        ordered.len() - max_reload
      );
      ordered.truncate(max_reload);
    }
    if ordered.is_empty() {
      return 0;
    }

    let workers = self.workers.min(ordered.len());
    let total = ordered.len();
    let (queue_tx, queue_rx) = crossbeam_channel::unbounded::<Tile>();
    for tile in ordered {
      if queue_tx.send(tile).is_err() {
        break;
      }
    }
    drop(queue_tx);

    let filled = AtomicCell::new(0usize);
    let scope_result = crossbeam_utils::thread::scope(|s| {
      for worker_id in 0..workers {
        let worker_queue_rx = queue_rx.clone();
        let filled = &filled;
        s.spawn(move |_| {
          while let Ok(tile) = worker_queue_rx.recv() {
            match self.fill_tile(collection_id, &tile) {
              Ok(()) => {
                filled.fetch_add(1);
              }
              Err(err) => warn!("skipping fill of {}: {}", tile_key(&tile), err),
            }
          }
          debug!("fill worker {} finished", worker_id);
        });
      }
    });
    if scope_result.is_err() {
      error!("a fill worker panicked, some tiles were not filled");
    }

    let filled = filled.load();
    info!(
      "collection {}: filled {} of {} tiles",
      collection_id, filled, total
    );
    filled
  }

  fn fill_tile(&self, collection_id: &str, tile: &Tile) -> Result<()> {
    let data = self.generator.get_mvt(collection_id, tile)?;
    let data = maybe_compress(data)?;
    self.cache.set(&tile_key(tile), &data)?;
    Ok(())
  }
}
