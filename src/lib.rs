//! Tile cache invalidation for patched vector tile collections.
//!
//! A patch changes some geometries of a collection. [`evict::CacheEvictor`]
//! turns the difference between the old and new geometries into the set of
//! cached tiles that now render stale data (the outline of the difference at
//! the deepest zoom, plus every ancestor tile) and deletes them from the
//! cache. [`fill::CacheFill`] can then warm some of them back up.

pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod evict;
pub mod fill;
pub mod geom;
pub mod projection;
pub mod raster;
pub mod tilebelt;
pub mod tilegen;

pub use cache::{CacheError, CacheStore, MbtilesCache, MemoryCache};
pub use config::Config;
pub use diff::{DiffQuery, SqliteDiffSource};
pub use error::{Error, Result};
pub use evict::{tiles_to_evict, CacheEvictor, EvictionReport};
pub use fill::{CacheFill, DEFAULT_MAX_RELOAD};
pub use geom::{DeltaRow, Point, PolyPoints};
pub use tilebelt::{find_mvt_parents, tile_key, Tile};
pub use tilegen::{MbtilesTileSource, TileGenerator};
