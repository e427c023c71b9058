use std::collections::HashSet;

use crate::error::{Error, Result};

// in order of: x, y, z
pub type Tile = (u32, u32, u32);

/// Deepest zoom level accepted anywhere in the crate.
pub const MAX_ZOOM: u8 = 22;

/// The root of the pyramid, an ancestor of every tile.
pub const ROOT_TILE: Tile = (0, 0, 0);

/// Cache key for a tile, `{z}/{x}/{y}`.
pub fn tile_key(tile: &Tile) -> String {
  format!("{}/{}/{}", tile.2, tile.0, tile.1)
}

/// Inverse of [`tile_key`]. Rejects keys whose column or row is outside the
/// grid at their zoom.
pub fn parse_tile_key(key: &str) -> Result<Tile> {
  let invalid = || Error::InvalidTileKey(key.to_string());
  let parts: Vec<&str> = key.trim().split('/').collect();
  if parts.len() != 3 {
    return Err(invalid());
  }
  let z = parts[0].parse::<u8>().map_err(|_| invalid())?;
  let x = parts[1].parse::<u32>().map_err(|_| invalid())?;
  let y = parts[2].parse::<u32>().map_err(|_| invalid())?;
  if z > MAX_ZOOM {
    return Err(invalid());
  }
  let n = 1u32 << z;
  if x >= n || y >= n {
    return Err(invalid());
  }
  Ok((x, y, z as u32))
}

/// Whether `ancestor` is `tile` itself or one of the tiles above it.
pub fn tile_is_ancestor(tile: &Tile, ancestor: &Tile) -> bool {
  if tile.2 < ancestor.2 {
    return false;
  }
  let z_diff = tile.2 - ancestor.2;
  let tile_at_anc_z = (
    tile.0.checked_shr(z_diff).unwrap_or(0),
    tile.1.checked_shr(z_diff).unwrap_or(0),
  );

  tile_at_anc_z.0 == ancestor.0 && tile_at_anc_z.1 == ancestor.1
}

pub fn get_parent(tile: &Tile) -> Option<Tile> {
  if tile.2 == 0 {
    return None;
  }
  Some((tile.0 >> 1, tile.1 >> 1, tile.2 - 1))
}

/// Rolls a set of tiles at `zoom` up the pyramid. The result holds the input
/// tiles plus every ancestor of each of them down to zoom 0.
pub fn find_mvt_parents(zoom: u8, tiles: &HashSet<Tile>) -> HashSet<Tile> {
  let mut result: HashSet<Tile> = HashSet::with_capacity(tiles.len() * 2);
  if tiles.is_empty() {
    return result;
  }
  if zoom == 0 {
    result.insert(ROOT_TILE);
    return result;
  }

  result.extend(tiles.iter().copied());
  // siblings share a parent, so the frontier shrinks roughly 4x per level
  let mut frontier: HashSet<Tile> = tiles.iter().filter_map(get_parent).collect();
  while !frontier.is_empty() {
    result.extend(frontier.iter().copied());
    frontier = frontier.iter().filter_map(get_parent).collect();
  }
  result
}

// mbtiles stores rows bottom-up (TMS); this converts between that and XYZ.
// The conversion is its own inverse.
pub fn flip_y(tile: Tile) -> Tile {
  let flipped_row = (1 << tile.2) - 1 - tile.1;
  (tile.0, flipped_row, tile.2)
}
