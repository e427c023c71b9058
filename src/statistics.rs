use cli_table::{print_stdout, Table, WithTitle};
use tilecache_tool::cache::ZoomLevelStats;
use tilecache_tool::{MbtilesCache, Result};

#[derive(Table)]
struct ZoomLevelRow {
  #[table(title = "z")]
  zoom: u8,
  #[table(title = "Tile size (min)")]
  min_tile_data: u32,
  #[table(title = "Tile size (max)")]
  max_tile_data: u32,
  #[table(title = "Tile size (average)")]
  avg_tile_data: f64,
  #[table(title = "Tile count")]
  tile_count: u64,
}

impl From<ZoomLevelStats> for ZoomLevelRow {
  fn from(stats: ZoomLevelStats) -> Self {
    ZoomLevelRow {
      zoom: stats.zoom,
      min_tile_data: stats.min_tile_data,
      max_tile_data: stats.max_tile_data,
      avg_tile_data: stats.avg_tile_data,
      tile_count: stats.tile_count,
    }
  }
}

pub fn print_cache_statistics(cache: &MbtilesCache) -> Result<()> {
  let rows: Vec<ZoomLevelRow> = cache
    .zoom_level_stats()?
    .into_iter()
    .map(ZoomLevelRow::from)
    .collect();
  println!("Statistics for {}:", cache.path().display());
  if rows.is_empty() {
    println!("(cache is empty)");
    return Ok(());
  }
  print_stdout(rows.with_title())?;
  Ok(())
}
