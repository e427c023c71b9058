mod statistics;

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tilecache_tool::tilebelt::parse_tile_key;
use tilecache_tool::{
  CacheEvictor, CacheFill, CacheStore, Config, MbtilesCache, MbtilesTileSource, Result,
  SqliteDiffSource, Tile,
};

#[derive(Debug, Parser)]
#[clap(
  name = "tilecache_tool",
  about = "Invalidate and warm an mbtiles tile cache after collection patches",
  version
)]
struct Cli {
  #[clap(subcommand)]
  command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
  #[clap(
    name = "evict",
    about = "Evict every cached tile touched by a collection's staged patch delta"
  )]
  Evict {
    /// Configuration file
    #[clap(value_parser)]
    config: PathBuf,

    /// Collection that was patched
    #[clap(value_parser)]
    collection: String,

    /// Deepest zoom to rasterize at, overrides the configuration
    #[clap(long, value_parser)]
    max_zoom: Option<u8>,

    /// Regenerate the evicted tiles afterwards
    #[clap(long)]
    refill: bool,
  },
  #[clap(name = "fill", about = "Regenerate the given tiles into the cache")]
  Fill {
    /// Configuration file
    #[clap(value_parser)]
    config: PathBuf,

    /// Collection to render
    #[clap(value_parser)]
    collection: String,

    /// Tile keys, `{z}/{x}/{y}`
    #[clap(value_parser, required = true)]
    keys: Vec<String>,
  },
  #[clap(name = "clear", about = "Remove every tile from the cache")]
  Clear {
    /// Configuration file
    #[clap(value_parser)]
    config: PathBuf,
  },
  #[clap(name = "stats", about = "Print per-zoom statistics of the cache")]
  Stats {
    /// Configuration file
    #[clap(value_parser)]
    config: PathBuf,
  },
}

fn build_fill<C: CacheStore>(config: &Config, cache: C) -> CacheFill<MbtilesTileSource, C> {
  let fill = CacheFill::new(MbtilesTileSource::new(&config.tiles), cache);
  match config.workers {
    Some(workers) => fill.with_workers(workers),
    None => fill,
  }
}

fn run(command: Commands) -> Result<()> {
  match command {
    Commands::Evict {
      config,
      collection,
      max_zoom,
      refill,
    } => {
      let config = Config::from_path(config)?;
      let max_zoom = max_zoom.unwrap_or(config.max_zoom);
      let cache = Arc::new(MbtilesCache::open(&config.cache)?);
      let evictor = CacheEvictor::new(SqliteDiffSource::new(&config.datastore), cache.clone());
      let report = evictor.evict_collection(&collection, max_zoom)?;
      println!(
        "Evicted {} tiles from {} ({} failed)",
        report.evicted,
        config.cache.display(),
        report.failed.len()
      );
      if refill {
        let filled = build_fill(&config, cache).fill(&collection, &report.tiles, config.max_reload);
        println!("Refilled {} tiles", filled);
      }
    }
    Commands::Fill {
      config,
      collection,
      keys,
    } => {
      let config = Config::from_path(config)?;
      let tiles = keys
        .iter()
        .map(|key| parse_tile_key(key))
        .collect::<Result<HashSet<Tile>>>()?;
      let cache = MbtilesCache::open(&config.cache)?;
      let filled = build_fill(&config, cache).fill(&collection, &tiles, config.max_reload);
      println!("Filled {} of {} tiles", filled, tiles.len());
    }
    Commands::Clear { config } => {
      let config = Config::from_path(config)?;
      MbtilesCache::open(&config.cache)?.clear()?;
      info!("cleared {}", config.cache.display());
    }
    Commands::Stats { config } => {
      let config = Config::from_path(config)?;
      statistics::print_cache_statistics(&MbtilesCache::open(&config.cache)?)?;
    }
  }
  Ok(())
}

fn main() {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let args = Cli::parse();
  if let Err(err) = run(args.command) {
    error!("{}", err);
    std::process::exit(1);
  }
}
