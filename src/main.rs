use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use nvdbmap::geometry::MAX_GRID_SIZE;
use nvdbmap::geometry::utm::SourceCrs;
use nvdbmap::render::write_map;
use nvdbmap::{
    BoundingBox, Cache, FetchReport, MapStyle, NvdbClient, NvdbConfig, OfflineSource, Pipeline, RoadStore,
    partition,
};

#[derive(Parser)]
#[command(author, version, about = "Map NVDB traffic volumes on a Leaflet map", long_about = None)]
struct Cli {
    /// Path to the cache directory
    #[arg(short, long, default_value = "data/svv")]
    cache_dir: String,

    /// Path to the output directory
    #[arg(short, long, default_value = "output")]
    output_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Bounding box as min_x,min_y,max_x,max_y in the source CRS
    #[arg(short, long, default_value = "250000,7000000,300000,7100000")]
    bbox: BoundingBox,

    /// Number of tiles along each axis
    #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=MAX_GRID_SIZE as i64))]
    grid_size: u32,

    /// Municipality number (kommune)
    #[arg(short, long, default_value_t = 5001)]
    municipality: u32,

    /// Base URL of the road object type
    #[arg(long, default_value = "https://nvdbapiles-v3.atlas.vegvesen.no/vegobjekter/540")]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

impl QueryArgs {
    fn nvdb_config(&self) -> NvdbConfig {
        NvdbConfig {
            base_url: self.base_url.clone(),
            municipality: self.municipality,
            timeout: Duration::from_secs(self.timeout_secs),
            ..NvdbConfig::default()
        }
    }
}

#[derive(Args)]
struct MapArgs {
    /// Output filename for the map
    #[arg(long, default_value = "svv-map.html")]
    output: String,

    /// EPSG code of the source geometries
    #[arg(long, default_value = "EPSG:32633")]
    source_crs: SourceCrs,
}

impl MapArgs {
    fn style(&self) -> MapStyle {
        MapStyle {
            source_crs: self.source_crs,
            ..MapStyle::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch road objects and generate the map
    Run {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        map: MapArgs,
    },

    /// Only collect and persist the object ids
    Ids {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Generate the map from the cache without network access
    Render {
        #[command(flatten)]
        map: MapArgs,
    },

    /// Clear the cache
    ClearCache,
}

fn main() -> Result<()> {
    // Initialize logger, showing failures and the run summary unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Create cache directory
    let mut cache = Cache::new(&cli.cache_dir).context("Failed to create cache")?;

    // Create output directory
    std::fs::create_dir_all(&cli.output_dir).context("Failed to create output directory")?;

    match &cli.command {
        Commands::Run { query, map } => {
            let config = query.nvdb_config();
            let attribute_code = config.traffic_volume_code;
            let client = NvdbClient::new(config).context("Failed to create HTTP client")?;
            let tiles = partition(&query.bbox, query.grid_size).context("Failed to partition bounding box")?;
            info!("Split {} into {} tiles", query.bbox, tiles.len());

            let output = Pipeline::new(&client, &mut cache, attribute_code)
                .run(&tiles)
                .context("Failed to fetch road objects")?;
            output.report.log_summary();

            let usable = output.usable();
            info!("{} of {} objects have geometry and traffic volume", usable.len(), output.ids.len());

            let output_path = PathBuf::from(&cli.output_dir).join(&map.output);
            write_map(&usable, &map.style(), &output_path).context("Failed to write map")?;

            info!("Done");
        }

        Commands::Ids { query } => {
            let config = query.nvdb_config();
            let attribute_code = config.traffic_volume_code;
            let client = NvdbClient::new(config).context("Failed to create HTTP client")?;
            let tiles = partition(&query.bbox, query.grid_size).context("Failed to partition bounding box")?;

            let mut report = FetchReport::default();
            let ids = Pipeline::new(&client, &mut cache, attribute_code)
                .collect_ids(&tiles, &mut report)
                .context("Failed to collect object ids")?;
            report.log_summary();

            info!("Collected {} object ids", ids.len());
        }

        Commands::Render { map } => {
            let ids = cache
                .load_ids()
                .context("Failed to read object ids")?
                .with_context(|| format!("No object ids in {}, run `ids` or `run` first", cli.cache_dir))?;

            let mut report = FetchReport::default();
            report.ids_from_cache = true;
            let attribute_code = NvdbConfig::default().traffic_volume_code;
            let details = Pipeline::new(&OfflineSource, &mut cache, attribute_code).fetch_details(&ids, &mut report);
            report.log_summary();

            let usable: Vec<_> = details
                .into_iter()
                .map(|(_, detail)| detail)
                .filter(|detail| detail.is_usable())
                .collect();

            let output_path = PathBuf::from(&cli.output_dir).join(&map.output);
            write_map(&usable, &map.style(), &output_path).context("Failed to write map")?;

            info!("Done");
        }

        Commands::ClearCache => {
            info!("Clearing cache");
            cache.clear().context("Failed to clear cache")?;
            info!("Cache cleared");
        }
    }

    Ok(())
}
