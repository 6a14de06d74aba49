//! Tileforge CLI - Command-line interface
//!
//! Fetches tiles through the job scheduler and inspects tile addressing and
//! configuration.

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use error::CliError;
use tileforge::config::{config_file_path, ConfigFile};
use tileforge::coord::TileAddress;
use tileforge::job::RenderJob;
use tileforge::logging::{default_log_dir, default_log_file, init_logging};
use tileforge::mapfile::MapFileRegistry;
use tileforge::scheduler::{Delivery, JobScheduler};
use tileforge::strategy::{RemoteSource, ReqwestClient, StrategyFactory, TileBitmap};

#[derive(Parser)]
#[command(name = "tileforge")]
#[command(version = tileforge::VERSION)]
#[command(about = "Produce and inspect slippy-map raster tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download one tile from the configured remote source
    Fetch {
        #[command(flatten)]
        tile: TileArgs,

        /// Scheduling priority (lower runs first)
        #[arg(long, default_value = "0")]
        priority: i32,

        /// Output PNG path
        #[arg(long)]
        output: PathBuf,
    },

    /// Print a tile's bounding box in micro-degrees
    Bbox {
        #[command(flatten)]
        tile: TileArgs,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct TileArgs {
    /// Zoom level
    #[arg(long)]
    zoom: i8,

    /// Tile column (x)
    #[arg(long)]
    column: i64,

    /// Tile row (y)
    #[arg(long)]
    row: i64,
}

impl TileArgs {
    fn address(&self) -> TileAddress {
        TileAddress::new(self.column, self.row, self.zoom)
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective settings
    List,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Fetch {
            tile,
            priority,
            output,
        } => fetch(tile.address(), priority, &output),
        Command::Bbox { tile } => {
            bbox(tile.address());
            Ok(())
        }
        Command::Config { action } => config(action),
    };

    if let Err(e) = result {
        e.exit();
    }
}

fn fetch(tile: TileAddress, priority: i32, output: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let _logging = init_logging(&default_log_dir(), default_log_file())
        .map_err(CliError::LoggingInit)?;

    let client = ReqwestClient::from_config(&config.remote).map_err(CliError::HttpClient)?;
    let factory = StrategyFactory::new(
        Arc::new(MapFileRegistry::new()),
        Arc::new(client),
        RemoteSource::from_config(&config.remote),
    );
    let scheduler_config = config
        .scheduler
        .clone()
        .with_local_workers(0)
        .with_remote_workers(config.scheduler.remote_workers.max(1));
    let (scheduler, mut deliveries) = JobScheduler::start(&scheduler_config, &factory)?;

    let id = scheduler.submit(RenderJob::remote(tile).with_priority(priority))?;
    info!(job_id = %id, tile = %tile, "Fetching tile");

    match deliveries.blocking_recv() {
        Some(Delivery::Completed { bitmap, .. }) => {
            save_png(&bitmap, output)?;
            println!("Wrote {} to {}", tile, output.display());
            Ok(())
        }
        Some(Delivery::Failed { kind, detail, .. }) => Err(CliError::Production { kind, detail }),
        None => Err(CliError::NoDelivery),
    }
}

fn save_png(bitmap: &TileBitmap, path: &Path) -> Result<(), CliError> {
    bitmap
        .to_rgba_image()
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })
}

fn bbox(tile: TileAddress) {
    let bbox = tile.bounding_box();
    println!("Tile {}", tile);
    println!("  min_latitude:  {}", bbox.min_latitude);
    println!("  min_longitude: {}", bbox.min_longitude);
    println!("  max_latitude:  {}", bbox.max_latitude);
    println!("  max_longitude: {}", bbox.max_longitude);
}

fn config(action: ConfigAction) -> Result<(), CliError> {
    match action {
        ConfigAction::Path => println!("{}", config_file_path().display()),
        ConfigAction::List => {
            let config = ConfigFile::load()?;
            let remote = &config.remote;
            println!("[scheduler]");
            println!("  local_workers      = {}", config.scheduler.local_workers);
            println!("  remote_workers     = {}", config.scheduler.remote_workers);
            println!("  thread_name_prefix = {}", config.scheduler.thread_name_prefix);
            println!("[cache]");
            println!("  index_capacity     = {}", config.cache.capacity);
            println!("[remote]");
            println!(
                "  url                = {}",
                RemoteSource::from_config(remote).url(&TileAddress::new(0, 0, 0))
            );
            println!("  zoom               = {}..={}", remote.min_zoom, remote.max_zoom);
            println!("  parallel_requests  = {}", remote.parallel_requests);
            println!("  timeout            = {}s", remote.timeout_secs);
            println!("  user_agent         = {}", remote.user_agent);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "tileforge", "fetch", "--zoom", "6", "--column", "35", "--row", "21", "--output",
            "tile.png",
        ])
        .unwrap();

        match cli.command {
            Command::Fetch { tile, priority, output } => {
                assert_eq!(tile.address(), TileAddress::new(35, 21, 6));
                assert_eq!(priority, 0);
                assert_eq!(output, PathBuf::from("tile.png"));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_parse_negative_priority() {
        let cli = Cli::try_parse_from([
            "tileforge", "fetch", "--zoom", "1", "--column", "0", "--row", "0", "--priority=-3",
            "--output", "t.png",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Fetch { priority: -3, .. }));
    }

    #[test]
    fn test_bbox_requires_coordinates() {
        assert!(Cli::try_parse_from(["tileforge", "bbox", "--zoom", "3"]).is_err());
    }

    #[test]
    fn test_save_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tile.png");

        save_png(&TileBitmap::filled(0xFF11_2233), &path).unwrap();

        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(7, 9).0, [0x11, 0x22, 0x33, 0xFF]);
    }

    #[test]
    fn test_save_png_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("tile.png");

        let err = save_png(&TileBitmap::filled(0), &path).unwrap_err();
        assert!(matches!(err, CliError::FileWrite { .. }));
    }
}
