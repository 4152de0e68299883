use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use skyfix::run::{self, DownloadRequest};
use skyfix::{GeoCoordinate, RunConfig, StitchParams, TileFetchParams, TileFetcher};

#[derive(Parser, Debug)]
#[command(author, version, about = "Locate drone photos on satellite imagery", long_about = None)]
struct Cli {
    /// Log debug detail.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the tiles around a coordinate, optionally merged into a basemap.
    Download {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(
            short,
            long,
            default_value_t = 19,
            value_parser = clap::value_parser!(u8).range(0..=i64::from(skyfix::core::MAX_ZOOM))
        )]
        zoom: u8,
        /// Tiles on each side of the center tile.
        #[arg(short, long, default_value_t = 0)]
        radius: u32,
        #[arg(short, long, default_value = "./temp_tiles")]
        output: PathBuf,
        /// Stitch the tiles and write `map.csv`.
        #[arg(long)]
        merge: bool,
        /// Empty the output folder first.
        #[arg(long)]
        clear: bool,
        /// Split merged images larger than this.
        #[arg(long)]
        max_side: Option<u32>,
        /// Keep the single tiles after merging.
        #[arg(long)]
        keep_tiles: bool,
        #[arg(long)]
        concurrency: Option<usize>,
        /// Tile URL template with `{z}`, `{x}` and `{y}`.
        #[arg(long)]
        url: Option<String>,
    },
    /// Split a GeoTIFF basemap, or a folder of them, into parts listed in `map.csv`.
    Split {
        path: PathBuf,
        #[arg(long, default_value_t = 1000)]
        size: u32,
    },
    /// Localize the photos of a run against its basemap.
    Localize {
        /// JSON run configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Base folder the other folders are relative to.
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        map: Option<PathBuf>,
        #[arg(long)]
        photos: Option<PathBuf>,
        #[arg(long)]
        results: Option<PathBuf>,
        /// Match only the photo as taken.
        #[arg(long)]
        no_rotate: bool,
        /// Matcher program.
        #[arg(long)]
        matcher: Option<String>,
        /// Extra argument for the matcher program; repeatable.
        #[arg(long = "matcher-arg", allow_hyphen_values = true)]
        matcher_args: Vec<String>,
    },
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    #[cfg(feature = "tracing")]
    skyfix::core::init_tracing(cli.json_log, level);
    #[cfg(not(feature = "tracing"))]
    skyfix::core::init_with_level(level)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Command::Download {
            lat,
            lon,
            zoom,
            radius,
            output,
            merge,
            clear,
            max_side,
            keep_tiles,
            concurrency,
            url,
        } => {
            let mut params = TileFetchParams {
                clear_output: clear,
                ..TileFetchParams::default()
            };
            if let Some(url) = url {
                params.url_template = url;
            }
            if let Some(n) = concurrency {
                params.concurrency = n;
            }
            let mut stitch = StitchParams {
                remove_tiles: !keep_tiles,
                ..StitchParams::default()
            };
            if let Some(side) = max_side {
                stitch.max_side = side;
            }

            let request = DownloadRequest {
                center: GeoCoordinate::new(lat, lon),
                zoom,
                radius,
                output,
                merge,
            };
            let outcome = run::download(&TileFetcher::http(params), &stitch, &request)?;
            info!(
                "downloaded {} tiles; data in {}",
                outcome.tiles,
                outcome.data_file.display()
            );
        }
        Command::Split { path, size } => {
            let parts = run::split(&path, size)?;
            info!("{} map parts", parts.len());
        }
        Command::Localize {
            config,
            path,
            map,
            photos,
            results,
            no_rotate,
            matcher,
            matcher_args,
        } => {
            let mut cfg = match config {
                Some(p) => RunConfig::load_json(p)?,
                None => RunConfig::default(),
            };
            if let Some(p) = path {
                cfg.base_path = p;
            }
            if let Some(p) = map {
                cfg.map_folder = p;
            }
            if let Some(p) = photos {
                cfg.photos_folder = p;
            }
            if let Some(p) = results {
                cfg.results_folder = p;
            }
            if no_rotate {
                cfg.localizer.rotation_search = false;
            }
            if matcher.is_some() {
                cfg.matcher_program = matcher;
            }
            if !matcher_args.is_empty() {
                cfg.matcher_args = matcher_args;
            }

            let matcher = run::command_matcher(&cfg)?;
            let outcome = run::localize(&cfg, matcher)?;
            let s = outcome.summary;
            println!(
                "located {}/{} photos ({} unreadable); results in {}",
                s.located,
                s.total,
                s.unreadable,
                outcome.results_file.display()
            );
        }
    }
    Ok(())
}
