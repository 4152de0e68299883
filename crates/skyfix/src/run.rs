//! End-to-end pipelines behind the `skyfix` commands.

use std::path::{Path, PathBuf};

use log::info;
use skyfix_core::GeoCoordinate;
use skyfix_localize::{
    load_observations, prepare_results_folder, write_results_csv, write_simple_output,
    BatchSummary, CommandMatcher, DroneObservation, FeatureMatcher, LocalizeError, Localizer,
    ReferenceSet, RESULTS_FILE, SIMPLE_OUTPUT_FILE,
};
use skyfix_tiles::io::{write_map_csv, write_photo_csv, PhotoRecord, MAP_DATA_FILE, PHOTOS_DATA_FILE};
use skyfix_tiles::{MapPart, StitchParams, TileError, TileFetcher, TileSource, TileStitcher};

use crate::config::{ConfigError, RunConfig};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Tiles(#[from] TileError),
    #[error(transparent)]
    Localize(#[from] LocalizeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no matcher program configured")]
    MissingMatcher,
}

/// What to download and where.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub center: GeoCoordinate,
    pub zoom: u8,
    pub radius: u32,
    pub output: PathBuf,
    /// Stitch the block into a basemap instead of keeping single tiles.
    pub merge: bool,
}

/// Result of [`download`].
#[derive(Clone, Debug)]
pub struct DownloadOutcome {
    pub tiles: usize,
    /// `map.csv` for a merged basemap, `photo_metadata.csv` otherwise.
    pub data_file: PathBuf,
    /// Basemap images; empty when not merged.
    pub basemap: Vec<MapPart>,
}

/// Fetch a tile block and describe it on disk.
///
/// A merged block becomes a basemap listed in `map.csv`. Unmerged tiles are
/// listed in `photo_metadata.csv` with their centers as coordinates so they
/// can serve as query photos.
///
/// A merged block needs at least two rows, so `merge` with a zero radius is
/// rejected before anything is fetched.
pub fn download<S: TileSource>(
    fetcher: &TileFetcher<S>,
    stitch: &StitchParams,
    request: &DownloadRequest,
) -> Result<DownloadOutcome, RunError> {
    if request.merge && request.radius == 0 {
        return Err(TileError::TooFewRows { rows: 1 }.into());
    }
    let fetched = fetcher.fetch_tiles(
        request.zoom,
        request.center,
        request.radius,
        &request.output,
    )?;
    let tiles = fetched.records.len();

    if request.merge {
        let stitched = TileStitcher::new(stitch.clone()).stitch(&fetched.matrix, &request.output)?;
        let basemap = stitched.basemap().to_vec();
        let records = basemap.iter().map(MapPart::to_record).collect::<Vec<_>>();
        let data_file = request.output.join(MAP_DATA_FILE);
        write_map_csv(&data_file, &records).map_err(TileError::from)?;
        info!("wrote {} ({} images)", data_file.display(), records.len());
        Ok(DownloadOutcome {
            tiles,
            data_file,
            basemap,
        })
    } else {
        let records = fetched
            .records
            .iter()
            .map(|r| PhotoRecord::at(r.filename.clone(), r.center))
            .collect::<Vec<_>>();
        let data_file = request.output.join(PHOTOS_DATA_FILE);
        write_photo_csv(&data_file, &records).map_err(TileError::from)?;
        info!("wrote {} ({} tiles)", data_file.display(), records.len());
        Ok(DownloadOutcome {
            tiles,
            data_file,
            basemap: Vec::new(),
        })
    }
}

/// Result of [`localize`].
#[derive(Clone, Debug)]
pub struct LocalizeOutcome {
    pub summary: BatchSummary,
    pub observations: Vec<DroneObservation>,
    pub results_file: PathBuf,
}

/// Matcher configured in `config`.
pub fn command_matcher(config: &RunConfig) -> Result<CommandMatcher, RunError> {
    let program = config
        .matcher_program
        .as_deref()
        .ok_or(RunError::MissingMatcher)?;
    Ok(CommandMatcher::new(program).with_args(config.matcher_args.iter().cloned()))
}

/// Localize every photo in the configured photos folder against the
/// configured basemap and write the result files.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all))]
pub fn localize<M: FeatureMatcher>(config: &RunConfig, matcher: M) -> Result<LocalizeOutcome, RunError> {
    let references = ReferenceSet::load(&config.map_path())?;
    info!("{} reference images", references.len());
    let mut observations = load_observations(&config.photos_path())?;
    info!("{} photos", observations.len());

    let results = config.results_path();
    prepare_results_folder(&results)?;

    let summary = Localizer::new(&references, matcher, config.localizer.clone())
        .run(&mut observations, Some(&results));

    let results_file = results.join(RESULTS_FILE);
    write_results_csv(&results_file, &observations)?;
    write_simple_output(&results.join(SIMPLE_OUTPUT_FILE), &observations)?;

    Ok(LocalizeOutcome {
        summary,
        observations,
        results_file,
    })
}

/// Split a GeoTIFF basemap file or folder into parts listed in `map.csv`.
pub fn split(input: &Path, max_side: u32) -> Result<Vec<MapPart>, RunError> {
    Ok(skyfix_tiles::split_map_path(input, max_side)?)
}
