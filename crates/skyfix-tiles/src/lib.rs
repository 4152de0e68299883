//! Basemap building for skyfix.
//!
//! The pipeline is:
//!
//! 1. [`TileFetcher`] downloads the `(2r+1) x (2r+1)` block of tiles around a
//!    coordinate from a [`TileSource`], saves them under deterministic names
//!    and geotags each one with its center coordinate.
//! 2. [`TileStitcher`] merges the block into one image whose bounds come from
//!    the outermost tile indices, and splits it into parts when it is larger
//!    than the configured maximum side.
//! 3. The resulting [`MapPart`]s are written to `map.csv`, the bounds file
//!    the localizer reads.
//!
//! Existing GeoTIFF basemaps can be turned into the same layout with
//! [`split_map_path`].

mod error;
mod fetch;
mod geotag;
mod geotiff;
pub mod io;
mod params;
mod source;
mod split;
mod stitch;

pub use error::TileError;
pub use fetch::{
    prepare_output_folder, tile_block, tile_file_name, FetchOutput, TileFetcher, TileMatrix,
    TileRecord,
};
pub use geotag::{geotag_file, Dms};
pub use geotiff::{read_georeference, split_geotiff_map, split_map_path, GeoReference, ModelSpace};
pub use params::{StitchParams, TileFetchParams, DEFAULT_TILE_URL};
pub use source::{tile_url, HttpTileSource, ImageKind, TileResponse, TileSource};
pub use split::{part_path, split_cells, split_image, SplitCell, SplitPart};
pub use stitch::{cell_bounds, merged_file_name, split_map_part, MapPart, StitchOutput, TileStitcher};
