//! Downloading a square block of tiles around a coordinate.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use skyfix_core::{geo_to_tile, tile_center, GeoCoordinate, TileIndex, MAX_ZOOM};

use crate::error::TileError;
use crate::geotag::geotag_file;
use crate::params::TileFetchParams;
use crate::source::{HttpTileSource, ImageKind, TileSource};

/// A downloaded tile and the coordinate of its center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub filename: String,
    pub path: PathBuf,
    pub tile: TileIndex,
    pub center: GeoCoordinate,
}

/// Downloaded tiles arranged as on the map: one row per tile `y`,
/// columns by ascending tile `x`.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrix {
    /// Tile in the top-left cell.
    pub origin: TileIndex,
    pub center: TileIndex,
    pub radius: u32,
    pub rows: Vec<Vec<PathBuf>>,
}

impl TileMatrix {
    #[inline]
    pub fn zoom(&self) -> u8 {
        self.origin.zoom
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// All tile paths in row-major order.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.rows.iter().flatten()
    }
}

/// Result of [`TileFetcher::fetch_tiles`].
#[derive(Clone, Debug)]
pub struct FetchOutput {
    pub matrix: TileMatrix,
    /// Same tiles as the matrix, row-major.
    pub records: Vec<TileRecord>,
}

/// File name of a raw tile.
pub fn tile_file_name(tile: TileIndex, kind: ImageKind) -> String {
    format!(
        "tile_z_{}_tile_{}_{}.{}",
        tile.zoom,
        tile.x,
        tile.y,
        kind.extension()
    )
}

/// The `(2r+1)^2` tiles around `center`, row-major.
///
/// Fails with [`TileError::OutOfRange`] when the block reaches past the edge
/// of the pyramid.
pub fn tile_block(center: TileIndex, radius: u32) -> Result<Vec<TileIndex>, TileError> {
    if center.zoom > MAX_ZOOM {
        return Err(TileError::UnsupportedZoom {
            zoom: center.zoom,
            max: MAX_ZOOM,
        });
    }
    let r = i64::from(radius);
    for (dx, dy) in [(-r, -r), (r, r)] {
        if center.offset(dx, dy).is_none() {
            return Err(TileError::OutOfRange {
                x: i64::from(center.x) + dx,
                y: i64::from(center.y) + dy,
                zoom: center.zoom,
            });
        }
    }

    let mut tiles = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dy in -r..=r {
        for dx in -r..=r {
            let tile = center.offset(dx, dy).ok_or(TileError::OutOfRange {
                x: i64::from(center.x) + dx,
                y: i64::from(center.y) + dy,
                zoom: center.zoom,
            })?;
            tiles.push(tile);
        }
    }
    Ok(tiles)
}

/// Make sure `folder` exists, optionally emptying it first.
pub fn prepare_output_folder(folder: &Path, clear: bool) -> Result<(), TileError> {
    if clear && folder.exists() {
        info!("clearing output folder {}", folder.display());
        fs::remove_dir_all(folder)?;
    }
    fs::create_dir_all(folder)?;
    Ok(())
}

/// Downloads tile blocks from a [`TileSource`] into a folder.
pub struct TileFetcher<S> {
    source: S,
    params: TileFetchParams,
}

impl TileFetcher<HttpTileSource> {
    /// Fetcher backed by the HTTP source configured in `params`.
    pub fn http(params: TileFetchParams) -> Self {
        let source = HttpTileSource::new(&params);
        Self { source, params }
    }
}

impl<S: TileSource> TileFetcher<S> {
    pub fn new(source: S, params: TileFetchParams) -> Self {
        Self { source, params }
    }

    pub fn params(&self) -> &TileFetchParams {
        &self.params
    }

    /// Download the tiles within `radius` of the tile containing `center`.
    ///
    /// Any failed tile aborts the whole fetch. With `concurrency > 1` the
    /// downloads run on a bounded worker pool; the matrix layout does not
    /// depend on completion order.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(self, output)))]
    pub fn fetch_tiles(
        &self,
        zoom: u8,
        center: GeoCoordinate,
        radius: u32,
        output: &Path,
    ) -> Result<FetchOutput, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::UnsupportedZoom {
                zoom,
                max: MAX_ZOOM,
            });
        }
        let center_tile = geo_to_tile(center, zoom);
        info!(
            "fetching tiles around ({}, {}) at zoom {zoom}, radius {radius}",
            center_tile.x, center_tile.y
        );
        prepare_output_folder(output, self.params.clear_output)?;

        let tiles = tile_block(center_tile, radius)?;
        let records = if self.params.concurrency > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.params.concurrency)
                .build()?;
            pool.install(|| {
                tiles
                    .par_iter()
                    .map(|&tile| self.fetch_one(tile, output))
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            tiles
                .iter()
                .map(|&tile| self.fetch_one(tile, output))
                .collect::<Result<Vec<_>, _>>()?
        };

        let side = 2 * radius as usize + 1;
        let rows = records
            .chunks(side)
            .map(|row| row.iter().map(|r| r.path.clone()).collect())
            .collect();
        let matrix = TileMatrix {
            origin: tiles[0],
            center: center_tile,
            radius,
            rows,
        };
        info!("fetched {} tiles into {}", records.len(), output.display());
        Ok(FetchOutput { matrix, records })
    }

    fn fetch_one(&self, tile: TileIndex, output: &Path) -> Result<TileRecord, TileError> {
        let response = self.source.fetch(tile)?;
        if !response.is_success() {
            return Err(TileError::TileSource {
                url: response.url,
                status: response.status,
            });
        }
        let content_type = response.content_type.unwrap_or_default();
        let kind = ImageKind::from_content_type(&content_type)
            .ok_or(TileError::UnsupportedImageType { content_type })?;

        let filename = tile_file_name(tile, kind);
        let path = output.join(&filename);
        debug!("writing {} ({} bytes)", path.display(), response.bytes.len());
        fs::write(&path, &response.bytes)?;

        let center = tile_center(tile);
        if let Err(e) = geotag_file(&path, center) {
            warn!("{e}");
        }

        Ok(TileRecord {
            filename,
            path,
            tile,
            center,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_row_major_around_center() {
        let tiles = tile_block(TileIndex::new(10, 20, 5), 1).unwrap();
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[0], TileIndex::new(9, 19, 5));
        assert_eq!(tiles[1], TileIndex::new(10, 19, 5));
        assert_eq!(tiles[3], TileIndex::new(9, 20, 5));
        assert_eq!(tiles[8], TileIndex::new(11, 21, 5));
    }

    #[test]
    fn block_outside_pyramid_is_an_error() {
        let err = tile_block(TileIndex::new(0, 0, 3), 1).unwrap_err();
        assert!(matches!(err, TileError::OutOfRange { x: -1, y: -1, zoom: 3 }));
    }

    #[test]
    fn huge_radius_fails_before_allocating() {
        let err = tile_block(TileIndex::new(100, 100, 8), 1 << 22).unwrap_err();
        assert!(matches!(err, TileError::OutOfRange { zoom: 8, .. }));
    }

    #[test]
    fn block_below_max_zoom_only() {
        let err = tile_block(TileIndex::new(0, 0, 63), 0).unwrap_err();
        assert!(matches!(err, TileError::UnsupportedZoom { zoom: 63, max: MAX_ZOOM }));
        assert_eq!(tile_block(TileIndex::new(5, 5, MAX_ZOOM), 0).unwrap().len(), 1);
    }

    #[test]
    fn block_touching_the_far_edge_is_an_error() {
        let err = tile_block(TileIndex::new(7, 7, 3), 1).unwrap_err();
        assert!(matches!(err, TileError::OutOfRange { x: 8, y: 8, zoom: 3 }));
        assert_eq!(tile_block(TileIndex::new(6, 6, 3), 1).unwrap().len(), 9);
    }

    #[test]
    fn tile_names_are_deterministic() {
        let t = TileIndex::new(291_409, 148_117, 19);
        assert_eq!(tile_file_name(t, ImageKind::Jpeg), "tile_z_19_tile_291409_148117.jpg");
        assert_eq!(tile_file_name(t, ImageKind::Png), "tile_z_19_tile_291409_148117.png");
    }
}
