//! Merging a tile matrix into one basemap image.
//!
//! Bounds are always derived from tile indices and global pixel offsets,
//! never from the raster itself, so merged images and their split parts stay
//! aligned with the tile grid.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use skyfix_core::{
    geo_to_pixel, pixel_to_geo, tile_to_pixel, GeoBounds, GeoCoordinate, PixelCoordinate, TileIndex,
    TILE_SIZE,
};

use crate::error::TileError;
use crate::fetch::TileMatrix;
use crate::geotag::geotag_file;
use crate::io::MapRecord;
use crate::params::StitchParams;
use crate::split::{split_image, SplitCell};

/// A basemap image with known geographic extent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPart {
    pub filename: String,
    pub path: PathBuf,
    pub bounds: GeoBounds,
    pub center: GeoCoordinate,
}

impl MapPart {
    pub fn to_record(&self) -> MapRecord {
        MapRecord::new(self.filename.clone(), self.bounds)
    }
}

/// Result of [`TileStitcher::stitch`].
#[derive(Clone, Debug)]
pub struct StitchOutput {
    pub merged: MapPart,
    /// Split parts; empty when the merged image was small enough.
    pub parts: Vec<MapPart>,
}

impl StitchOutput {
    /// Images that make up the basemap: the parts if the merged image was
    /// split, the merged image otherwise.
    pub fn basemap(&self) -> &[MapPart] {
        if self.parts.is_empty() {
            std::slice::from_ref(&self.merged)
        } else {
            &self.parts
        }
    }
}

/// File name of a merged basemap.
pub fn merged_file_name(center: TileIndex, radius: u32) -> String {
    format!(
        "tile_z_{}_tile_{}_{}_r_{}.png",
        center.zoom, center.x, center.y, radius
    )
}

/// Geographic extent of a pixel rectangle given in global pixels.
fn pixel_rect(top_left: PixelCoordinate, width: u32, height: u32, zoom: u8) -> (GeoBounds, GeoCoordinate) {
    let (w, h) = (i64::from(width), i64::from(height));
    let bounds = GeoBounds::new(
        pixel_to_geo(top_left, zoom),
        pixel_to_geo(top_left.offset(w, h), zoom),
    );
    let center = pixel_to_geo(top_left.offset(w / 2, h / 2), zoom);
    (bounds, center)
}

/// Bounds and center of a split cell of an image whose top-left corner is
/// at `image_top_left`.
///
/// The corner is projected back to a global pixel, the cell offset is added
/// there and the result is converted to coordinates.
pub fn cell_bounds(image_top_left: GeoCoordinate, cell: &SplitCell, zoom: u8) -> (GeoBounds, GeoCoordinate) {
    let origin = geo_to_pixel(image_top_left, zoom);
    let top_left = origin.offset(i64::from(cell.x_offset), i64::from(cell.y_offset));
    pixel_rect(top_left, cell.width, cell.height, zoom)
}

/// Merges tile matrices and splits oversized results.
pub struct TileStitcher {
    params: StitchParams,
}

impl TileStitcher {
    pub fn new(params: StitchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StitchParams {
        &self.params
    }

    /// Merge `matrix` into `output` and split it if it exceeds `max_side`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(self, matrix, output), fields(rows = matrix.num_rows(), cols = matrix.num_cols())))]
    pub fn stitch(&self, matrix: &TileMatrix, output: &Path) -> Result<StitchOutput, TileError> {
        let rows = matrix.num_rows();
        if rows < 2 {
            return Err(TileError::TooFewRows { rows });
        }
        let cols = matrix.num_cols();
        for (row, tiles) in matrix.rows.iter().enumerate() {
            if tiles.len() != cols {
                return Err(TileError::RaggedMatrix {
                    row,
                    len: tiles.len(),
                    expected: cols,
                });
            }
        }

        let merged_image = merge_tiles(&matrix.rows)?;
        let filename = merged_file_name(matrix.center, matrix.radius);
        let path = output.join(&filename);
        info!(
            "writing merged map {} ({}x{})",
            path.display(),
            merged_image.width(),
            merged_image.height()
        );
        merged_image.save(&path)?;

        let zoom = matrix.zoom();
        let (bounds, center) = pixel_rect(
            tile_to_pixel(matrix.origin),
            merged_image.width(),
            merged_image.height(),
            zoom,
        );
        tag_or_warn(&path, center);
        let merged = MapPart {
            filename,
            path,
            bounds,
            center,
        };

        if self.params.remove_tiles {
            debug!("removing {} source tiles", rows * cols);
            for tile in matrix.paths() {
                fs::remove_file(tile)?;
            }
        }

        let max_side = self.params.max_side;
        let parts = if merged_image.width() > max_side || merged_image.height() > max_side {
            split_map_part(&merged, max_side, zoom)?
        } else {
            Vec::new()
        };

        Ok(StitchOutput { merged, parts })
    }
}

/// Split a Mercator-aligned map image and derive each part's bounds from
/// pixel offsets relative to the image's top-left corner.
pub fn split_map_part(map: &MapPart, max_side: u32, zoom: u8) -> Result<Vec<MapPart>, TileError> {
    let extension = map
        .path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());

    let parts = split_image(&map.path, max_side, &extension)?
        .into_iter()
        .map(|part| {
            let (bounds, center) = cell_bounds(map.bounds.top_left, &part.cell, zoom);
            tag_or_warn(&part.path, center);
            MapPart {
                filename: part.filename(),
                path: part.path,
                bounds,
                center,
            }
        })
        .collect::<Vec<_>>();
    info!("split {} into {} parts", map.filename, parts.len());
    Ok(parts)
}

fn merge_tiles(rows: &[Vec<PathBuf>]) -> Result<RgbImage, TileError> {
    let cols = rows.first().map_or(0, Vec::len) as u32;
    let mut canvas = RgbImage::new(cols * TILE_SIZE, rows.len() as u32 * TILE_SIZE);
    for (r, row) in rows.iter().enumerate() {
        for (c, tile_path) in row.iter().enumerate() {
            let tile = image::open(tile_path)?.to_rgb8();
            if tile.width() != TILE_SIZE || tile.height() != TILE_SIZE {
                return Err(TileError::TileSize {
                    path: tile_path.clone(),
                    width: tile.width(),
                    height: tile.height(),
                    expected: TILE_SIZE,
                });
            }
            let x = c as i64 * i64::from(TILE_SIZE);
            let y = r as i64 * i64::from(TILE_SIZE);
            image::imageops::replace(&mut canvas, &tile, x, y);
        }
    }
    Ok(canvas)
}

fn tag_or_warn(path: &Path, coord: GeoCoordinate) {
    if let Err(e) = geotag_file(path, coord) {
        warn!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfix_core::{tile_bottom_right, tile_center, tile_top_left};

    #[test]
    fn merged_name_uses_center_and_radius() {
        assert_eq!(
            merged_file_name(TileIndex::new(291_409, 148_117, 19), 2),
            "tile_z_19_tile_291409_148117_r_2.png"
        );
    }

    #[test]
    fn cell_bounds_reproduce_tile_bounds() {
        let origin = TileIndex::new(291_408, 148_116, 19);
        let image_top_left = tile_top_left(origin);
        let cell = SplitCell {
            i: 2,
            j: 1,
            x_offset: 512,
            y_offset: 256,
            width: 256,
            height: 256,
        };
        let (bounds, center) = cell_bounds(image_top_left, &cell, 19);
        let tile = TileIndex::new(origin.x + 2, origin.y + 1, 19);
        assert_eq!(bounds.top_left, tile_top_left(tile));
        assert_eq!(bounds.bottom_right, tile_bottom_right(tile));
        assert_eq!(center, tile_center(tile));
    }

    #[test]
    fn basemap_prefers_parts() {
        let part = |name: &str| MapPart {
            filename: name.to_string(),
            path: PathBuf::from(name),
            bounds: GeoBounds::new(GeoCoordinate::new(1.0, 0.0), GeoCoordinate::new(0.0, 1.0)),
            center: GeoCoordinate::new(0.5, 0.5),
        };
        let mut out = StitchOutput {
            merged: part("m.png"),
            parts: Vec::new(),
        };
        assert_eq!(out.basemap().len(), 1);
        assert_eq!(out.basemap()[0].filename, "m.png");
        out.parts = vec![part("m_0_0.png"), part("m_0_1.png")];
        assert_eq!(out.basemap().len(), 2);
    }
}
