//! Spherical Web Mercator tile system.
//!
//! Conversions between geographic coordinates, global pixel coordinates and
//! tile indices of the standard 256 px power-of-two pyramid. All functions
//! are pure; the zoom level is always explicit. Pixel values are computed in
//! floating point and only truncated at the pixel-index boundary.
//!
//! Zoom levels above [`MAX_ZOOM`](crate::MAX_ZOOM) are not supported and
//! must be rejected by callers before projecting.

use std::f64::consts::PI;

use crate::types::{
    GeoCoordinate, PixelCoordinate, TileIndex, EARTH_RADIUS_M, MAX_LATITUDE, MIN_LATITUDE,
    TILE_SIZE,
};

const HALF_TILE: i64 = (TILE_SIZE / 2) as i64;
const FULL_TILE: i64 = TILE_SIZE as i64;

/// Side of the whole map in pixels at `zoom` (`256 * 2^zoom`).
#[inline]
pub fn map_size(zoom: u8) -> u64 {
    u64::from(TILE_SIZE) << zoom
}

/// Metres on the ground covered by one pixel at `latitude`.
pub fn ground_resolution(latitude: f64, zoom: u8) -> f64 {
    let latitude = latitude.clamp(MIN_LATITUDE, MAX_LATITUDE);
    latitude.to_radians().cos() * 2.0 * PI * EARTH_RADIUS_M / map_size(zoom) as f64
}

/// Map scale (1 : N) for a display with the given dots per inch.
pub fn map_scale(latitude: f64, zoom: u8, screen_dpi: f64) -> f64 {
    ground_resolution(latitude, zoom) * screen_dpi / 0.0254
}

#[inline]
fn clamp_to_pixel(value: f64, size: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    {
        value.clamp(0.0, size - 1.0) as i64
    }
}

/// Project a coordinate into global pixel space.
///
/// Out-of-range input is clamped first; the result is rounded to the nearest
/// pixel and clamped to `[0, map_size - 1]`.
pub fn geo_to_pixel(coord: GeoCoordinate, zoom: u8) -> PixelCoordinate {
    let coord = coord.clamped();
    let x = (coord.longitude + 180.0) / 360.0;
    let sin_lat = coord.latitude.to_radians().sin();
    let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);

    let size = map_size(zoom) as f64;
    PixelCoordinate::new(
        clamp_to_pixel(x * size + 0.5, size),
        clamp_to_pixel(y * size + 0.5, size),
    )
}

/// Inverse of [`geo_to_pixel`]. The pixel is clamped into the map first.
pub fn pixel_to_geo(pixel: PixelCoordinate, zoom: u8) -> GeoCoordinate {
    let size = map_size(zoom);
    let max = size as i64 - 1;
    let size = size as f64;

    let x = pixel.x.clamp(0, max) as f64 / size - 0.5;
    let y = 0.5 - pixel.y.clamp(0, max) as f64 / size;

    GeoCoordinate {
        latitude: 90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI,
        longitude: 360.0 * x,
    }
}

/// Tile containing a global pixel.
pub fn pixel_to_tile(pixel: PixelCoordinate, zoom: u8) -> TileIndex {
    let max = map_size(zoom) as i64 - 1;
    let x = pixel.x.clamp(0, max) / FULL_TILE;
    let y = pixel.y.clamp(0, max) / FULL_TILE;
    TileIndex::new(x as u32, y as u32, zoom)
}

/// Top-left global pixel of a tile.
#[inline]
pub fn tile_to_pixel(tile: TileIndex) -> PixelCoordinate {
    PixelCoordinate::new(i64::from(tile.x) * FULL_TILE, i64::from(tile.y) * FULL_TILE)
}

/// Tile containing a coordinate.
#[inline]
pub fn geo_to_tile(coord: GeoCoordinate, zoom: u8) -> TileIndex {
    pixel_to_tile(geo_to_pixel(coord, zoom), zoom)
}

/// Coordinate of the tile's center pixel.
#[inline]
pub fn tile_center(tile: TileIndex) -> GeoCoordinate {
    pixel_to_geo(tile_to_pixel(tile).offset(HALF_TILE, HALF_TILE), tile.zoom)
}

/// Coordinate of the tile's top-left corner.
#[inline]
pub fn tile_top_left(tile: TileIndex) -> GeoCoordinate {
    pixel_to_geo(tile_to_pixel(tile), tile.zoom)
}

/// Coordinate of the tile's bottom-right corner (the next tile's origin).
#[inline]
pub fn tile_bottom_right(tile: TileIndex) -> GeoCoordinate {
    pixel_to_geo(tile_to_pixel(tile).offset(FULL_TILE, FULL_TILE), tile.zoom)
}
