//! Core types and coordinate math for skyfix.
//!
//! Purely geometric: no HTTP, rasters or feature matchers. The tile pipeline
//! and the localizer both build on the types and projections defined here.

mod distance;
mod logger;
pub mod projection;
mod types;

pub use distance::{haversine_m, GeoError};
pub use projection::{
    geo_to_pixel, geo_to_tile, ground_resolution, map_scale, map_size, pixel_to_geo,
    pixel_to_tile, tile_bottom_right, tile_center, tile_to_pixel, tile_top_left,
};
pub use types::{
    GeoBounds, GeoCoordinate, PixelCoordinate, TileIndex, EARTH_RADIUS_M, MAX_LATITUDE,
    MAX_LONGITUDE, MAX_ZOOM, MIN_LATITUDE, MIN_LONGITUDE, TILE_SIZE,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
