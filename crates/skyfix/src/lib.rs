//! High-level facade crate for the `skyfix-*` workspace.
//!
//! skyfix estimates where a drone photo was taken by matching it against
//! geotagged satellite imagery. This crate provides:
//! - re-exports of the underlying crates
//! - [`RunConfig`], the JSON configuration of a full run
//! - the pipelines behind the `skyfix` binary in [`run`]
//!
//! ## Quickstart
//!
//! ```no_run
//! use skyfix::core::GeoCoordinate;
//! use skyfix::run::{download, DownloadRequest};
//! use skyfix::tiles::{StitchParams, TileFetchParams, TileFetcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = TileFetcher::http(TileFetchParams::default());
//! let request = DownloadRequest {
//!     center: GeoCoordinate::new(60.4518, 22.2666),
//!     zoom: 19,
//!     radius: 2,
//!     output: "map/".into(),
//!     merge: true,
//! };
//! let outcome = download(&fetcher, &StitchParams::default(), &request)?;
//! println!("basemap of {} images", outcome.basemap.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `skyfix::core`: coordinates, bounds, Web Mercator projection, distances.
//! - `skyfix::tiles`: tile download, stitching, splitting, geotagging, GeoTIFF input.
//! - `skyfix::localize`: reference sets, observations, matcher interface, localizer.

pub mod config;
pub mod run;

pub use skyfix_core as core;
pub use skyfix_localize as localize;
pub use skyfix_tiles as tiles;

pub use config::{ConfigError, RunConfig};
pub use skyfix_core::{GeoBounds, GeoCoordinate, TileIndex};
pub use skyfix_localize::{FeatureMatcher, Localizer, LocalizerParams, MatchResult};
pub use skyfix_tiles::{StitchParams, TileFetchParams, TileFetcher, TileStitcher};
