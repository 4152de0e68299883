//! Georeferencing of existing GeoTIFF basemaps.
//!
//! Only north-up rasters described by a single tiepoint and a pixel scale are
//! supported, in either geographic degrees (EPSG:4326 and other geographic
//! CRS) or spherical Web Mercator metres (EPSG:3857).

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{info, warn};
use skyfix_core::{GeoBounds, GeoCoordinate, EARTH_RADIUS_M};
use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::error::TileError;
use crate::io::{write_map_csv, MAP_DATA_FILE};
use crate::split::split_image;
use crate::stitch::MapPart;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// Web Mercator codes seen in the wild.
const WEB_MERCATOR_CODES: [u16; 2] = [3857, 3785];

/// Model space of a georeferenced raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSpace {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical Mercator easting/northing in metres.
    WebMercator,
}

/// Affine pixel-to-model mapping of a north-up raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoReference {
    pub width: u32,
    pub height: u32,
    /// Model coordinates of pixel corner `(0, 0)`.
    pub origin: [f64; 2],
    /// Model units per pixel along x and y (both positive).
    pub scale: [f64; 2],
    pub space: ModelSpace,
}

impl GeoReference {
    /// Coordinate of a (possibly fractional) pixel corner position.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> GeoCoordinate {
        let x = self.origin[0] + col * self.scale[0];
        let y = self.origin[1] - row * self.scale[1];
        match self.space {
            ModelSpace::Geographic => GeoCoordinate::new(y, x),
            ModelSpace::WebMercator => GeoCoordinate::new(
                (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
                (x / EARTH_RADIUS_M).to_degrees(),
            ),
        }
    }

    /// Bounds and center of a pixel rectangle.
    pub fn rect(&self, x: u32, y: u32, width: u32, height: u32) -> (GeoBounds, GeoCoordinate) {
        let (x, y) = (f64::from(x), f64::from(y));
        let bounds = GeoBounds::new(
            self.pixel_to_geo(x, y),
            self.pixel_to_geo(x + f64::from(width), y + f64::from(height)),
        );
        let center = self.pixel_to_geo(x + f64::from(width / 2), y + f64::from(height / 2));
        (bounds, center)
    }

    pub fn bounds(&self) -> GeoBounds {
        self.rect(0, 0, self.width, self.height).0
    }
}

fn find_f64s(decoder: &mut Decoder<BufReader<File>>, code: u16) -> Result<Option<Vec<f64>>, TileError> {
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn geo_key(directory: &[u16], key: u16) -> Option<u16> {
    // header: version, revision, minor, count; then (id, location, count, value)
    let count = usize::from(*directory.get(3)?);
    directory
        .get(4..4 + 4 * count)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

/// Read the georeferencing of a GeoTIFF file.
pub fn read_georeference(path: &Path) -> Result<GeoReference, TileError> {
    let missing = || TileError::MissingProjectionMetadata {
        path: path.to_path_buf(),
    };
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let (width, height) = decoder.dimensions()?;

    let scale = find_f64s(&mut decoder, MODEL_PIXEL_SCALE)?.ok_or_else(missing)?;
    let tiepoint = find_f64s(&mut decoder, MODEL_TIEPOINT)?.ok_or_else(missing)?;
    let directory = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))? {
        Some(value) => value.into_u16_vec()?,
        None => return Err(missing()),
    };
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(missing());
    }

    let space = match geo_key(&directory, GT_MODEL_TYPE_GEO_KEY) {
        Some(MODEL_TYPE_GEOGRAPHIC) => ModelSpace::Geographic,
        Some(MODEL_TYPE_PROJECTED) => {
            let code = geo_key(&directory, PROJECTED_CS_TYPE_GEO_KEY).ok_or_else(missing)?;
            if !WEB_MERCATOR_CODES.contains(&code) {
                return Err(TileError::UnsupportedProjection {
                    path: path.to_path_buf(),
                    code,
                });
            }
            ModelSpace::WebMercator
        }
        _ if geo_key(&directory, GEOGRAPHIC_TYPE_GEO_KEY).is_some() => ModelSpace::Geographic,
        _ => return Err(missing()),
    };

    // Tiepoint (i, j, k, x, y, z) maps raster (i, j) to model (x, y).
    let origin = [
        tiepoint[3] - tiepoint[0] * scale[0],
        tiepoint[4] + tiepoint[1] * scale[1],
    ];
    Ok(GeoReference {
        width,
        height,
        origin,
        scale: [scale[0], scale[1]],
        space,
    })
}

/// Split one GeoTIFF into PNG parts with bounds from its georeferencing.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(path), fields(path = %path.display())))]
pub fn split_geotiff_map(path: &Path, max_side: u32) -> Result<Vec<MapPart>, TileError> {
    let georef = read_georeference(path)?;
    let parts = split_image(path, max_side, "png")?
        .into_iter()
        .map(|part| {
            let c = part.cell;
            let (bounds, center) = georef.rect(c.x_offset, c.y_offset, c.width, c.height);
            MapPart {
                filename: part.filename(),
                path: part.path,
                bounds,
                center,
            }
        })
        .collect();
    Ok(parts)
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| e == "tif" || e == "tiff")
}

/// Split a GeoTIFF file, or every GeoTIFF in a folder, and write `map.csv`
/// next to the inputs.
///
/// In folder mode a raster without usable georeferencing is logged and
/// skipped; a single file without it is an error.
pub fn split_map_path(input: &Path, max_side: u32) -> Result<Vec<MapPart>, TileError> {
    let (folder, files): (PathBuf, Vec<PathBuf>) = if input.is_dir() {
        let mut files = fs::read_dir(input)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        files.retain(|p| p.is_file() && is_tiff(p));
        files.sort();
        (input.to_path_buf(), files)
    } else {
        let folder = input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (folder, vec![input.to_path_buf()])
    };
    let batch = input.is_dir();

    let mut parts = Vec::new();
    for file in &files {
        match split_geotiff_map(file, max_side) {
            Ok(mut p) => parts.append(&mut p),
            Err(
                e @ (TileError::MissingProjectionMetadata { .. }
                | TileError::UnsupportedProjection { .. }),
            ) if batch => warn!("skipping: {e}"),
            Err(e) => return Err(e),
        }
    }

    if !parts.is_empty() {
        let records = parts.iter().map(MapPart::to_record).collect::<Vec<_>>();
        let csv_path = folder.join(MAP_DATA_FILE);
        write_map_csv(&csv_path, &records)?;
        info!("wrote {} ({} parts)", csv_path.display(), records.len());
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn geo_key_lookup() {
        let dir = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(geo_key(&dir, GT_MODEL_TYPE_GEO_KEY), Some(2));
        assert_eq!(geo_key(&dir, GEOGRAPHIC_TYPE_GEO_KEY), Some(4326));
        assert_eq!(geo_key(&dir, PROJECTED_CS_TYPE_GEO_KEY), None);
        assert_eq!(geo_key(&dir[..6], GT_MODEL_TYPE_GEO_KEY), None);
    }

    #[test]
    fn geographic_rect() {
        let georef = GeoReference {
            width: 200,
            height: 100,
            origin: [22.30, 60.51],
            scale: [0.0001, 0.0001],
            space: ModelSpace::Geographic,
        };
        let b = georef.bounds();
        assert_abs_diff_eq!(b.top_left.latitude, 60.51, epsilon = 1e-12);
        assert_abs_diff_eq!(b.top_left.longitude, 22.30, epsilon = 1e-12);
        assert_abs_diff_eq!(b.bottom_right.latitude, 60.50, epsilon = 1e-12);
        assert_abs_diff_eq!(b.bottom_right.longitude, 22.32, epsilon = 1e-12);

        let (_, center) = georef.rect(100, 0, 100, 100);
        assert_abs_diff_eq!(center.longitude, 22.315, epsilon = 1e-12);
        assert_abs_diff_eq!(center.latitude, 60.505, epsilon = 1e-12);
    }

    #[test]
    fn web_mercator_origin_is_null_island() {
        let georef = GeoReference {
            width: 10,
            height: 10,
            origin: [0.0, 0.0],
            scale: [1.0, 1.0],
            space: ModelSpace::WebMercator,
        };
        let c = georef.pixel_to_geo(0.0, 0.0);
        assert_abs_diff_eq!(c.latitude, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.longitude, 0.0, epsilon = 1e-12);

        // Half the circumference east is the antimeridian.
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        let georef = GeoReference {
            origin: [half, 0.0],
            ..georef
        };
        assert_abs_diff_eq!(georef.pixel_to_geo(0.0, 0.0).longitude, 180.0, epsilon = 1e-9);
    }
}
