//! EXIF GPS tagging of tiles and basemap parts.

use std::path::Path;

use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use log::debug;
use skyfix_core::GeoCoordinate;

use crate::error::TileError;

/// Largest denominator used for the seconds fraction.
const SECONDS_MAX_DENOMINATOR: u64 = 100;

/// A coordinate component in degrees, minutes and rational seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    /// `(numerator, denominator)`.
    pub seconds: (u32, u32),
    /// Hemisphere letter; empty on the equator / prime meridian.
    pub reference: &'static str,
}

impl Dms {
    /// Convert a latitude (`S`/`N`).
    pub fn latitude(value: f64) -> Self {
        Self::from_decimal(value, ["S", "N"])
    }

    /// Convert a longitude (`W`/`E`).
    pub fn longitude(value: f64) -> Self {
        Self::from_decimal(value, ["W", "E"])
    }

    fn from_decimal(value: f64, refs: [&'static str; 2]) -> Self {
        let reference = if value < 0.0 {
            refs[0]
        } else if value > 0.0 {
            refs[1]
        } else {
            ""
        };

        let abs = value.abs();
        let mut degrees = abs.trunc() as u32;
        let decimal_minutes = (abs - abs.trunc()) * 60.0;
        let mut minutes = decimal_minutes.trunc() as u32;
        let seconds = (decimal_minutes - decimal_minutes.trunc()) * 60.0;
        let (mut num, den) = limit_denominator(seconds, SECONDS_MAX_DENOMINATOR);

        // Rounding may push the seconds up to a full minute.
        if num >= 60 * den {
            num -= 60 * den;
            minutes += 1;
            if minutes == 60 {
                minutes = 0;
                degrees += 1;
            }
        }

        Self {
            degrees,
            minutes,
            seconds: (num as u32, den as u32),
            reference,
        }
    }

    fn to_rationals(self) -> Vec<uR64> {
        vec![
            uR64 {
                nominator: self.degrees,
                denominator: 1,
            },
            uR64 {
                nominator: self.minutes,
                denominator: 1,
            },
            uR64 {
                nominator: self.seconds.0,
                denominator: self.seconds.1,
            },
        ]
    }
}

/// Closest fraction to a non-negative `value` with denominator at most `max_den`.
fn limit_denominator(value: f64, max_den: u64) -> (u64, u64) {
    let (mut p0, mut q0, mut p1, mut q1) = (0u64, 1u64, 1u64, 0u64);
    let mut x = value;
    loop {
        let a = x.floor() as u64;
        let q2 = q0 + a * q1;
        if q2 > max_den {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
        let frac = x - x.floor();
        if frac < 1e-9 {
            break;
        }
        x = 1.0 / frac;
    }

    if q1 == 0 {
        return (value.round() as u64, 1);
    }

    let k = (max_den - q0) / q1;
    let lower = (p0 + k * p1, q0 + k * q1);
    let upper = (p1, q1);
    let err = |(p, q): (u64, u64)| (p as f64 / q as f64 - value).abs();
    if err(upper) <= err(lower) {
        upper
    } else {
        lower
    }
}

/// Write `coord` into the GPS IFD of the image at `path`, keeping other tags.
pub fn geotag_file(path: &Path, coord: GeoCoordinate) -> Result<(), TileError> {
    let geotag_err = |reason: String| TileError::Geotag {
        path: path.to_path_buf(),
        reason,
    };
    if !path.is_file() {
        return Err(geotag_err("file does not exist".to_string()));
    }

    let mut metadata = Metadata::new_from_path(path).unwrap_or_else(|_| Metadata::new());

    let lat = Dms::latitude(coord.latitude);
    let lon = Dms::longitude(coord.longitude);
    metadata.set_tag(ExifTag::GPSVersionID(vec![2, 0, 0, 0]));
    metadata.set_tag(ExifTag::GPSLatitudeRef(lat.reference.to_string()));
    metadata.set_tag(ExifTag::GPSLatitude(lat.to_rationals()));
    metadata.set_tag(ExifTag::GPSLongitudeRef(lon.reference.to_string()));
    metadata.set_tag(ExifTag::GPSLongitude(lon.to_rationals()));

    metadata
        .write_to_file(path)
        .map_err(|e| geotag_err(e.to_string()))?;
    debug!(
        "geotagged {} at ({:.7}, {:.7})",
        path.display(),
        coord.latitude,
        coord.longitude
    );
    Ok(())
}
