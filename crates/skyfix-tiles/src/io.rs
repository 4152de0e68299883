//! CSV files shared by the basemap builder and the localizer.

use std::path::Path;

use serde::{Deserialize, Serialize};
use skyfix_core::{GeoBounds, GeoCoordinate};

/// Bounds of the images in a basemap folder.
pub const MAP_DATA_FILE: &str = "map.csv";
/// Per-photo position and telemetry.
pub const PHOTOS_DATA_FILE: &str = "photo_metadata.csv";

const MAP_HEADER: [&str; 5] = [
    "Filename",
    "Top_left_lat",
    "Top_left_lon",
    "Bottom_right_lat",
    "Bottom_right_long",
];

const PHOTO_HEADER: [&str; 10] = [
    "Filename",
    "Latitude",
    "Longitude",
    "Altitude",
    "Gimball_Roll",
    "Gimball_Yaw",
    "Gimball_Pitch",
    "Flight_Roll",
    "Flight_Yaw",
    "Flight_Pitch",
];

/// One row of `map.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Top_left_lat")]
    pub top_left_lat: f64,
    #[serde(rename = "Top_left_lon")]
    pub top_left_lon: f64,
    #[serde(rename = "Bottom_right_lat")]
    pub bottom_right_lat: f64,
    #[serde(rename = "Bottom_right_long")]
    pub bottom_right_lon: f64,
}

impl MapRecord {
    pub fn new(filename: impl Into<String>, bounds: GeoBounds) -> Self {
        Self {
            filename: filename.into(),
            top_left_lat: bounds.top_left.latitude,
            top_left_lon: bounds.top_left.longitude,
            bottom_right_lat: bounds.bottom_right.latitude,
            bottom_right_lon: bounds.bottom_right.longitude,
        }
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::new(
            GeoCoordinate::new(self.top_left_lat, self.top_left_lon),
            GeoCoordinate::new(self.bottom_right_lat, self.bottom_right_lon),
        )
    }
}

/// One row of `photo_metadata.csv`. Unknown values are `NaN`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Altitude")]
    pub altitude: f64,
    #[serde(rename = "Gimball_Roll")]
    pub gimbal_roll: f64,
    #[serde(rename = "Gimball_Yaw")]
    pub gimbal_yaw: f64,
    #[serde(rename = "Gimball_Pitch")]
    pub gimbal_pitch: f64,
    #[serde(rename = "Flight_Roll")]
    pub flight_roll: f64,
    #[serde(rename = "Flight_Yaw")]
    pub flight_yaw: f64,
    #[serde(rename = "Flight_Pitch")]
    pub flight_pitch: f64,
}

impl PhotoRecord {
    /// A record with only a position; the telemetry is unknown.
    pub fn at(filename: impl Into<String>, coord: GeoCoordinate) -> Self {
        Self {
            filename: filename.into(),
            latitude: coord.latitude,
            longitude: coord.longitude,
            altitude: f64::NAN,
            gimbal_roll: f64::NAN,
            gimbal_yaw: f64::NAN,
            gimbal_pitch: f64::NAN,
            flight_roll: f64::NAN,
            flight_yaw: f64::NAN,
            flight_pitch: f64::NAN,
        }
    }
}

fn write_records<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_records<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    reader.deserialize().collect()
}

pub fn write_map_csv(path: &Path, rows: &[MapRecord]) -> Result<(), csv::Error> {
    write_records(path, &MAP_HEADER, rows)
}

/// Rows of a `map.csv` in file order.
pub fn read_map_csv(path: &Path) -> Result<Vec<MapRecord>, csv::Error> {
    read_records(path)
}

pub fn write_photo_csv(path: &Path, rows: &[PhotoRecord]) -> Result<(), csv::Error> {
    write_records(path, &PHOTO_HEADER, rows)
}

pub fn read_photo_csv(path: &Path) -> Result<Vec<PhotoRecord>, csv::Error> {
    read_records(path)
}
