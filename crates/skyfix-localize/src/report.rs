//! Result files of a localization run.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use crate::error::LocalizeError;
use crate::observation::DroneObservation;

/// Full per-photo results.
pub const RESULTS_FILE: &str = "calculated_coordinates.csv";
/// Calculated coordinates only, one line per photo.
pub const SIMPLE_OUTPUT_FILE: &str = "output.csv";

const RESULTS_HEADER: [&str; 16] = [
    "Filename",
    "Latitude",
    "Longitude",
    "Calculated_Latitude",
    "Calculated_Longitude",
    "Latitude_Error",
    "Longitude_Error",
    "Meters_Error",
    "Matched",
    "Reference",
    "Rotation",
    "Features",
    "Matches",
    "Confidence",
    "Matches_Invalid",
    "Confidence_Invalid",
];

#[derive(Serialize)]
struct ResultRow<'a> {
    filename: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    calculated_latitude: Option<f64>,
    calculated_longitude: Option<f64>,
    latitude_error: Option<f64>,
    longitude_error: Option<f64>,
    meters_error: Option<f64>,
    matched: bool,
    reference: Option<usize>,
    rotation: usize,
    features: usize,
    matches: String,
    confidence: String,
    matches_invalid: String,
    confidence_invalid: String,
}

impl<'a> ResultRow<'a> {
    fn new(obs: &'a DroneObservation) -> Result<Self, serde_json::Error> {
        let error = obs.error();
        let d = &obs.diagnostics;
        Ok(Self {
            filename: &obs.filename,
            latitude: obs.ground_truth.map(|c| c.latitude),
            longitude: obs.ground_truth.map(|c| c.longitude),
            calculated_latitude: obs.computed.map(|c| c.latitude),
            calculated_longitude: obs.computed.map(|c| c.longitude),
            latitude_error: error.map(|e| e.latitude_delta),
            longitude_error: error.map(|e| e.longitude_delta),
            meters_error: error.map(|e| e.distance_m),
            matched: obs.is_matched(),
            reference: obs.reference_index,
            rotation: obs.rotation,
            features: obs.feature_count,
            matches: serde_json::to_string(&d.matches)?,
            confidence: serde_json::to_string(&d.confidence)?,
            matches_invalid: serde_json::to_string(&d.matches_invalid)?,
            confidence_invalid: serde_json::to_string(&d.confidence_invalid)?,
        })
    }
}

/// Create the results folder and delete files left from a previous run.
pub fn prepare_results_folder(folder: &Path) -> Result<(), LocalizeError> {
    fs::create_dir_all(folder)?;
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            debug!("removing old result {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Write one row per observation, located or not.
pub fn write_results_csv(path: &Path, observations: &[DroneObservation]) -> Result<(), LocalizeError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(RESULTS_HEADER)?;
    for obs in observations {
        let row = ResultRow::new(obs)?;
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("wrote {} ({} rows)", path.display(), observations.len());
    Ok(())
}

/// Write `lat,lon` per observation; both fields are empty when not located.
pub fn write_simple_output(path: &Path, observations: &[DroneObservation]) -> Result<(), LocalizeError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for obs in observations {
        let c = obs.computed;
        writer.serialize((c.map(|c| c.latitude), c.map(|c| c.longitude)))?;
    }
    writer.flush()?;
    Ok(())
}
