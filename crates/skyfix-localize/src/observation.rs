//! Drone photos to localize and their per-photo outcome.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use skyfix_core::{GeoCoordinate, GeoError};
use skyfix_tiles::io::{read_photo_csv, PhotoRecord, PHOTOS_DATA_FILE};

use crate::error::LocalizeError;

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"];

/// Camera and flight attitude recorded with a photo. `None` when unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub altitude: Option<f64>,
    pub gimbal_roll: Option<f64>,
    pub gimbal_yaw: Option<f64>,
    pub gimbal_pitch: Option<f64>,
    pub flight_roll: Option<f64>,
    pub flight_yaw: Option<f64>,
    pub flight_pitch: Option<f64>,
}

fn known(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl Telemetry {
    fn from_record(r: &PhotoRecord) -> Self {
        Self {
            altitude: known(r.altitude),
            gimbal_roll: known(r.gimbal_roll),
            gimbal_yaw: known(r.gimbal_yaw),
            gimbal_pitch: known(r.gimbal_pitch),
            flight_roll: known(r.flight_roll),
            flight_yaw: known(r.flight_yaw),
            flight_pitch: known(r.flight_pitch),
        }
    }
}

/// Where an observation is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalizationState {
    #[default]
    Pending,
    Located,
    NotLocated,
    /// The photo could not be decoded; no attempt was made.
    Unreadable,
}

impl LocalizationState {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// Match diagnostics kept from the winning candidate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub matches: Vec<i64>,
    pub confidence: Vec<f64>,
    pub matches_invalid: Vec<i64>,
    pub confidence_invalid: Vec<f64>,
}

/// A drone photo and what localization found for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroneObservation {
    pub filename: String,
    pub path: PathBuf,
    pub ground_truth: Option<GeoCoordinate>,
    pub telemetry: Telemetry,

    pub state: LocalizationState,
    pub computed: Option<GeoCoordinate>,
    /// Index of the matched reference image.
    pub reference_index: Option<usize>,
    /// Clockwise quarter turns applied to the photo for the winning match.
    pub rotation: usize,
    pub feature_count: usize,
    pub diagnostics: MatchDiagnostics,
}

impl DroneObservation {
    pub fn new(path: impl Into<PathBuf>, ground_truth: Option<GeoCoordinate>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            filename,
            path,
            ground_truth,
            telemetry: Telemetry::default(),
            state: LocalizationState::Pending,
            computed: None,
            reference_index: None,
            rotation: 0,
            feature_count: 0,
            diagnostics: MatchDiagnostics::default(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.state == LocalizationState::Located
    }

    /// Error against ground truth, when both positions are known.
    pub fn error(&self) -> Option<GeoError> {
        Some(GeoError::between(self.ground_truth?, self.computed?))
    }
}

/// Compare file names so that embedded numbers sort by value
/// (`img2.jpg` before `img10.jpg`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut da = String::new();
                while let Some(c) = a.next_if(char::is_ascii_digit) {
                    da.push(c);
                }
                let mut db = String::new();
                while let Some(c) = b.next_if(char::is_ascii_digit) {
                    db.push(c);
                }
                let ta = da.trim_start_matches('0');
                let tb = db.trim_start_matches('0');
                let ord = ta
                    .len()
                    .cmp(&tb.len())
                    .then_with(|| ta.cmp(tb))
                    .then_with(|| da.len().cmp(&db.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.cmp(&y);
                if ord != Ordering::Equal {
                    return ord;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Load the photos of `folder`.
///
/// With a `photo_metadata.csv` the rows define the photos, their ground
/// truth and telemetry, in file order. Without it every image file in the
/// folder is taken in natural file-name order, with nothing known about it.
pub fn load_observations(folder: &Path) -> Result<Vec<DroneObservation>, LocalizeError> {
    let csv_path = folder.join(PHOTOS_DATA_FILE);
    if csv_path.is_file() {
        let records = read_photo_csv(&csv_path).map_err(|e| LocalizeError::from_csv(&csv_path, e))?;
        info!("loaded {} photos from {}", records.len(), csv_path.display());
        return Ok(records
            .iter()
            .map(|r| {
                let truth = (r.latitude.is_finite() && r.longitude.is_finite())
                    .then(|| GeoCoordinate::new(r.latitude, r.longitude));
                let mut obs = DroneObservation::new(folder.join(&r.filename), truth);
                obs.telemetry = Telemetry::from_record(r);
                obs
            })
            .collect());
    }

    let mut files = fs::read_dir(folder)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    files.retain(|p| p.is_file() && is_image(p));
    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    info!("found {} photos in {}", files.len(), folder.display());
    Ok(files
        .into_iter()
        .map(|p| DroneObservation::new(p, None))
        .collect())
}
