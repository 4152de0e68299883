//! Drone photo localization against a geotagged basemap.
//!
//! A [`ReferenceSet`] is loaded from `map.csv` and kept in file-name order.
//! For every [`DroneObservation`] the [`Localizer`] asks a
//! [`FeatureMatcher`] where the photo sits, retrying with the photo turned by
//! quarter turns, keeps the best qualifying candidate and interpolates the
//! photo's coordinate inside the matched reference's bounds.
//!
//! The matcher itself is external; [`CommandMatcher`] drives any program
//! that speaks the JSON protocol described on it.

mod error;
mod localizer;
mod matcher;
mod observation;
mod reference;
mod report;

pub use error::{LocalizeError, MatchError};
pub use localizer::{
    located_image_path, BatchSummary, CandidateSelector, Localizer, LocalizerParams, WorkingImage,
};
pub use matcher::{CommandMatcher, FeatureMatcher, MatchCandidate, MatchResult};
pub use observation::{
    load_observations, natural_cmp, DroneObservation, LocalizationState, MatchDiagnostics, Telemetry,
};
pub use reference::{ReferenceImage, ReferenceSet};
pub use report::{
    prepare_results_folder, write_results_csv, write_simple_output, RESULTS_FILE,
    SIMPLE_OUTPUT_FILE,
};
