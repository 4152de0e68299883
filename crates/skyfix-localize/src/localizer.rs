//! Rotation search and geo-pose computation.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use skyfix_core::GeoCoordinate;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::LocalizeError;
use crate::matcher::{FeatureMatcher, MatchCandidate};
use crate::observation::{DroneObservation, LocalizationState, MatchDiagnostics};
use crate::reference::ReferenceSet;

/// Localizer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerParams {
    /// Retry the match with the photo turned by successive quarter turns.
    pub rotation_search: bool,
    /// Number of attempts when rotation search is on.
    pub rotations: usize,
    /// Save the matcher's visualization as `{photo}_located.png`.
    pub save_located_images: bool,
}

impl Default for LocalizerParams {
    fn default() -> Self {
        Self {
            rotation_search: true,
            rotations: 4,
            save_located_images: true,
        }
    }
}

impl LocalizerParams {
    /// Matcher calls per photo.
    pub fn attempts(&self) -> usize {
        if self.rotation_search {
            self.rotations.max(1)
        } else {
            1
        }
    }
}

/// The query image and how often it has been turned so far.
pub struct WorkingImage {
    image: DynamicImage,
    rotations: usize,
}

impl WorkingImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            rotations: 0,
        }
    }

    /// Turn the image a further 90 degrees clockwise.
    pub fn rotate_clockwise(&mut self) {
        self.image = self.image.rotate90();
        self.rotations += 1;
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Total quarter turns applied.
    pub fn rotations(&self) -> usize {
        self.rotations
    }
}

/// Keeps the best candidate seen so far.
///
/// A candidate wins only with strictly more features than the current best
/// and a center below 1 on both axes; ties keep the earlier candidate.
#[derive(Debug, Default)]
pub struct CandidateSelector {
    best: Option<MatchCandidate>,
    best_feature_count: usize,
}

impl CandidateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate; returns whether it became the new best.
    pub fn offer(&mut self, candidate: MatchCandidate) -> bool {
        if candidate.result.feature_count > self.best_feature_count && candidate.center_in_bounds() {
            self.best_feature_count = candidate.result.feature_count;
            self.best = Some(candidate);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> Option<&MatchCandidate> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<MatchCandidate> {
        self.best
    }
}

/// Counts of a batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub located: usize,
    pub not_located: usize,
    pub unreadable: usize,
}

/// Localizes drone photos against a reference set with a matcher.
pub struct Localizer<'a, M> {
    references: &'a ReferenceSet,
    matcher: M,
    params: LocalizerParams,
}

impl<'a, M: FeatureMatcher> Localizer<'a, M> {
    pub fn new(references: &'a ReferenceSet, matcher: M, params: LocalizerParams) -> Self {
        Self {
            references,
            matcher,
            params,
        }
    }

    pub fn params(&self) -> &LocalizerParams {
        &self.params
    }

    /// Run the rotation search for one image and return the winning
    /// candidate, if any.
    ///
    /// The image is turned before every attempt after the first, so attempt
    /// `k` sees it rotated `k` times. Matcher failures and candidates
    /// pointing outside the reference set count as empty attempts.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, image)))]
    pub fn search(&mut self, image: DynamicImage) -> Option<MatchCandidate> {
        let mut working = WorkingImage::new(image);
        let mut selector = CandidateSelector::new();

        for attempt in 0..self.params.attempts() {
            if attempt > 0 {
                working.rotate_clockwise();
            }
            let result = match self.matcher.match_query(self.references, working.image()) {
                Ok(Some(result)) => result,
                Ok(None) => {
                    debug!("rotation {}: no match", working.rotations());
                    continue;
                }
                Err(e) => {
                    warn!("rotation {}: matcher failed: {e}", working.rotations());
                    continue;
                }
            };
            if self.references.get(result.reference_index).is_none() {
                warn!(
                    "rotation {}: matcher returned reference {} of {}",
                    working.rotations(),
                    result.reference_index,
                    self.references.len()
                );
                continue;
            }

            let candidate = MatchCandidate {
                rotation: working.rotations(),
                result,
            };
            let features = candidate.result.feature_count;
            let center = candidate.result.center;
            if selector.offer(candidate) {
                debug!(
                    "rotation {}: new best with {features} features at {center:?}",
                    working.rotations()
                );
            } else {
                debug!(
                    "rotation {}: {features} features at {center:?} rejected",
                    working.rotations()
                );
            }
        }
        selector.into_best()
    }

    /// Coordinate of a candidate inside its reference image.
    pub fn geo_pose(&self, candidate: &MatchCandidate) -> Option<GeoCoordinate> {
        let reference = self.references.get(candidate.result.reference_index)?;
        Some(reference.bounds.interpolate(candidate.result.center))
    }

    /// Localize one observation in place.
    ///
    /// An unreadable photo marks the observation [`LocalizationState::Unreadable`]
    /// and returns the read error.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, observation, results), fields(photo = %observation.filename)))]
    pub fn localize(
        &mut self,
        observation: &mut DroneObservation,
        results: Option<&Path>,
    ) -> Result<(), LocalizeError> {
        let image = match image::open(&observation.path) {
            Ok(img) => img,
            Err(source) => {
                observation.state = LocalizationState::Unreadable;
                return Err(LocalizeError::ImageRead {
                    path: observation.path.clone(),
                    source,
                });
            }
        };

        let Some(best) = self.search(image) else {
            observation.state = LocalizationState::NotLocated;
            info!("{}: not located", observation.filename);
            return Ok(());
        };
        let Some(computed) = self.geo_pose(&best) else {
            observation.state = LocalizationState::NotLocated;
            return Ok(());
        };

        observation.state = LocalizationState::Located;
        observation.computed = Some(computed);
        observation.reference_index = Some(best.result.reference_index);
        observation.rotation = best.rotation;
        observation.feature_count = best.result.feature_count;
        observation.diagnostics = MatchDiagnostics {
            matches: best.result.matches.clone(),
            confidence: best.result.confidence.clone(),
            matches_invalid: best.result.matches_invalid.clone(),
            confidence_invalid: best.result.confidence_invalid.clone(),
        };
        info!(
            "{}: located at ({:.7}, {:.7}) with {} features, rotation {}",
            observation.filename,
            computed.latitude,
            computed.longitude,
            best.result.feature_count,
            best.rotation
        );
        if let Some(err) = observation.error() {
            info!("{}: error {:.1} m", observation.filename, err.distance_m);
        }

        if let (true, Some(folder), Some(img)) = (
            self.params.save_located_images,
            results,
            best.result.located_image.as_ref(),
        ) {
            let path = located_image_path(folder, &observation.filename);
            if let Err(e) = img.save(&path) {
                warn!("cannot save {}: {e}", path.display());
            }
        }
        Ok(())
    }

    /// Localize every observation. Per-photo failures are logged and the
    /// batch continues.
    pub fn run(&mut self, observations: &mut [DroneObservation], results: Option<&Path>) -> BatchSummary {
        let mut summary = BatchSummary {
            total: observations.len(),
            ..BatchSummary::default()
        };
        for (i, observation) in observations.iter_mut().enumerate() {
            info!("[{}/{}] {}", i + 1, summary.total, observation.filename);
            if let Err(e) = self.localize(observation, results) {
                warn!("{e}; skipping");
            }
            match observation.state {
                LocalizationState::Located => summary.located += 1,
                LocalizationState::Unreadable => summary.unreadable += 1,
                _ => summary.not_located += 1,
            }
        }
        info!(
            "located {} of {} photos ({} unreadable)",
            summary.located, summary.total, summary.unreadable
        );
        summary
    }
}

/// Path of the located-image artifact for a photo.
pub fn located_image_path(results: &Path, photo_filename: &str) -> PathBuf {
    results.join(format!("{photo_filename}_located.png"))
}
