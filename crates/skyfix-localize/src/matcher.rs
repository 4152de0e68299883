//! The feature-matcher seam.
//!
//! A matcher compares a query image against every image of a
//! [`ReferenceSet`] and reports where the query sits inside the best
//! reference, as fractions of that reference's width and height. The
//! reference is identified by its index in the set.

use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::reference::ReferenceSet;

/// What a matcher reports for one query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchResult {
    /// Position of the matched image in the [`ReferenceSet`].
    pub reference_index: usize,
    /// Query center inside the reference, as `[x, y]` fractions.
    pub center: [f64; 2],
    pub feature_count: usize,
    /// Mean keypoint position of the matched features, in pixels.
    #[serde(default)]
    pub feature_mean: Option<[f64; 2]>,
    #[serde(default)]
    pub matches: Vec<i64>,
    #[serde(default)]
    pub confidence: Vec<f64>,
    #[serde(default)]
    pub matches_invalid: Vec<i64>,
    #[serde(default)]
    pub confidence_invalid: Vec<f64>,
    /// Visualization written by the matcher, if any.
    #[serde(default)]
    pub located_image_path: Option<PathBuf>,
    #[serde(skip)]
    pub located_image: Option<DynamicImage>,
}

/// A match obtained at a given rotation of the query.
#[derive(Clone, Debug)]
pub struct MatchCandidate {
    /// Clockwise quarter turns applied to the query before matching.
    pub rotation: usize,
    pub result: MatchResult,
}

impl MatchCandidate {
    /// Both center fractions are below 1. Negative values are allowed; the
    /// geo-pose uses their magnitude.
    pub fn center_in_bounds(&self) -> bool {
        let [x, y] = self.result.center;
        x < 1.0 && y < 1.0
    }
}

/// Black-box image matcher.
///
/// Implementations may hold heavyweight state (a loaded model) and are
/// called sequentially. `Ok(None)` means the query matched nothing.
pub trait FeatureMatcher {
    fn match_query(
        &mut self,
        references: &ReferenceSet,
        query: &DynamicImage,
    ) -> Result<Option<MatchResult>, MatchError>;
}

impl<M: FeatureMatcher + ?Sized> FeatureMatcher for &mut M {
    fn match_query(
        &mut self,
        references: &ReferenceSet,
        query: &DynamicImage,
    ) -> Result<Option<MatchResult>, MatchError> {
        (**self).match_query(references, query)
    }
}

impl<M: FeatureMatcher + ?Sized> FeatureMatcher for Box<M> {
    fn match_query(
        &mut self,
        references: &ReferenceSet,
        query: &DynamicImage,
    ) -> Result<Option<MatchResult>, MatchError> {
        (**self).match_query(references, query)
    }
}

/// Runs an external program for every query.
///
/// The program is invoked as
/// `<program> <args..> --references <manifest> --query <image.png>`, where
/// the manifest lists the reference paths one per line in index order. It
/// must print a JSON [`MatchResult`] (or `null`) on stdout.
#[derive(Clone, Debug)]
pub struct CommandMatcher {
    program: String,
    args: Vec<String>,
}

impl CommandMatcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl FeatureMatcher for CommandMatcher {
    fn match_query(
        &mut self,
        references: &ReferenceSet,
        query: &DynamicImage,
    ) -> Result<Option<MatchResult>, MatchError> {
        let work = tempfile::tempdir()?;
        let manifest = work.path().join("references.txt");
        let query_path = work.path().join("query.png");
        references.write_manifest(&manifest)?;
        query.save(&query_path)?;

        debug!("running {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--references")
            .arg(&manifest)
            .arg("--query")
            .arg(&query_path)
            .output()
            .map_err(|source| MatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(MatchError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut result: Option<MatchResult> = serde_json::from_slice(&output.stdout)?;
        if let Some(r) = result.as_mut() {
            if let Some(path) = &r.located_image_path {
                match image::open(path) {
                    Ok(img) => r.located_image = Some(img),
                    Err(e) => warn!("cannot read matcher visualization {}: {e}", path.display()),
                }
            }
        }
        Ok(result)
    }
}
