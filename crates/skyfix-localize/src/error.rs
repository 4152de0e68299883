use std::path::PathBuf;

/// Failures of a feature matcher for a single attempt.
///
/// These never abort a batch; the attempt simply yields no candidate.
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    #[error("failed to start matcher {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("matcher exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("invalid matcher output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Errors raised while loading inputs or localizing a photo.
#[derive(thiserror::Error, Debug)]
pub enum LocalizeError {
    #[error("{}:{line}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("cannot read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Matcher(#[from] MatchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("cannot encode diagnostics: {0}")]
    Json(#[from] serde_json::Error),
}

impl LocalizeError {
    /// Attach the file path to a CSV error, turning row-level failures into
    /// [`LocalizeError::MalformedRow`].
    pub(crate) fn from_csv(path: &std::path::Path, err: csv::Error) -> Self {
        let line = err.position().map(csv::Position::line);
        match (err.kind(), line) {
            (csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. }, Some(line)) => {
                Self::MalformedRow {
                    path: path.to_path_buf(),
                    line,
                    reason: err.to_string(),
                }
            }
            _ => Self::Csv(err),
        }
    }
}
