use std::path::PathBuf;

/// Errors raised while building a basemap.
///
/// Any of these aborts the whole operation: a basemap with missing tiles or
/// unknown bounds is never written.
#[derive(thiserror::Error, Debug)]
pub enum TileError {
    #[error("tile source returned HTTP {status} for {url}")]
    TileSource { url: String, status: u16 },
    #[error("unsupported tile image type {content_type:?}")]
    UnsupportedImageType { content_type: String },
    #[error("{} carries no geographic projection metadata", path.display())]
    MissingProjectionMetadata { path: PathBuf },
    #[error("{} uses unsupported projection EPSG:{code}", path.display())]
    UnsupportedProjection { path: PathBuf, code: u16 },
    #[error("tile ({x}, {y}) is outside the zoom {zoom} pyramid")]
    OutOfRange { x: i64, y: i64, zoom: u8 },
    #[error("zoom {zoom} is deeper than the supported maximum {max}")]
    UnsupportedZoom { zoom: u8, max: u8 },
    #[error("stitching needs at least 2 tile rows, got {rows}")]
    TooFewRows { rows: usize },
    #[error("tile row {row} has {len} tiles, expected {expected}")]
    RaggedMatrix {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("tile {} is {width}x{height}, expected {expected}x{expected}", path.display())]
    TileSize {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("split size must be positive")]
    InvalidSplitSize,
    #[error("failed to geotag {}: {reason}", path.display())]
    Geotag { path: PathBuf, reason: String },
    #[error(transparent)]
    Http(#[from] ureq::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
