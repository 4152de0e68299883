//! Cutting a raster into a grid of smaller images.
//!
//! This step is purely pixel based; callers attach geographic bounds to the
//! returned offsets afterwards.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::TileError;

/// One cell of a split grid, in pixels of the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitCell {
    /// Column index of the cut.
    pub i: u32,
    /// Row index of the cut.
    pub j: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

/// A written part of a split image.
#[derive(Clone, Debug)]
pub struct SplitPart {
    pub path: PathBuf,
    pub cell: SplitCell,
}

impl SplitPart {
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Grid of cells at most `line` pixels on a side covering `width x height`.
///
/// Cells are ordered column-major (all rows of column 0 first); the last
/// column/row is narrower when the size is not a multiple of `line`.
pub fn split_cells(width: u32, height: u32, line: u32) -> Result<Vec<SplitCell>, TileError> {
    if line == 0 {
        return Err(TileError::InvalidSplitSize);
    }
    let x_cuts = width.div_ceil(line);
    let y_cuts = height.div_ceil(line);
    debug!("split {width}x{height} into {x_cuts}x{y_cuts} cells of {line}");

    let mut cells = Vec::with_capacity((x_cuts * y_cuts) as usize);
    for i in 0..x_cuts {
        let x_offset = i * line;
        let w = line.min(width - x_offset);
        for j in 0..y_cuts {
            let y_offset = j * line;
            let h = line.min(height - y_offset);
            cells.push(SplitCell {
                i,
                j,
                x_offset,
                y_offset,
                width: w,
                height: h,
            });
        }
    }
    Ok(cells)
}

/// Path of a split part: `{stem}_{i}_{j}.{extension}` next to `source`.
pub fn part_path(source: &Path, i: u32, j: u32, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}_{i}_{j}.{extension}"))
}

/// Split the image at `source` into parts written beside it.
///
/// `extension` selects the output format of the parts (`png`, `jpg`, ...).
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(source), fields(path = %source.display())))]
pub fn split_image(source: &Path, line: u32, extension: &str) -> Result<Vec<SplitPart>, TileError> {
    let image = image::open(source)?;
    info!(
        "splitting {} ({}x{}) into parts of at most {line}x{line}",
        source.display(),
        image.width(),
        image.height()
    );

    split_cells(image.width(), image.height(), line)?
        .into_iter()
        .map(|cell| {
            let path = part_path(source, cell.i, cell.j, extension);
            image
                .crop_imm(cell.x_offset, cell.y_offset, cell.width, cell.height)
                .save(&path)?;
            Ok(SplitPart { path, cell })
        })
        .collect()
}
