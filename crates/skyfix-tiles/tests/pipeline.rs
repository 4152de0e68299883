use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use skyfix_core::{tile_bottom_right, tile_center, tile_top_left, GeoCoordinate, TileIndex};
use skyfix_tiles::{
    merged_file_name, StitchParams, TileError, TileFetchParams, TileFetcher, TileResponse,
    TileSource, TileStitcher,
};

const ZOOM: u8 = 19;

fn turku() -> GeoCoordinate {
    GeoCoordinate::new(60.5058, 22.3129)
}

fn tile_color(tile: TileIndex) -> Rgb<u8> {
    Rgb([(tile.x % 251) as u8, (tile.y % 241) as u8, 200])
}

fn png_bytes(img: RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Serves solid 256x256 PNG tiles colored by tile index.
struct SolidTiles {
    status: u16,
    content_type: &'static str,
}

impl SolidTiles {
    fn ok() -> Self {
        Self {
            status: 200,
            content_type: "image/png",
        }
    }
}

impl TileSource for SolidTiles {
    fn fetch(&self, tile: TileIndex) -> Result<TileResponse, TileError> {
        Ok(TileResponse {
            url: format!("mem://{}/{}/{}", tile.zoom, tile.y, tile.x),
            status: self.status,
            content_type: Some(self.content_type.to_string()),
            bytes: png_bytes(RgbImage::from_pixel(256, 256, tile_color(tile))),
        })
    }
}

fn fetch(source: SolidTiles, params: TileFetchParams, radius: u32, out: &Path) -> Result<skyfix_tiles::FetchOutput, TileError> {
    TileFetcher::new(source, params).fetch_tiles(ZOOM, turku(), radius, out)
}

#[test]
fn fetch_builds_row_major_matrix_with_centers() {
    let dir = tempfile::tempdir().unwrap();
    let out = fetch(SolidTiles::ok(), TileFetchParams::default(), 1, dir.path()).unwrap();

    let m = &out.matrix;
    assert_eq!((m.num_rows(), m.num_cols()), (3, 3));
    assert_eq!(m.origin, TileIndex::new(m.center.x - 1, m.center.y - 1, ZOOM));
    assert_eq!(out.records.len(), 9);

    for (k, record) in out.records.iter().enumerate() {
        let expected = TileIndex::new(m.origin.x + (k % 3) as u32, m.origin.y + (k / 3) as u32, ZOOM);
        assert_eq!(record.tile, expected);
        assert_eq!(
            record.filename,
            format!("tile_z_{ZOOM}_tile_{}_{}.png", expected.x, expected.y)
        );
        assert_eq!(record.center, tile_center(expected));
        assert_eq!(&m.rows[k / 3][k % 3], &record.path);
        assert!(record.path.is_file());
    }
}

#[test]
fn parallel_fetch_keeps_layout() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let seq = fetch(SolidTiles::ok(), TileFetchParams::default(), 2, seq_dir.path()).unwrap();
    let par = fetch(
        SolidTiles::ok(),
        TileFetchParams {
            concurrency: 4,
            ..TileFetchParams::default()
        },
        2,
        par_dir.path(),
    )
    .unwrap();

    let names = |o: &skyfix_tiles::FetchOutput| o.records.iter().map(|r| r.filename.clone()).collect::<Vec<_>>();
    assert_eq!(names(&seq), names(&par));
    assert_eq!(par.matrix.num_rows(), 5);
}

#[test]
fn http_failure_aborts_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let source = SolidTiles {
        status: 404,
        content_type: "image/png",
    };
    let err = fetch(source, TileFetchParams::default(), 0, dir.path()).unwrap_err();
    assert!(matches!(err, TileError::TileSource { status: 404, .. }), "{err}");
}

#[test]
fn non_raster_response_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = SolidTiles {
        status: 200,
        content_type: "text/html",
    };
    let err = fetch(source, TileFetchParams::default(), 0, dir.path()).unwrap_err();
    match err {
        TileError::UnsupportedImageType { content_type } => assert_eq!(content_type, "text/html"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn clear_output_removes_stale_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("tiles");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("stale.txt"), b"old").unwrap();

    fetch(SolidTiles::ok(), TileFetchParams::default(), 0, &out).unwrap();
    assert!(out.join("stale.txt").exists());

    let params = TileFetchParams {
        clear_output: true,
        ..TileFetchParams::default()
    };
    fetch(SolidTiles::ok(), params, 0, &out).unwrap();
    assert!(!out.join("stale.txt").exists());
}

#[test]
fn single_row_is_not_stitched() {
    let dir = tempfile::tempdir().unwrap();
    let out = fetch(SolidTiles::ok(), TileFetchParams::default(), 0, dir.path()).unwrap();
    let err = TileStitcher::new(StitchParams::default())
        .stitch(&out.matrix, dir.path())
        .unwrap_err();
    assert!(matches!(err, TileError::TooFewRows { rows: 1 }));
}

#[test]
fn merged_bounds_come_from_outermost_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let out = fetch(SolidTiles::ok(), TileFetchParams::default(), 1, dir.path()).unwrap();
    let stitcher = TileStitcher::new(StitchParams {
        max_side: 1000,
        remove_tiles: false,
    });
    let stitched = stitcher.stitch(&out.matrix, dir.path()).unwrap();

    let m = &out.matrix;
    let last = TileIndex::new(m.origin.x + 2, m.origin.y + 2, ZOOM);
    assert_eq!(stitched.merged.filename, merged_file_name(m.center, 1));
    assert_eq!(stitched.merged.bounds.top_left, tile_top_left(m.origin));
    assert_eq!(stitched.merged.bounds.bottom_right, tile_bottom_right(last));
    assert_eq!(stitched.merged.center, tile_center(m.center));
    assert!(stitched.merged.bounds.is_well_formed());
    assert!(stitched.parts.is_empty());
    assert_eq!(stitched.basemap().len(), 1);

    let merged = image::open(&stitched.merged.path).unwrap().to_rgb8();
    assert_eq!(merged.dimensions(), (768, 768));
    assert!(m.paths().all(|p| p.is_file()));
}

#[test]
fn stitch_then_split_reproduces_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let out = fetch(SolidTiles::ok(), TileFetchParams::default(), 1, dir.path()).unwrap();
    let stitcher = TileStitcher::new(StitchParams {
        max_side: 256,
        remove_tiles: true,
    });
    let stitched = stitcher.stitch(&out.matrix, dir.path()).unwrap();
    assert!(out.matrix.paths().all(|p| !p.exists()));
    assert!(stitched.merged.path.is_file());
    assert_eq!(stitched.parts.len(), 9);

    let origin = out.matrix.origin;
    let stem = merged_file_name(out.matrix.center, 1).trim_end_matches(".png").to_string();
    for (k, part) in stitched.parts.iter().enumerate() {
        let (i, j) = ((k / 3) as u32, (k % 3) as u32);
        let tile = TileIndex::new(origin.x + i, origin.y + j, ZOOM);
        assert_eq!(part.filename, format!("{stem}_{i}_{j}.png"));
        assert_eq!(part.bounds.top_left, tile_top_left(tile));
        assert_eq!(part.bounds.bottom_right, tile_bottom_right(tile));
        assert_eq!(part.center, tile_center(tile));

        let img = image::open(&part.path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(*img.get_pixel(0, 0), tile_color(tile));
        assert_eq!(*img.get_pixel(255, 255), tile_color(tile));
    }
}
