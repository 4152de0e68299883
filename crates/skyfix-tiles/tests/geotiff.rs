use std::fs::File;
use std::path::Path;

use approx::assert_abs_diff_eq;
use skyfix_tiles::io::{read_map_csv, MAP_DATA_FILE};
use skyfix_tiles::{read_georeference, split_map_path, ModelSpace, TileError};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const GEOGRAPHIC_KEYS: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
const UTM_KEYS: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32634];

fn write_geotiff(path: &Path, width: u32, height: u32, keys: Option<&[u16]>) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::RGB8>(width, height).unwrap();
    if let Some(keys) = keys {
        let scale = [0.0001f64, 0.0001, 0.0];
        let tiepoint = [0.0f64, 0.0, 0.0, 22.30, 60.51, 0.0];
        image.encoder().write_tag(Tag::Unknown(33550), &scale[..]).unwrap();
        image.encoder().write_tag(Tag::Unknown(33922), &tiepoint[..]).unwrap();
        image.encoder().write_tag(Tag::Unknown(34735), keys).unwrap();
    }
    let data = vec![90u8; (width * height * 3) as usize];
    image.write_data(&data).unwrap();
}

#[test]
fn reads_geographic_georeference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("area.tif");
    write_geotiff(&path, 200, 100, Some(&GEOGRAPHIC_KEYS));

    let georef = read_georeference(&path).unwrap();
    assert_eq!((georef.width, georef.height), (200, 100));
    assert_eq!(georef.space, ModelSpace::Geographic);
    let b = georef.bounds();
    assert_abs_diff_eq!(b.top_left.latitude, 60.51, epsilon = 1e-9);
    assert_abs_diff_eq!(b.bottom_right.longitude, 22.32, epsilon = 1e-9);
}

#[test]
fn untagged_tiff_is_missing_projection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.tif");
    write_geotiff(&path, 16, 16, None);

    assert!(matches!(
        read_georeference(&path),
        Err(TileError::MissingProjectionMetadata { .. })
    ));
    assert!(matches!(
        split_map_path(&path, 8),
        Err(TileError::MissingProjectionMetadata { .. })
    ));
}

#[test]
fn unsupported_projected_crs_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utm.tif");
    write_geotiff(&path, 16, 16, Some(&UTM_KEYS));
    assert!(matches!(
        read_georeference(&path),
        Err(TileError::UnsupportedProjection { code: 32634, .. })
    ));
}

#[test]
fn folder_split_writes_map_csv_and_skips_untagged() {
    let dir = tempfile::tempdir().unwrap();
    write_geotiff(&dir.path().join("area.tif"), 400, 200, Some(&GEOGRAPHIC_KEYS));
    write_geotiff(&dir.path().join("plain.tif"), 16, 16, None);

    let parts = split_map_path(dir.path(), 256).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].filename, "area_0_0.png");
    assert_eq!(parts[1].filename, "area_1_0.png");

    let right = &parts[1];
    assert_abs_diff_eq!(right.bounds.top_left.longitude, 22.3256, epsilon = 1e-9);
    assert_abs_diff_eq!(right.bounds.bottom_right.longitude, 22.34, epsilon = 1e-9);
    assert_abs_diff_eq!(right.bounds.top_left.latitude, 60.51, epsilon = 1e-9);
    assert_abs_diff_eq!(right.bounds.bottom_right.latitude, 60.49, epsilon = 1e-9);

    let img = image::open(&right.path).unwrap();
    assert_eq!((img.width(), img.height()), (144, 200));

    let rows = read_map_csv(&dir.path().join(MAP_DATA_FILE)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].filename, "area_1_0.png");
    assert_eq!(rows[1].bounds(), right.bounds);
}
