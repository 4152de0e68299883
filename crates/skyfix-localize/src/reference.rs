//! The geotagged basemap images a photo is matched against.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use skyfix_core::GeoBounds;
use skyfix_tiles::io::{read_map_csv, MapRecord, MAP_DATA_FILE};

use crate::error::LocalizeError;

/// A basemap image and its geographic extent.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceImage {
    pub filename: String,
    pub path: PathBuf,
    pub bounds: GeoBounds,
}

impl ReferenceImage {
    pub fn open(&self) -> Result<image::DynamicImage, LocalizeError> {
        image::open(&self.path).map_err(|source| LocalizeError::ImageRead {
            path: self.path.clone(),
            source,
        })
    }
}

/// Basemap images sorted by file name.
///
/// Matchers report the matched reference by position, so the order is fixed
/// at construction and entries are never removed or reordered afterwards.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSet {
    images: Vec<ReferenceImage>,
}

impl ReferenceSet {
    /// Build from `map.csv` rows, resolving file names against `folder`.
    pub fn from_records(folder: &Path, records: Vec<MapRecord>) -> Self {
        let mut images = records
            .into_iter()
            .map(|r| ReferenceImage {
                path: folder.join(&r.filename),
                bounds: r.bounds(),
                filename: r.filename,
            })
            .collect::<Vec<_>>();
        images.sort_by(|a, b| a.filename.cmp(&b.filename));
        Self { images }
    }

    /// Load `folder/map.csv`.
    pub fn load(folder: &Path) -> Result<Self, LocalizeError> {
        let csv_path = folder.join(MAP_DATA_FILE);
        let records = read_map_csv(&csv_path).map_err(|e| LocalizeError::from_csv(&csv_path, e))?;
        for (i, r) in records.iter().enumerate() {
            if !r.bounds().is_well_formed() {
                return Err(LocalizeError::MalformedRow {
                    path: csv_path.clone(),
                    line: i as u64 + 2,
                    reason: format!("{}: top-left corner is not north-west of bottom-right", r.filename),
                });
            }
        }

        let set = Self::from_records(folder, records);
        for image in set.iter().filter(|img| !img.path.is_file()) {
            warn!("reference image {} does not exist", image.path.display());
        }
        info!("loaded {} reference images from {}", set.len(), csv_path.display());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceImage> {
        self.images.iter()
    }

    /// Write the reference paths, one per line, in index order.
    pub fn write_manifest(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(fs::File::create(path)?);
        for image in &self.images {
            writeln!(out, "{}", image.path.display())?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfix_core::GeoCoordinate;
    use skyfix_tiles::io::write_map_csv;

    fn record(name: &str, lat: f64) -> MapRecord {
        MapRecord::new(
            name,
            GeoBounds::new(GeoCoordinate::new(lat + 0.01, 22.0), GeoCoordinate::new(lat, 22.01)),
        )
    }

    #[test]
    fn records_are_sorted_by_filename() {
        let set = ReferenceSet::from_records(
            Path::new("/map"),
            vec![record("c.png", 3.0), record("a.png", 1.0), record("b.png", 2.0)],
        );
        let names = set.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
        assert_eq!(set.get(1).unwrap().path, PathBuf::from("/map/b.png"));
        assert_eq!(set.get(1).unwrap().bounds.bottom_right.latitude, 2.0);
        assert!(set.get(3).is_none());
    }

    #[test]
    fn load_keeps_missing_images_and_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_map_csv(
            &dir.path().join(MAP_DATA_FILE),
            &[record("z.png", 1.0), record("m.png", 2.0)],
        )
        .unwrap();

        let set = ReferenceSet::load(dir.path()).unwrap();
        assert_eq!(set.len(), 2);

        let manifest = dir.path().join("refs.txt");
        set.write_manifest(&manifest).unwrap();
        let text = fs::read_to_string(&manifest).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("m.png"));
        assert!(lines[1].ends_with("z.png"));
    }

    #[test]
    fn malformed_bounds_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MAP_DATA_FILE),
            "Filename,Top_left_lat,Top_left_lon,Bottom_right_lat,Bottom_right_long\na.png,1.0,x,0.0,1.0\n",
        )
        .unwrap();
        match ReferenceSet::load(dir.path()) {
            Err(LocalizeError::MalformedRow { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let flipped = MapRecord::new(
            "a.png",
            GeoBounds::new(GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(1.0, 1.0)),
        );
        write_map_csv(&dir.path().join(MAP_DATA_FILE), &[flipped]).unwrap();
        assert!(matches!(
            ReferenceSet::load(dir.path()),
            Err(LocalizeError::MalformedRow { line: 2, .. })
        ));
    }
}
