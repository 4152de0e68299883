use serde::{Deserialize, Serialize};

/// Southern limit of the Web Mercator square, in degrees.
pub const MIN_LATITUDE: f64 = -85.051_128_78;
/// Northern limit of the Web Mercator square, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_78;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Side length of one pyramid tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Deepest supported zoom level. Tile indices stay within `u32` and the map
/// side within `i64` pixels up to here.
pub const MAX_ZOOM: u8 = 30;

/// WGS84 equatorial radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Clamp latitude and longitude into the projectable range.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            latitude: self.latitude.clamp(MIN_LATITUDE, MAX_LATITUDE),
            longitude: self.longitude.clamp(MIN_LONGITUDE, MAX_LONGITUDE),
        }
    }
}

/// Tile address in the power-of-two pyramid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileIndex {
    #[inline]
    pub const fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Number of tiles per side at this tile's zoom level.
    #[inline]
    pub fn tiles_per_side(&self) -> u64 {
        1u64 << self.zoom
    }

    /// Tile shifted by `(dx, dy)`, or `None` if it falls outside the pyramid.
    pub fn offset(&self, dx: i64, dy: i64) -> Option<Self> {
        let n = self.tiles_per_side() as i64;
        let x = i64::from(self.x) + dx;
        let y = i64::from(self.y) + dy;
        if x < 0 || y < 0 || x >= n || y >= n {
            return None;
        }
        Some(Self {
            x: x as u32,
            y: y as u32,
            zoom: self.zoom,
        })
    }
}

/// Global pixel position at some zoom level.
///
/// Signed so that offset arithmetic on derived map parts never wraps; the
/// projection functions clamp into the valid range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCoordinate {
    pub x: i64,
    pub y: i64,
}

impl PixelCoordinate {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Geographic extent of a tile or image.
///
/// For a non-degenerate extent `top_left.latitude >= bottom_right.latitude`
/// and `top_left.longitude <= bottom_right.longitude`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub top_left: GeoCoordinate,
    pub bottom_right: GeoCoordinate,
}

impl GeoBounds {
    #[inline]
    pub const fn new(top_left: GeoCoordinate, bottom_right: GeoCoordinate) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Whether the top-left corner lies north-west of the bottom-right one.
    pub fn is_well_formed(&self) -> bool {
        self.top_left.latitude >= self.bottom_right.latitude
            && self.top_left.longitude <= self.bottom_right.longitude
    }

    /// Interpolate a position given as a fraction of the image width/height.
    ///
    /// The fractions are taken by absolute value, so a slightly negative
    /// matcher output still lands inside the box.
    pub fn interpolate(&self, normalized: [f64; 2]) -> GeoCoordinate {
        let [nx, ny] = normalized;
        let tl = self.top_left;
        let br = self.bottom_right;
        GeoCoordinate {
            latitude: tl.latitude + ny.abs() * (br.latitude - tl.latitude),
            longitude: tl.longitude + nx.abs() * (br.longitude - tl.longitude),
        }
    }

    #[inline]
    pub fn center(&self) -> GeoCoordinate {
        self.interpolate([0.5, 0.5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn clamped_limits_latitude_and_longitude() {
        let c = GeoCoordinate::new(89.0, -200.0).clamped();
        assert_eq!(c.latitude, MAX_LATITUDE);
        assert_eq!(c.longitude, MIN_LONGITUDE);
    }

    #[test]
    fn tile_offset_rejects_outside_pyramid() {
        let t = TileIndex::new(0, 3, 2);
        assert_eq!(t.offset(-1, 0), None);
        assert_eq!(t.offset(0, 1), None);
        assert_eq!(t.offset(3, -3), Some(TileIndex::new(3, 0, 2)));
    }

    #[test]
    fn interpolate_hits_center_of_box() {
        let bounds = GeoBounds::new(
            GeoCoordinate::new(60.51, 22.30),
            GeoCoordinate::new(60.50, 22.32),
        );
        let c = bounds.interpolate([0.5, 0.5]);
        assert_abs_diff_eq!(c.latitude, 60.505, epsilon = 1e-12);
        assert_abs_diff_eq!(c.longitude, 22.31, epsilon = 1e-12);
    }

    #[test]
    fn interpolate_uses_absolute_fractions() {
        let bounds = GeoBounds::new(GeoCoordinate::new(1.0, 0.0), GeoCoordinate::new(0.0, 1.0));
        let c = bounds.interpolate([-0.25, -0.75]);
        assert_abs_diff_eq!(c.latitude, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(c.longitude, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn bounds_roundtrip_through_json() {
        let bounds = GeoBounds::new(GeoCoordinate::new(2.0, 1.0), GeoCoordinate::new(1.0, 2.0));
        assert!(bounds.is_well_formed());
        let json = serde_json::to_string(&bounds).unwrap();
        let back: GeoBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bounds);
    }
}
