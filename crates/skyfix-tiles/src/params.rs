use serde::{Deserialize, Serialize};

/// ArcGIS World Imagery, addressed as `{z}/{y}/{x}`.
pub const DEFAULT_TILE_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// Tile download settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileFetchParams {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of tiles downloaded in parallel; `1` downloads sequentially.
    pub concurrency: usize,
    pub user_agent: String,
    /// Remove everything in the output folder before downloading.
    pub clear_output: bool,
}

impl Default for TileFetchParams {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            timeout_secs: 30,
            concurrency: 1,
            user_agent: concat!("skyfix/", env!("CARGO_PKG_VERSION")).to_string(),
            clear_output: false,
        }
    }
}

/// Merge and split settings for a fetched tile matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchParams {
    /// Merged images larger than this on either side are split into parts.
    pub max_side: u32,
    /// Delete the individual tiles once the merged image is written.
    pub remove_tiles: bool,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            max_side: 1000,
            remove_tiles: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let p: TileFetchParams = serde_json::from_str(r#"{"concurrency": 4}"#).unwrap();
        assert_eq!(p.concurrency, 4);
        assert_eq!(p.url_template, DEFAULT_TILE_URL);
        assert_eq!(p.timeout_secs, 30);

        let s: StitchParams = serde_json::from_str("{}").unwrap();
        assert_eq!(s, StitchParams::default());
    }
}
