//! Where tiles come from.
//!
//! [`TileSource`] is the seam between the fetch pipeline and the network.
//! [`HttpTileSource`] talks to a real tile server; tests plug in an
//! in-memory source instead.

use std::time::Duration;

use log::debug;
use skyfix_core::TileIndex;

use crate::error::TileError;
use crate::params::TileFetchParams;

/// Raw answer of a tile source for one tile.
#[derive(Clone, Debug)]
pub struct TileResponse {
    /// Address the tile was requested from, for error reporting.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TileResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A provider of map tiles.
///
/// Implementations must be shareable across the download worker pool.
pub trait TileSource: Send + Sync {
    fn fetch(&self, tile: TileIndex) -> Result<TileResponse, TileError>;
}

impl<T: TileSource + ?Sized> TileSource for &T {
    fn fetch(&self, tile: TileIndex) -> Result<TileResponse, TileError> {
        (**self).fetch(tile)
    }
}

/// Raster formats accepted from a tile source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Map an HTTP content type to a supported raster kind.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or_default().trim();
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Expand a tile URL template.
///
/// Named placeholders `{z}`, `{x}`, `{y}` are substituted wherever they
/// appear. A template using bare `{}` placeholders is filled positionally
/// with zoom, row and column, in that order.
pub fn tile_url(template: &str, tile: TileIndex) -> String {
    if template.contains("{z}") || template.contains("{x}") || template.contains("{y}") {
        return template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());
    }

    let values = [tile.zoom.to_string(), tile.y.to_string(), tile.x.to_string()];
    let mut out = String::with_capacity(template.len() + 16);
    let mut pieces = template.split("{}");
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for (i, piece) in pieces.enumerate() {
        if let Some(v) = values.get(i) {
            out.push_str(v);
        } else {
            out.push_str("{}");
        }
        out.push_str(piece);
    }
    out
}

/// Blocking HTTP tile source.
pub struct HttpTileSource {
    agent: ureq::Agent,
    url_template: String,
    user_agent: String,
}

impl HttpTileSource {
    pub fn new(params: &TileFetchParams) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(params.timeout_secs)))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            url_template: params.url_template.clone(),
            user_agent: params.user_agent.clone(),
        }
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: TileIndex) -> Result<TileResponse, TileError> {
        let url = tile_url(&self.url_template, tile);
        debug!("GET {url}");
        let mut response = self
            .agent
            .get(url.as_str())
            .header("User-Agent", self.user_agent.as_str())
            .call()?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.body_mut().read_to_vec()?;

        Ok(TileResponse {
            url,
            status,
            content_type,
            bytes,
        })
    }
}
