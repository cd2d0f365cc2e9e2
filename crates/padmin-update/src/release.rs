//! Release metadata from the GitHub releases API.
//!
//! The pipeline fetches the latest-release JSON with curl and parses the few
//! fields it needs: the tag for the version, and the candidate download URLs.

use serde::Deserialize;

use padmin_core::{PadminError, Result};

/// One downloadable asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Latest-release metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub tarball_url: Option<String>,
    #[serde(default)]
    pub zipball_url: Option<String>,
}

impl Release {
    /// Parse release metadata from the API response body.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PadminError::ReleaseParse {
            message: e.to_string(),
        })
    }

    /// Version string with any leading `v` stripped from the tag.
    pub fn version(&self) -> &str {
        self.tag_name.strip_prefix('v').unwrap_or(&self.tag_name)
    }

    /// Resolve the download URL: the first uploaded asset wins, then the
    /// source tarball, then the source zipball.
    pub fn asset_url(&self) -> Option<&str> {
        self.assets
            .first()
            .map(|a| a.download_url.as_str())
            .or(self.tarball_url.as_deref())
            .or(self.zipball_url.as_deref())
    }
}
