//! Upstream kernel release feed.
//!
//! kernel.org publishes `releases.json` with a `latest_stable` pointer and a
//! list of release records. The record whose version matches the pointer
//! provides the source tarball URL that gets stamped into the build helper.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const USER_AGENT: &str = concat!("rebuild-kernel/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The release selected by the feed's `latest_stable` pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub source_url: String,
    pub is_end_of_life: bool,
}

/// Top-level shape of `releases.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleasesResponse {
    pub latest_stable: LatestStable,
    #[serde(default)]
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestStable {
    pub version: String,
}

/// One entry of the `releases` array.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub iseol: bool,
    pub version: String,
    #[serde(default)]
    pub moniker: String,
    /// Tarball URL. Null for linux-next snapshots.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub pgp: Option<serde_json::Value>,
    #[serde(default)]
    pub released: Released,
    #[serde(default)]
    pub gitweb: Option<String>,
    #[serde(default)]
    pub changelog: Option<serde_json::Value>,
    #[serde(default)]
    pub diffview: Option<String>,
    #[serde(default)]
    pub patch: Patch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Released {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub isodate: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub full: Option<String>,
    #[serde(default)]
    pub incremental: Option<String>,
}

/// Failures while fetching or interpreting the release feed.
#[derive(Debug)]
pub enum ReleaseError {
    /// The HTTP request could not be completed.
    Request { url: String, message: String },
    /// The server answered with a non-success status.
    Status { url: String, status: u16 },
    /// The body is not the expected JSON document.
    Decode(serde_json::Error),
    /// No release record matches `latest_stable.version`.
    NotFound { version: String },
    /// The matching record has no source tarball.
    MissingSource { version: String },
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { url, message } => {
                write!(f, "failed to fetch release feed {}: {}", url, message)
            }
            Self::Status { url, status } => {
                write!(f, "release feed {} returned HTTP {}", url, status)
            }
            Self::Decode(e) => write!(f, "failed to decode release feed: {}", e),
            Self::NotFound { version } => write!(
                f,
                "latest stable version {} is not listed in the release feed",
                version
            ),
            Self::MissingSource { version } => {
                write!(f, "release {} has no source tarball", version)
            }
        }
    }
}

impl std::error::Error for ReleaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl ReleasesResponse {
    /// Parse a `releases.json` body.
    pub fn parse(body: &str) -> Result<Self, ReleaseError> {
        serde_json::from_str(body).map_err(ReleaseError::Decode)
    }

    /// Resolve the record the `latest_stable` pointer refers to.
    pub fn latest_stable_release(&self) -> Result<ReleaseInfo, ReleaseError> {
        let version = &self.latest_stable.version;
        let release = self
            .releases
            .iter()
            .find(|r| &r.version == version)
            .ok_or_else(|| ReleaseError::NotFound {
                version: version.clone(),
            })?;

        let source_url = release
            .source
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ReleaseError::MissingSource {
                version: version.clone(),
            })?;

        Ok(ReleaseInfo {
            version: release.version.clone(),
            source_url,
            is_end_of_life: release.iseol,
        })
    }
}

/// Source of the latest stable release.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseFeed {
    fn latest_stable(&self) -> Result<ReleaseInfo, ReleaseError>;
}

/// Release feed served over HTTP.
pub struct HttpReleaseFeed {
    url: String,
}

impl HttpReleaseFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    async fn fetch_body(&self) -> Result<String, ReleaseError> {
        let request_error = |e: reqwest::Error| ReleaseError::Request {
            url: self.url.clone(),
            message: e.to_string(),
        };

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(request_error)?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }
}

impl ReleaseFeed for HttpReleaseFeed {
    fn latest_stable(&self) -> Result<ReleaseInfo, ReleaseError> {
        tracing::info!(url = %self.url, "fetching release feed");

        let rt = tokio::runtime::Runtime::new().map_err(|e| ReleaseError::Request {
            url: self.url.clone(),
            message: format!("failed to start runtime: {}", e),
        })?;
        let body = rt.block_on(self.fetch_body())?;

        let release = ReleasesResponse::parse(&body)?.latest_stable_release()?;
        tracing::info!(
            version = %release.version,
            source = %release.source_url,
            eol = release.is_end_of_life,
            "resolved latest stable release"
        );
        Ok(release)
    }
}
