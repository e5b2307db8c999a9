//! Resolves the download URL of the release asset matching a platform.
//!
//! A single tagged release is fetched from the GitHub API per acquisition
//! attempt and scanned for an asset whose name matches exactly. Nothing is
//! cached between attempts.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::TOOL_NAME;
use crate::http::{GitHubClient, RELEASE_MEDIA_TYPE};
use crate::platform::VendorPlatform;
use crate::retry::Transient;
use crate::version::VersionSpec;

const LOG_TARGET: &str = "gitops_setup::release";

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Account publishing the releases.
pub const RELEASE_OWNER: &str = "mxcd";

/// Repository publishing the releases.
pub const RELEASE_REPO: &str = "gitops-cli";

/// The asset a version/platform pair resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    tag: String,
    file_name: String,
}

impl AssetDescriptor {
    /// Names the asset for `platform` within the release tagged `version`.
    ///
    /// # Examples
    /// ```
    /// use setup_gitops_cli::{AssetDescriptor, RawPlatform, VersionSpec};
    ///
    /// let platform = RawPlatform::new("win32", "x64").normalize();
    /// let asset = AssetDescriptor::resolve(&platform, &VersionSpec::default());
    /// assert_eq!(asset.file_name(), "gitops_windows_amd64.exe");
    /// ```
    #[must_use]
    pub fn resolve(platform: &VendorPlatform, version: &VersionSpec) -> Self {
        Self {
            tag: version.as_str().to_owned(),
            file_name: format!(
                "{TOOL_NAME}_{}_{}{}",
                platform.os(),
                platform.arch(),
                platform.extension()
            ),
        }
    }

    /// Release tag the asset belongs to.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Exact asset file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Assets published by one tagged release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseMetadata {
    /// Published assets in API order.
    pub assets: Vec<ReleaseAsset>,
}

/// A single published asset.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// File name of the asset.
    pub name: String,
    /// API URL that serves the asset bytes.
    pub url: Url,
}

impl ReleaseMetadata {
    /// Finds the asset with exactly the given name.
    #[must_use]
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|asset| asset.name.clone()).collect()
    }
}

/// Failures while resolving an asset URL.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The configured API URL cannot carry path segments.
    #[error("API URL cannot be used as a base: {url}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: Url,
    },
    /// The request did not complete.
    #[error("failed to fetch release index from {url}")]
    Transport {
        /// Requested URL.
        url: Url,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The API answered with a non-success status.
    #[error("release index request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: Url,
        /// Status returned.
        status: StatusCode,
    },
    /// The response body was not a release document.
    #[error("failed to decode release index from {url}")]
    Decode {
        /// Requested URL.
        url: Url,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// The release does not publish the asset.
    #[error("release {tag} has no asset named {name}; available: {}", available.join(", "))]
    AssetNotFound {
        /// Asset that was looked for.
        name: String,
        /// Release tag searched.
        tag: String,
        /// Names the release does publish.
        available: Vec<String>,
    },
}

impl Transient for ReleaseError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::InvalidBaseUrl { .. } | Self::Decode { .. } | Self::AssetNotFound { .. } => {
                false
            }
        }
    }
}

/// Location of the release index for one repository.
#[derive(Debug, Clone)]
pub struct ReleaseIndex {
    api_url: Url,
    owner: String,
    repo: String,
}

impl ReleaseIndex {
    /// Points at the gitops CLI releases behind `api_url`.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            owner: RELEASE_OWNER.to_owned(),
            repo: RELEASE_REPO.to_owned(),
        }
    }

    /// URL of the release tagged `tag`. Any path prefix on the API URL
    /// (as used by GitHub Enterprise) is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidBaseUrl`] for URLs such as `mailto:`.
    pub fn release_url(&self, tag: &str) -> Result<Url, ReleaseError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ReleaseError::InvalidBaseUrl {
                url: self.api_url.clone(),
            })?
            .pop_if_empty()
            .extend([
                "repos",
                self.owner.as_str(),
                self.repo.as_str(),
                "releases",
                "tags",
                tag,
            ]);
        Ok(url)
    }

    /// Fetches the assets of the release tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails, the API answers with a
    /// non-success status, or the body cannot be decoded.
    pub async fn fetch(
        &self,
        client: &GitHubClient,
        tag: &str,
    ) -> Result<ReleaseMetadata, ReleaseError> {
        let url = self.release_url(tag)?;
        debug!(target: LOG_TARGET, %url, "fetching release index");

        let response = client
            .get(url.clone(), RELEASE_MEDIA_TYPE)
            .send()
            .await
            .map_err(|source| ReleaseError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status { url, status });
        }

        response
            .json::<ReleaseMetadata>()
            .await
            .map_err(|source| ReleaseError::Decode { url, source })
    }

    /// Resolves the download URL of `asset`.
    ///
    /// # Errors
    ///
    /// Propagates [`ReleaseIndex::fetch`] failures and returns
    /// [`ReleaseError::AssetNotFound`] when no asset matches exactly.
    pub async fn resolve_download_url(
        &self,
        client: &GitHubClient,
        asset: &AssetDescriptor,
    ) -> Result<Url, ReleaseError> {
        info!(
            target: LOG_TARGET,
            tag = asset.tag(),
            asset = asset.file_name(),
            "resolving release asset"
        );
        let release = self.fetch(client, asset.tag()).await?;

        let Some(found) = release.find_asset(asset.file_name()) else {
            return Err(ReleaseError::AssetNotFound {
                name: asset.file_name().to_owned(),
                tag: asset.tag().to_owned(),
                available: release.asset_names(),
            });
        };

        debug!(target: LOG_TARGET, url = %found.url, "resolved asset download URL");
        Ok(found.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RawPlatform;
    use crate::test_support::release_json;
    use rstest::rstest;

    fn index(base: &str) -> ReleaseIndex {
        ReleaseIndex::new(Url::parse(base).expect("valid base url"))
    }

    #[rstest]
    #[case("win32", "x64", "gitops_windows_amd64.exe")]
    #[case("darwin", "arm64", "gitops_macos_arm64")]
    #[case("linux", "x64", "gitops_ubuntu_amd64")]
    fn asset_names_follow_vendor_scheme(#[case] os: &str, #[case] arch: &str, #[case] expected: &str) {
        let platform = RawPlatform::new(os, arch).normalize();
        let asset = AssetDescriptor::resolve(&platform, &VersionSpec::default());
        assert_eq!(asset.file_name(), expected);
        assert_eq!(asset.tag(), "2.2.2");
    }

    #[rstest]
    #[case("https://api.github.com", "https://api.github.com/repos/mxcd/gitops-cli/releases/tags/2.2.2")]
    #[case(
        "https://ghe.example.com/api/v3/",
        "https://ghe.example.com/api/v3/repos/mxcd/gitops-cli/releases/tags/2.2.2"
    )]
    fn release_url_keeps_api_prefix(#[case] base: &str, #[case] expected: &str) {
        let url = index(base).release_url("2.2.2").expect("release url");
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = index("mailto:ops@example.com")
            .release_url("2.2.2")
            .expect_err("cannot be a base");
        assert!(matches!(err, ReleaseError::InvalidBaseUrl { .. }));
    }

    #[rstest]
    #[case(StatusCode::BAD_GATEWAY, true)]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::NOT_FOUND, false)]
    fn classifies_transient_statuses(#[case] status: StatusCode, #[case] expected: bool) {
        let err = ReleaseError::Status {
            url: Url::parse(DEFAULT_API_URL).expect("url"),
            status,
        };
        assert_eq!(err.is_transient(), expected);
    }

    #[tokio::test]
    async fn resolves_matching_asset() {
        let mut server = mockito::Server::new_async().await;
        let asset_url = format!("{}/assets/7", server.url());
        let other_url = format!("{}/assets/6", server.url());
        let mock = server
            .mock("GET", "/repos/mxcd/gitops-cli/releases/tags/2.2.2")
            .match_header("accept", RELEASE_MEDIA_TYPE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release_json(&[
                ("gitops_macos_arm64", other_url.as_str()),
                ("gitops_windows_amd64.exe", asset_url.as_str()),
            ]))
            .create_async()
            .await;

        let client = GitHubClient::new(None).expect("client");
        let platform = RawPlatform::new("win32", "x64").normalize();
        let asset = AssetDescriptor::resolve(&platform, &VersionSpec::default());
        let url = index(&server.url())
            .resolve_download_url(&client, &asset)
            .await
            .expect("asset resolves");

        assert_eq!(url.as_str(), asset_url);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_asset_lists_available_names() {
        let mut server = mockito::Server::new_async().await;
        let asset_url = format!("{}/assets/1", server.url());
        let _mock = server
            .mock("GET", "/repos/mxcd/gitops-cli/releases/tags/2.2.2")
            .with_status(200)
            .with_body(release_json(&[("gitops_ubuntu_amd64", asset_url.as_str())]))
            .create_async()
            .await;

        let client = GitHubClient::new(None).expect("client");
        let platform = RawPlatform::new("plan9", "mips").normalize();
        let asset = AssetDescriptor::resolve(&platform, &VersionSpec::default());
        let err = index(&server.url())
            .resolve_download_url(&client, &asset)
            .await
            .expect_err("asset is missing");

        match err {
            ReleaseError::AssetNotFound { name, available, .. } => {
                assert_eq!(name, "gitops_plan9_mips");
                assert_eq!(available, vec!["gitops_ubuntu_amd64".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_tag_is_a_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/mxcd/gitops-cli/releases/tags/9.9.9")
            .with_status(404)
            .create_async()
            .await;

        let client = GitHubClient::new(None).expect("client");
        let err = index(&server.url())
            .fetch(&client, "9.9.9")
            .await
            .expect_err("release is missing");

        assert!(matches!(
            err,
            ReleaseError::Status { status: StatusCode::NOT_FOUND, .. }
        ));
    }

    #[tokio::test]
    async fn sends_token_as_bearer_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/mxcd/gitops-cli/releases/tags/2.2.2")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .with_body(release_json(&[]))
            .create_async()
            .await;

        let client = GitHubClient::new(Some("s3cret".to_owned().into())).expect("client");
        let release = index(&server.url())
            .fetch(&client, "2.2.2")
            .await
            .expect("release fetched");

        assert!(release.assets.is_empty());
        mock.assert_async().await;
    }
}
