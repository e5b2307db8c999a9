//! Authenticated HTTP access to the release host.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// User agent sent with every request; the GitHub API rejects anonymous agents.
pub const USER_AGENT: &str = concat!("setup-gitops-cli/", env!("CARGO_PKG_VERSION"));

/// Media type for release index responses.
pub(crate) const RELEASE_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Media type that makes the API redirect to the raw asset bytes.
pub(crate) const ASSET_MEDIA_TYPE: &str = "application/octet-stream";

/// Shared HTTP client carrying the optional API token.
#[derive(Debug)]
pub struct GitHubClient {
    http: Client,
    token: Option<SecretString>,
}

impl GitHubClient {
    /// Builds a client; `token` is sent as a bearer credential when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(token: Option<SecretString>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, token })
    }

    /// Starts a `GET` for `url` with the given `Accept` header.
    pub(crate) fn get(&self, url: Url, accept: &'static str) -> RequestBuilder {
        let mut request = self.http.get(url).header(ACCEPT, accept);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        request
    }
}
