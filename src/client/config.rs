//! Client construction parameters.

use std::time::Duration;

/// How long a request may run before the transport gives up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The protocol version requested when none is given.
pub const DEFAULT_API_VERSION: &str = "2.0";

/// Configuration for [`ApiClient`](crate::client::ApiClient) construction.
///
/// Validation happens in the client constructor, not here; a `ClientConfig`
/// holds the caller's values verbatim.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address of the server, e.g. `https://atlas.example.com`.
    /// A missing scheme defaults to `https://`.
    pub base_uri: String,
    /// Requested protocol version, e.g. `"3.4"`.
    pub api_version: String,
    /// Per-request timeout handed to the transport.
    pub timeout: Duration,
    /// Skip TLS certificate verification in the stock HTTP transport.
    pub ignore_ssl_errors: bool,
}

impl ClientConfig {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            ignore_ssl_errors: false,
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ignore_ssl_errors(mut self, ignore: bool) -> Self {
        self.ignore_ssl_errors = ignore;
        self
    }
}
