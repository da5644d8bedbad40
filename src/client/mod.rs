//! The orchestrating client: construction, version negotiation, URI building,
//! and the request path every sub-client funnels through.
//!
//! A [`ClientCore`] holds everything shared between the orchestrating client
//! and its sub-clients: the negotiated version, the deployment mode, the
//! capability gate entry point, and the transport. Sub-clients receive an
//! `Arc<ClientCore>` from their factories and identify themselves by passing
//! their registration namespace explicitly into every gated call.

pub mod config;
pub mod gate;
pub mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::envelope::codec;
use crate::envelope::types::{ApiErrorDetail, Credentials, Site};
use crate::error::ClientError;
use crate::transport::{
    HttpTransport, Method, RequestBody, Transport, TransportRequest, TransportResponse,
    AUTH_HEADER,
};
use crate::version::{self, ApiVersion};

pub use config::ClientConfig;
pub use gate::CapabilityGate;
pub use registry::{ClientRegistry, EndpointSpec, SubClient, SubClientEntry, SubClientFactory};

/// Hosted deployments are reachable only through the vendor-operated domain.
static HOSTED_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\.cloud)?\.atlasdata\.com$").expect("hosted host pattern is valid")
});

/// An authenticated session: the token travels in the [`AUTH_HEADER`] of
/// every subsequent request.
#[derive(Clone, PartialEq, Eq)]
pub struct AtlasSession {
    pub token: String,
    pub site_id: Option<String>,
    pub user_id: Option<String>,
}

impl AtlasSession {
    fn from_credentials(credentials: Credentials) -> Result<Self, ClientError> {
        let token = credentials.token.ok_or(ClientError::MissingPayload {
            kind: "Credentials.token",
        })?;
        Ok(Self {
            token,
            site_id: credentials.site.and_then(|site| site.id),
            user_id: credentials.user.and_then(|user| user.id),
        })
    }
}

impl fmt::Debug for AtlasSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasSession")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Endpoint table for the operations the orchestrating client exposes
/// directly (un-namespaced keys in the gate).
pub(crate) fn own_endpoints() -> Vec<EndpointSpec> {
    vec![
        EndpointSpec::new("sign_in"),
        EndpointSpec::new("sign_out"),
        EndpointSpec::new("switch_site").min_version(ApiVersion::new(2, 6)),
        EndpointSpec::new("create_site").on_premise_only(),
    ]
}

/// Shared request/response plumbing beneath the orchestrating client and all
/// sub-clients.
pub struct ClientCore {
    base: Url,
    negotiated: ApiVersion,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ClientCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCore")
            .field("base", &self.base.as_str())
            .field("negotiated", &self.negotiated)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ClientCore {
    pub fn negotiated_version(&self) -> ApiVersion {
        self.negotiated
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the base address matches the vendor-operated hosted domain
    /// pattern (vs. a self-managed deployment).
    pub fn is_hosted(&self) -> bool {
        self.base
            .host_str()
            .map(|host| HOSTED_HOST.is_match(host))
            .unwrap_or(false)
    }

    /// Gate check for one call site. Sub-clients pass their registration
    /// namespace; the orchestrating client's own operations pass `None`.
    /// Fails before any network I/O happens.
    pub fn check_capability(
        &self,
        namespace: Option<&str>,
        method: &str,
    ) -> Result<(), ClientError> {
        gate::shared().check(namespace, method, self.negotiated, self.is_hosted())
    }

    /// Build a full API URL: scheme, host, explicit port, the negotiated
    /// version segment, and the query string. `filter` and `sort` values are
    /// passed through raw (their grammar contains reserved characters);
    /// everything else is percent-encoded.
    pub fn build_uri(&self, relative_path: &str, params: &[(&str, &str)]) -> String {
        let relative = relative_path.trim_start_matches('/');
        let scheme = self.base.scheme();
        let host = self.base.host_str().unwrap_or_default();
        let port = self
            .base
            .port()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });

        let mut uri = format!("{scheme}://{host}:{port}/api/{}/{relative}", self.negotiated);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(key, value)| match *key {
                    "filter" | "sort" => format!("{key}={value}"),
                    _ => format!("{key}={}", urlencoding::encode(value)),
                })
                .collect();
            uri.push('?');
            uri.push_str(&query.join("&"));
        }
        uri
    }

    /// Send one request through the transport and demand `expected_status`.
    ///
    /// Any other status becomes a [`ClientError::RemoteRequest`] carrying the
    /// server's error body when one can be decoded. Network failures wrap
    /// into [`ClientError::Transport`]. Both are logged here, never
    /// swallowed.
    pub fn api_request(
        &self,
        method: Method,
        uri: &str,
        expected_status: u16,
        session: Option<&AtlasSession>,
        body: RequestBody,
    ) -> Result<String, ClientError> {
        log::info!("sending {method} request to '{uri}', expecting status {expected_status}");

        let mut headers = Vec::new();
        if let Some(session) = session {
            headers.push((AUTH_HEADER.to_string(), session.token.clone()));
        }

        let response = self
            .transport
            .send(TransportRequest {
                method,
                url: uri.to_string(),
                headers,
                body,
                timeout: self.timeout,
            })
            .map_err(|err| {
                log::error!("network error while communicating with the server: {err}");
                ClientError::Transport(err)
            })?;

        if response.status != expected_status {
            return Err(self.remote_error(uri, &response));
        }
        log::info!("request successful");
        Ok(response.body)
    }

    fn remote_error(&self, uri: &str, response: &TransportResponse) -> ClientError {
        let details = match codec::extract_one::<ApiErrorDetail>(&response.body) {
            Ok(details) => details,
            Err(err) => {
                log::warn!("failed to read server error details: {err}");
                None
            }
        };
        let err = ClientError::RemoteRequest {
            url: uri.to_string(),
            status: response.status,
            details,
        };
        log::error!("server returned an error: {err}");
        err
    }
}

/// The orchestrating client. Owns the shared core plus one instance of every
/// registered sub-client.
pub struct ApiClient {
    core: Arc<ClientCore>,
    subclients: HashMap<String, Box<dyn SubClient>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("core", &self.core)
            .field("subclients", &self.subclients.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ApiClient {
    /// Construct a client against `transport`.
    ///
    /// Validation failures abort construction immediately; no partial client
    /// is ever returned. Sub-client factories that fail are logged and
    /// skipped. The capability gate's one-time build is triggered here.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        let base_uri = config.base_uri.trim();
        if base_uri.is_empty() {
            return Err(ClientError::Validation(
                "base URI is required (e.g. https://atlas.example.com)".to_string(),
            ));
        }
        let with_scheme = if base_uri.starts_with("http://") || base_uri.starts_with("https://") {
            base_uri.to_string()
        } else {
            format!("https://{base_uri}")
        };
        let base = Url::parse(&with_scheme).map_err(|err| {
            ClientError::Validation(format!("'{base_uri}' is not a valid base URI: {err}"))
        })?;
        if base.host_str().is_none() {
            return Err(ClientError::Validation(format!(
                "'{base_uri}' has no host component"
            )));
        }

        let requested: ApiVersion = config.api_version.parse()?;
        let negotiated = version::negotiate(requested)?;

        if config.timeout.is_zero() {
            return Err(ClientError::Validation(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let core = Arc::new(ClientCore {
            base,
            negotiated,
            timeout: config.timeout,
            transport,
        });

        let mut subclients = HashMap::new();
        for (name, entry) in ClientRegistry::snapshot() {
            match (entry.factory)(Arc::clone(&core)) {
                Ok(instance) => {
                    subclients.insert(name, instance);
                }
                Err(err) => {
                    log::warn!("could not initialize '{name}' sub-client: {err}");
                }
            }
        }

        gate::shared();

        log::debug!(
            "created Atlas API client for '{}', negotiated API version {negotiated}",
            core.base
        );
        Ok(Self { core, subclients })
    }

    /// Construct a client with the stock blocking HTTP transport.
    pub fn with_default_transport(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(config.ignore_ssl_errors));
        Self::new(config, transport)
    }

    /// The shared core handed to sub-client factories.
    pub fn core(&self) -> &Arc<ClientCore> {
        &self.core
    }

    /// Look up a sub-client instance by its registration name.
    pub fn subclient(&self, name: &str) -> Option<&dyn SubClient> {
        self.subclients.get(name).map(|sub| sub.as_ref())
    }

    /// Sign in, returning the session used on every subsequent request.
    pub fn sign_in(
        &self,
        name: &str,
        password: &str,
        site_content_url: Option<&str>,
    ) -> Result<AtlasSession, ClientError> {
        check_required_args(&[("name", name), ("password", password)])?;
        self.core.check_capability(None, "sign_in")?;

        let credentials = Credentials {
            name: Some(name.to_string()),
            password: Some(password.to_string()),
            token: None,
            site: site_content_url.map(|content_url| Site {
                content_url: Some(content_url.to_string()),
                ..Default::default()
            }),
            user: None,
        };
        let body = codec::build_request(credentials.into())?;
        let uri = self.core.build_uri("auth/signin", &[]);
        let response = self
            .core
            .api_request(Method::Post, &uri, 200, None, RequestBody::Xml(body))?;

        let credentials = codec::extract_one::<Credentials>(&response)?.ok_or(
            ClientError::MissingPayload {
                kind: "Credentials",
            },
        )?;
        AtlasSession::from_credentials(credentials)
    }

    /// Invalidate the session on the server.
    pub fn sign_out(&self, session: &AtlasSession) -> Result<(), ClientError> {
        self.core.check_capability(None, "sign_out")?;
        let uri = self.core.build_uri("auth/signout", &[]);
        self.core
            .api_request(Method::Post, &uri, 204, Some(session), RequestBody::Empty)?;
        Ok(())
    }

    /// Exchange the session for one scoped to another site.
    pub fn switch_site(
        &self,
        session: &AtlasSession,
        content_url: &str,
    ) -> Result<AtlasSession, ClientError> {
        self.core.check_capability(None, "switch_site")?;
        let site = Site {
            content_url: Some(content_url.to_string()),
            ..Default::default()
        };
        let body = codec::build_request(site.into())?;
        let uri = self.core.build_uri("auth/switchSite", &[]);
        let response =
            self.core
                .api_request(Method::Post, &uri, 200, Some(session), RequestBody::Xml(body))?;

        let credentials = codec::extract_one::<Credentials>(&response)?.ok_or(
            ClientError::MissingPayload {
                kind: "Credentials",
            },
        )?;
        AtlasSession::from_credentials(credentials)
    }

    /// Create a site. Self-managed deployments only.
    pub fn create_site(&self, session: &AtlasSession, site: Site) -> Result<Site, ClientError> {
        self.core.check_capability(None, "create_site")?;
        let body = codec::build_request(site.into())?;
        let uri = self.core.build_uri("sites", &[]);
        let response =
            self.core
                .api_request(Method::Post, &uri, 201, Some(session), RequestBody::Xml(body))?;
        codec::extract_one::<Site>(&response)?.ok_or(ClientError::MissingPayload { kind: "Site" })
    }
}

/// Reject `None`-like arguments: empty or whitespace-only strings.
pub fn check_required_args(args: &[(&str, &str)]) -> Result<(), ClientError> {
    for (name, value) in args {
        if value.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "argument '{name}' cannot be empty"
            )));
        }
    }
    Ok(())
}

/// Reject empty argument arrays.
pub fn check_non_empty<T>(name: &str, values: &[T]) -> Result<(), ClientError> {
    if values.is_empty() {
        return Err(ClientError::Validation(format!(
            "argument array '{name}' cannot be empty"
        )));
    }
    Ok(())
}

/// Reject out-of-range numeric arguments.
pub fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<(), ClientError> {
    if value < min || value > max {
        return Err(ClientError::Validation(format!(
            "argument '{name}' must be between {min} and {max}"
        )));
    }
    Ok(())
}
