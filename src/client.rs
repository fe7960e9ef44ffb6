use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Certificate, Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::{Position, Url};

use crate::api::certificates::CertificateHandler;
use crate::api::image::ImageHandler;
use crate::api::security::SecurityHandler;
use crate::api::streaming::StreamingHandler;
use crate::api::system::SystemHandler;
use crate::digest::{self, DigestChallenge};
use crate::models::connection::ConnectionStatus;
use crate::models::security::Payload;
use crate::models::status::{ResponseStatus, StatusConvention};
use crate::xml::XmlDocument;
use crate::{IsapiError, IsapiResult};

/// Timeout used by endpoints that do not set their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const USER_PERMISSION_ENDPOINT: &str = "/ISAPI/Security/UserPermission/1";

/// Scheme used to reach the device when the address has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// How HTTPS server certificates are verified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsVerification {
    /// Verify against the system trust store.
    #[default]
    System,
    /// Verify against the system trust store plus the PEM CA certificate at
    /// this path.
    CaFile(PathBuf),
    /// Accept any certificate. Only for lab and bench use.
    Insecure,
}

/// Builder for ISAPI clients.
///
/// This builder provides a fluent API for creating clients with validation
/// at build time. No request is made while building.
#[derive(Debug, Default)]
pub struct IsapiClientBuilder {
    host: Option<String>,
    scheme: Scheme,
    username: Option<String>,
    password: Option<SecretString>,
    tls: TlsVerification,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    http_client: Option<ReqwestClient>,
}

impl IsapiClientBuilder {
    /// Sets the device address: a host, `host:port`, or a full base URL
    /// such as `https://192.168.1.64`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the scheme used when the address has none. Defaults to HTTP.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Shorthand for `scheme(Scheme::Https)`.
    pub fn https(self) -> Self {
        self.scheme(Scheme::Https)
    }

    /// Sets the username for digest authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for digest authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the password from an environment variable.
    pub fn password_from_env(mut self, var_name: &str) -> IsapiResult<Self> {
        let password = std::env::var(var_name).map_err(|e| {
            IsapiError::ConfigurationError(format!(
                "Failed to read environment variable '{var_name}': {e}"
            ))
        })?;
        self.password = Some(SecretString::from(password));
        Ok(self)
    }

    /// Trusts the PEM CA certificate at `path` in addition to the system
    /// roots.
    pub fn ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls = TlsVerification::CaFile(path.into());
        self
    }

    /// Disables server certificate verification.
    pub fn insecure(mut self) -> Self {
        self.tls = TlsVerification::Insecure;
        self
    }

    /// Sets the certificate verification mode.
    pub fn tls_verification(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the timeout used by endpoints that do not define their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a custom user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets a custom reqwest client (e.g., for testing or custom middleware).
    ///
    /// The TLS and user agent settings of this builder are ignored when a
    /// custom client is supplied.
    pub fn http_client(mut self, http_client: ReqwestClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> IsapiResult<IsapiClient> {
        let host = self
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IsapiError::ConfigurationError("Device address is required".into()))?;

        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| IsapiError::ConfigurationError("Username is required".into()))?;

        let password = self
            .password
            .filter(|p| !p.expose_secret().trim().is_empty())
            .ok_or_else(|| IsapiError::ConfigurationError("Password is required".into()))?;

        let base_url = parse_base_url(&host, self.scheme)?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let user_agent = self
            .user_agent
            .as_deref()
            .unwrap_or(concat!("isapi-client/", env!("CARGO_PKG_VERSION")));

        let http_client = if let Some(custom_client) = self.http_client {
            custom_client
        } else {
            let mut builder = ReqwestClient::builder().timeout(timeout).user_agent(user_agent);
            match &self.tls {
                TlsVerification::System => {}
                TlsVerification::CaFile(path) => {
                    let pem = std::fs::read(path).map_err(|e| {
                        IsapiError::ConfigurationError(format!(
                            "Failed to read CA certificate {}: {e}",
                            path.display()
                        ))
                    })?;
                    let certificate = Certificate::from_pem(&pem).map_err(|e| {
                        IsapiError::ConfigurationError(format!("Invalid CA certificate: {e}"))
                    })?;
                    builder = builder.add_root_certificate(certificate);
                }
                TlsVerification::Insecure => {
                    log::warn!("TLS certificate verification disabled for {base_url}");
                    builder = builder.danger_accept_invalid_certs(true);
                }
            }
            builder.build().map_err(|e| {
                IsapiError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?
        };

        Ok(IsapiClient {
            base_url,
            username,
            password: Arc::new(password),
            tls: self.tls,
            timeout,
            http_client,
        })
    }
}

fn parse_base_url(host: &str, scheme: Scheme) -> IsapiResult<Url> {
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("{}://{}", scheme.as_str(), host)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| IsapiError::ConfigurationError(format!("Invalid device address: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(IsapiError::ConfigurationError(format!(
            "Invalid device address: {candidate}"
        )));
    }
    Ok(url)
}

/// A single request against the device, before authentication.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<(&'static str, Vec<u8>)>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn put_xml(endpoint: impl Into<String>, xml: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint).body("application/xml", xml.into().into_bytes())
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, content_type: &'static str, bytes: Vec<u8>) -> Self {
        self.body = Some((content_type, bytes));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The main ISAPI client for one camera.
///
/// The client holds the device address, credentials and HTTP client. It
/// keeps no device state between calls: every request performs its own
/// digest exchange. Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct IsapiClient {
    base_url: Url,
    username: String,
    password: Arc<SecretString>,
    tls: TlsVerification,
    timeout: Duration,
    http_client: ReqwestClient,
}

impl fmt::Debug for IsapiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsapiClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl IsapiClient {
    pub fn builder() -> IsapiClientBuilder {
        IsapiClientBuilder::default()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks reachability and credentials by reading the user permission
    /// resource.
    ///
    /// Transport failures are reported as [`ConnectionStatus::TimedOut`] or
    /// [`ConnectionStatus::ConnectionFailed`], never as invalid credentials.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that happen on the client side or
    /// for an unusable digest challenge.
    pub async fn check_connection(&self) -> IsapiResult<ConnectionStatus> {
        let request = ApiRequest::get(USER_PERMISSION_ENDPOINT).timeout(DEFAULT_TIMEOUT);
        let status = match self.send(&request).await {
            Ok(response) => match response.status() {
                StatusCode::OK => ConnectionStatus::Authenticated,
                StatusCode::UNAUTHORIZED => ConnectionStatus::InvalidCredentials,
                other => ConnectionStatus::UnexpectedStatus(other),
            },
            Err(IsapiError::Http(e)) if e.is_timeout() => ConnectionStatus::TimedOut,
            Err(IsapiError::Http(e)) => ConnectionStatus::ConnectionFailed(e.to_string()),
            Err(e) => return Err(e),
        };

        match &status {
            ConnectionStatus::Authenticated => log::info!("connection to {} validated", self.base_url),
            other => log::warn!("connection to {} failed: {other:?}", self.base_url),
        }
        Ok(status)
    }

    /// Reads any XML resource.
    ///
    /// # Warning
    ///
    /// This is an advanced API that bypasses the typed handlers. Use
    /// `image()`, `system()` and friends when possible.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use isapi_client::{IsapiClient, IsapiError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), IsapiError> {
    /// let client = IsapiClient::builder()
    ///     .host("192.168.1.64")
    ///     .username("admin")
    ///     .password("password")
    ///     .build()?;
    ///
    /// let info = client.get_xml("/ISAPI/System/deviceInfo").await?;
    /// info.save_pretty("device_info.xml").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_xml(&self, endpoint: &str) -> IsapiResult<XmlDocument> {
        self.fetch_xml(ApiRequest::get(endpoint)).await
    }

    /// Writes any XML resource and checks the embedded status against
    /// `convention`.
    pub async fn put_xml(
        &self,
        endpoint: &str,
        xml: impl Into<String>,
        convention: StatusConvention,
    ) -> IsapiResult<ResponseStatus> {
        self.write(ApiRequest::put_xml(endpoint, xml), convention).await
    }

    /// Gets the image settings API interface.
    pub fn image(&self) -> ImageHandler {
        ImageHandler::new(self.clone())
    }

    /// Gets the system status API interface.
    pub fn system(&self) -> SystemHandler {
        SystemHandler::new(self.clone())
    }

    /// Gets the security capabilities API interface.
    pub fn security(&self) -> SecurityHandler {
        SecurityHandler::new(self.clone())
    }

    /// Gets the server certificate API interface.
    pub fn certificates(&self) -> CertificateHandler {
        CertificateHandler::new(self.clone())
    }

    /// Gets the snapshot API interface.
    pub fn streaming(&self) -> StreamingHandler {
        StreamingHandler::new(self.clone())
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> IsapiResult<Url> {
        if !endpoint.starts_with('/') {
            return Err(IsapiError::InvalidEndpoint(format!(
                "endpoint must start with '/': {endpoint}"
            )));
        }
        if endpoint.contains('?') || endpoint.contains('#') {
            return Err(IsapiError::InvalidEndpoint(format!(
                "endpoint must not include query or fragment: {endpoint}"
            )));
        }

        let mut url = self.base_url.join(endpoint)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn prepare(&self, request: &ApiRequest, url: &Url, authorization: Option<String>) -> RequestBuilder {
        let mut builder = self
            .http_client
            .request(request.method.clone(), url.clone())
            .timeout(request.timeout.unwrap_or(self.timeout));

        if let Some((content_type, bytes)) = &request.body {
            builder = builder.header(CONTENT_TYPE, *content_type).body(bytes.clone());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        builder
    }

    /// Sends `request`, answering a digest challenge once.
    pub(crate) async fn send(&self, request: &ApiRequest) -> IsapiResult<Response> {
        let url = self.endpoint_url(&request.endpoint, &request.query)?;
        log::debug!("{} {}", request.method, url);

        let response = self.prepare(request, &url, None).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            log::debug!("{} {} -> {}", request.method, url, response.status());
            return Ok(response);
        }

        let Some(challenge) = DigestChallenge::from_headers(response.headers())? else {
            log::debug!("{} {} -> 401 without digest challenge", request.method, url);
            return Ok(response);
        };

        let body = request.body.as_ref().map(|(_, b)| b.as_slice()).unwrap_or_default();
        let authorization = challenge.authorization(
            &self.username,
            self.password.expose_secret(),
            &request.method,
            &url[Position::BeforePath..],
            body,
            &digest::new_cnonce(),
            1,
        );

        let response = self.prepare(request, &url, Some(authorization)).send().await?;
        log::debug!("{} {} -> {}", request.method, url, response.status());
        Ok(response)
    }

    /// Sends `request` and returns the response of a 2xx answer.
    async fn fetch(&self, request: ApiRequest) -> IsapiResult<Response> {
        let response = self.send(&request).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IsapiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await?;
            log::warn!("{} {} failed with {status}: {body}", request.method, request.endpoint);
            return Err(IsapiError::HttpStatus { status, body });
        }
        Ok(response)
    }

    pub(crate) async fn fetch_text(&self, request: ApiRequest) -> IsapiResult<String> {
        Ok(self.fetch(request).await?.text().await?)
    }

    pub(crate) async fn fetch_bytes(&self, request: ApiRequest) -> IsapiResult<Vec<u8>> {
        Ok(self.fetch(request).await?.bytes().await?.to_vec())
    }

    pub(crate) async fn fetch_xml(&self, request: ApiRequest) -> IsapiResult<XmlDocument> {
        self.fetch_text(request).await.map(XmlDocument::new)
    }

    pub(crate) async fn fetch_payload(&self, request: ApiRequest) -> IsapiResult<Payload> {
        self.fetch_text(request).await.map(Payload::from_body)
    }

    /// Sends a write and checks the status embedded in the response body.
    pub(crate) async fn write(
        &self,
        request: ApiRequest,
        convention: StatusConvention,
    ) -> IsapiResult<ResponseStatus> {
        let endpoint = request.endpoint.clone();
        let body = self.fetch_text(request).await?;
        let status = ResponseStatus::parse(&body)?;

        if convention.is_success(&status) {
            log::debug!("{endpoint} accepted: {} {}", status.status_code, status.status_string);
            Ok(status)
        } else {
            log::warn!(
                "{endpoint} rejected: {} {} (expected {})",
                status.status_code,
                status.status_string,
                convention.expected_code()
            );
            Err(IsapiError::DeviceStatus { status, body })
        }
    }
}
