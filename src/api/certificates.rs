use std::path::PathBuf;
use std::time::Duration;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};

use crate::client::ApiRequest;
use crate::models::security::{pkcs12_upload_body, CertificateInfo};
use crate::models::status::{ResponseStatus, StatusConvention};
use crate::{IsapiClient, IsapiError, IsapiResult};

const SERVER_CERTIFICATES: &str = "/ISAPI/Security/serverCertificate/certificates";
const SERVER_CERTIFICATE_UPLOAD: &str = "/ISAPI/Security/serverCertificate/certificate";

const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const DELETE_TIMEOUT: Duration = Duration::from_secs(10);
const BINARY_UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);
const PKCS12_UPLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Provides methods for managing the device's HTTPS server certificates.
#[derive(Debug, Clone)]
pub struct CertificateHandler {
    client: IsapiClient,
}

impl CertificateHandler {
    pub(crate) fn new(client: IsapiClient) -> Self {
        Self { client }
    }

    /// Lists the installed server certificates.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use isapi_client::IsapiClient;
    /// #
    /// # async fn example(client: &IsapiClient) -> Result<(), isapi_client::IsapiError> {
    /// for cert in client.certificates().list().await? {
    ///     println!("{}: {:?} until {:?}", cert.custom_id, cert.subject_dn, cert.end_date);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list(&self) -> IsapiResult<Vec<CertificateInfo>> {
        let request = ApiRequest::get(SERVER_CERTIFICATES)
            .query("format", "json")
            .timeout(LIST_TIMEOUT);
        let body = self.client.fetch_text(request).await?;
        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            IsapiError::MalformedResponse(format!("certificate list is not JSON: {e}"))
        })?;
        CertificateInfo::list_from_value(&value)
    }

    /// Deletes the certificate uploaded as `custom_id`.
    pub async fn delete(&self, custom_id: &str) -> IsapiResult<ResponseStatus> {
        let endpoint = certificate_endpoint(custom_id)?;
        let request = ApiRequest::new(Method::DELETE, endpoint)
            .query("format", "json")
            .timeout(DELETE_TIMEOUT);
        self.client.write(request, StatusConvention::SingleAttribute).await
    }

    /// Uploads a certificate under `custom_id`.
    ///
    /// By default the content is sent as a raw binary body. Call
    /// [`UploadCertificateBuilder::pkcs12`] to send a `.pfx` bundle preceded
    /// by its XML request header instead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use isapi_client::IsapiClient;
    /// #
    /// # async fn example(client: &IsapiClient) -> Result<(), isapi_client::IsapiError> {
    /// client
    ///     .certificates()
    ///     .upload("lab1")
    ///     .pkcs12("pfx-password")
    ///     .file("server.pfx")
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn upload(&self, custom_id: impl Into<String>) -> UploadCertificateBuilder {
        UploadCertificateBuilder::new(self.client.clone(), custom_id.into())
    }
}

fn certificate_endpoint(custom_id: &str) -> IsapiResult<String> {
    if custom_id.is_empty() || custom_id.contains('/') {
        return Err(IsapiError::InvalidEndpoint(format!(
            "invalid certificate id: {custom_id:?}"
        )));
    }
    Ok(format!("{SERVER_CERTIFICATES}/{custom_id}"))
}

#[derive(Debug, Clone)]
enum CertificateSource {
    Data(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct UploadCertificateBuilder {
    client: IsapiClient,
    custom_id: String,
    pkcs12_password: Option<SecretString>,
    source: Option<CertificateSource>,
}

impl UploadCertificateBuilder {
    pub(crate) fn new(client: IsapiClient, custom_id: String) -> Self {
        Self {
            client,
            custom_id,
            pkcs12_password: None,
            source: None,
        }
    }

    /// Sends the content as a PKCS#12 bundle protected by `password`.
    pub fn pkcs12(mut self, password: impl Into<String>) -> Self {
        self.pkcs12_password = Some(SecretString::from(password.into()));
        self
    }

    /// Uses `data` as the certificate content.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.source = Some(CertificateSource::Data(data.into()));
        self
    }

    /// Reads the certificate content from `path` when sending.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(CertificateSource::File(path.into()));
        self
    }

    pub async fn send(self) -> IsapiResult<ResponseStatus> {
        if self.custom_id.is_empty() {
            return Err(IsapiError::ConfigurationError("Certificate id is required".into()));
        }
        let content = match self.source {
            Some(CertificateSource::Data(data)) => data,
            Some(CertificateSource::File(path)) => tokio::fs::read(&path).await?,
            None => {
                return Err(IsapiError::ConfigurationError(
                    "Certificate content is required".into(),
                ))
            }
        };

        let request = ApiRequest::new(Method::POST, SERVER_CERTIFICATE_UPLOAD)
            .query("customID", self.custom_id.as_str());
        let request = match &self.pkcs12_password {
            Some(password) => request
                .body("application/xml", pkcs12_upload_body(&content, password.expose_secret()))
                .timeout(PKCS12_UPLOAD_TIMEOUT),
            None => request
                .body("application/octet-stream", content)
                .timeout(BINARY_UPLOAD_TIMEOUT),
        };

        let status = self.client.write(request, StatusConvention::SingleAttribute).await?;
        log::info!("certificate {} uploaded", self.custom_id);
        Ok(status)
    }
}
