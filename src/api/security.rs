use std::time::Duration;

use crate::client::{ApiRequest, DEFAULT_TIMEOUT, USER_PERMISSION_ENDPOINT};
use crate::models::security::Payload;
use crate::xml::XmlDocument;
use crate::{IsapiClient, IsapiResult};

const REVOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Provides read access to the security capability resources.
///
/// Capability endpoints that accept `format=json` are requested in JSON; the
/// result is still a [`Payload`] because some firmware ignores the flag and
/// answers in XML.
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    client: IsapiClient,
}

impl SecurityHandler {
    pub(crate) fn new(client: IsapiClient) -> Self {
        Self { client }
    }

    /// Reads the permissions of the authenticated user.
    pub async fn user_permission(&self) -> IsapiResult<XmlDocument> {
        self.client
            .fetch_xml(ApiRequest::get(USER_PERMISSION_ENDPOINT).timeout(DEFAULT_TIMEOUT))
            .await
    }

    /// Reads `/ISAPI/Security/capabilities`.
    pub async fn capabilities(&self) -> IsapiResult<Payload> {
        self.client
            .fetch_payload(ApiRequest::get("/ISAPI/Security/capabilities").timeout(DEFAULT_TIMEOUT))
            .await
    }

    /// Reads which certificate selection options the device offers.
    pub async fn certificate_select_capabilities(&self) -> IsapiResult<Payload> {
        self.json_payload("/ISAPI/Security/certificate/select/capabilities", DEFAULT_TIMEOUT)
            .await
    }

    /// Reads the permitted values of the device certificate fields, e.g. the
    /// `customID` range and the certificate status options.
    pub async fn device_certificate_capabilities(&self) -> IsapiResult<Payload> {
        self.json_payload("/ISAPI/Security/deviceCertificate/capabilities", DEFAULT_TIMEOUT)
            .await
    }

    /// Reads the certificate revocation (expiry warning) configuration.
    pub async fn certificate_revocation(&self) -> IsapiResult<Payload> {
        self.json_payload(
            "/ISAPI/Security/deviceCertificate/certificateRevocation",
            REVOCATION_TIMEOUT,
        )
        .await
    }

    async fn json_payload(&self, endpoint: &str, timeout: Duration) -> IsapiResult<Payload> {
        let request = ApiRequest::get(endpoint).query("format", "json").timeout(timeout);
        self.client.fetch_payload(request).await
    }
}
