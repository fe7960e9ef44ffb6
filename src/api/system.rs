use crate::client::ApiRequest;
use crate::xml::XmlDocument;
use crate::{IsapiClient, IsapiResult};

/// Provides read access to device status and capability documents.
#[derive(Debug, Clone)]
pub struct SystemHandler {
    client: IsapiClient,
}

impl SystemHandler {
    pub(crate) fn new(client: IsapiClient) -> Self {
        Self { client }
    }

    /// Reads the live device status: current time, uptime, CPU and memory
    /// usage.
    pub async fn status(&self) -> IsapiResult<XmlDocument> {
        self.client.fetch_xml(ApiRequest::get("/ISAPI/System/status")).await
    }

    /// Reads the device capability flags (`isSupport...` elements).
    pub async fn capabilities(&self) -> IsapiResult<XmlDocument> {
        self.client.fetch_xml(ApiRequest::get("/ISAPI/System/capabilities")).await
    }
}
