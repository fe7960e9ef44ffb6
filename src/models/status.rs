use serde::{Deserialize, Serialize};

use crate::{IsapiError, IsapiResult};

/// Status document embedded in the body of write responses.
///
/// Devices return it as XML (`<ResponseStatus>`) or, for endpoints called
/// with `format=json`, as a JSON object with the same field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ResponseStatus", rename_all = "camelCase")]
pub struct ResponseStatus {
    /// The request path the device is answering.
    #[serde(rename = "requestURL", default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,

    /// Numeric status. Its meaning depends on the endpoint's convention.
    pub status_code: u32,

    /// Human readable status, `OK` on success.
    pub status_string: String,

    /// Finer grained status, e.g. `ok` or `badParameters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl ResponseStatus {
    /// Parses a status document from either its XML or its JSON form.
    pub fn parse(body: &str) -> IsapiResult<Self> {
        let trimmed = body.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Err(IsapiError::MalformedResponse("empty response body".into()));
        }

        if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| IsapiError::MalformedResponse(format!("invalid status JSON: {e}")))?;
            // Some firmware wraps the object in a `ResponseStatus` key.
            let inner = value.get("ResponseStatus").cloned().unwrap_or(value);
            return serde_json::from_value(inner)
                .map_err(|e| IsapiError::MalformedResponse(format!("invalid status JSON: {e}")));
        }

        quick_xml::de::from_str(trimmed)
            .map_err(|e| IsapiError::MalformedResponse(format!("invalid status XML: {e}")))
    }
}

/// How an endpoint signals a successful write in its [`ResponseStatus`].
///
/// The bulk image endpoint answers `0`/`OK` while per-attribute endpoints
/// answer `1`/`OK`. The convention belongs to the endpoint, never to the
/// client as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusConvention {
    /// `statusCode` 0 with `statusString` OK.
    Bulk,
    /// `statusCode` 1 with `statusString` OK.
    SingleAttribute,
}

impl StatusConvention {
    pub fn expected_code(&self) -> u32 {
        match self {
            StatusConvention::Bulk => 0,
            StatusConvention::SingleAttribute => 1,
        }
    }

    /// Returns true if `status` is this convention's success pair.
    pub fn is_success(&self, status: &ResponseStatus) -> bool {
        status.status_code == self.expected_code() && status.status_string == "OK"
    }
}
