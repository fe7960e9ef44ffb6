use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::document::ISAPI_NAMESPACE;
use crate::xml::XmlDocument;
use crate::{IsapiError, IsapiResult};

/// A server certificate installed on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    /// Identifier chosen at upload time, used to delete the certificate.
    #[serde(rename = "customID", default)]
    pub custom_id: String,

    #[serde(rename = "issuerDN", default)]
    pub issuer_dn: Option<String>,

    #[serde(rename = "subjectDN", default)]
    pub subject_dn: Option<String>,

    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default)]
    pub end_date: Option<String>,

    /// Certificate usage, e.g. `HTTPS`.
    #[serde(rename = "type", default)]
    pub certificate_type: Option<String>,

    /// `normal`, `expired` or `exceptional`.
    #[serde(default)]
    pub status: Option<String>,
}

impl CertificateInfo {
    /// Extracts the certificate entries from a certificate list response.
    ///
    /// Firmware versions differ in how they nest the `CertificateInfo`
    /// entries and whether a single entry is sent as an object or a list.
    pub fn list_from_value(value: &Value) -> IsapiResult<Vec<CertificateInfo>> {
        match find_key(value, "CertificateInfo") {
            Some(Value::Array(items)) => items.iter().map(certificate_from_value).collect(),
            Some(item @ Value::Object(_)) => Ok(vec![certificate_from_value(item)?]),
            Some(other) => Err(IsapiError::MalformedResponse(format!(
                "unexpected CertificateInfo value: {other}"
            ))),
            None => Ok(Vec::new()),
        }
    }
}

fn certificate_from_value(item: &Value) -> IsapiResult<CertificateInfo> {
    serde_json::from_value(item.clone())
        .map_err(|e| IsapiError::MalformedResponse(format!("invalid CertificateInfo entry: {e}")))
}

fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        _ => None,
    }
}

/// A response body that may be JSON or XML depending on the endpoint and
/// firmware.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Xml(XmlDocument),
}

impl Payload {
    /// JSON when the body parses as JSON, XML otherwise.
    pub fn from_body(body: String) -> Self {
        if body.trim_start().starts_with(['{', '[']) {
            if let Ok(value) = serde_json::from_str(&body) {
                return Payload::Json(value);
            }
        }
        Payload::Xml(XmlDocument::new(body))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Xml(_) => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Payload::Json(_) => None,
            Payload::Xml(doc) => Some(doc),
        }
    }
}

/// Builds the `CertificateReq` header that precedes a PKCS#12 file in a
/// combined upload body.
pub(crate) fn pkcs12_upload_body(pfx: &[u8], pfx_password: &str) -> Vec<u8> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(pfx_password.as_bytes());
    let header = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<CertificateReq version="1.0" xmlns="{ns}">"#,
            "<certificateMode>signingRequest</certificateMode>",
            "<privateKeyMode>seperateKey</privateKeyMode>",
            "<seperateKeyPassword></seperateKeyPassword>",
            "<PKCSPassword>{password}</PKCSPassword>",
            "<dataType>certificate</dataType>",
            "</CertificateReq>"
        ),
        ns = ISAPI_NAMESPACE,
        password = encoded,
    );
    let mut body = header.into_bytes();
    body.extend_from_slice(pfx);
    body
}
