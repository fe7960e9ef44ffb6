#![allow(dead_code)]

use std::collections::HashMap;

use isapi_client::IsapiClient;
use sha2::{Digest, Sha256};
use url::Position;
use wiremock::matchers::any;
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "test-password";
pub const REALM: &str = "IP Camera(C2183)";
pub const NONCE: &str = "4e5749304e6a63304e5445364e6a59784d6a49304d6a593d";

/// Set up a test client with predefined credentials
pub fn setup_test_client(server_url: &str) -> IsapiClient {
    let _ = env_logger::builder().is_test(true).try_init();
    IsapiClient::builder()
        .host(server_url)
        .username(USERNAME)
        .password(PASSWORD)
        .build()
        .expect("Failed to build IsapiClient")
}

/// The `WWW-Authenticate` value a camera sends with its 401.
pub fn digest_challenge() -> String {
    format!(r#"Digest qop="auth", realm="{REALM}", nonce="{NONCE}", stale="FALSE""#)
}

/// Answers every request that no higher priority mock matches with a digest
/// challenge.
pub async fn mount_digest_challenge(server: &MockServer) {
    Mock::given(any())
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", digest_challenge().as_str()),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

/// Answers unmatched requests with a 401 listing `challenges` as separate
/// `WWW-Authenticate` lines, in order.
pub async fn mount_digest_challenges(server: &MockServer, challenges: &[String]) {
    let template = challenges.iter().fold(ResponseTemplate::new(401), |template, challenge| {
        template.append_header("WWW-Authenticate", challenge.as_str())
    });
    Mock::given(any()).respond_with(template).with_priority(10).mount(server).await;
}

/// Matches requests carrying a correct digest response for `USERNAME` and
/// `PASSWORD` against a challenge with `REALM` and `NONCE`, hashed with the
/// algorithm named in the `Authorization` header (MD5 or SHA-256).
pub struct DigestAuth {
    password: String,
}

impl DigestAuth {
    pub fn valid() -> Self {
        Self { password: PASSWORD.to_string() }
    }

    pub fn with_password(password: &str) -> Self {
        Self { password: password.to_string() }
    }
}

impl Match for DigestAuth {
    fn matches(&self, request: &Request) -> bool {
        let Some(header) = request.headers.get("authorization").and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some(params) = header.strip_prefix("Digest ") else {
            return false;
        };
        let params: HashMap<&str, &str> = params
            .split(", ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim_matches('"')))
            .collect();

        let uri = &request.url[Position::BeforePath..];
        if params.get("uri") != Some(&uri) || params.get("username") != Some(&USERNAME) {
            return false;
        }
        let (Some(nc), Some(cnonce), Some(qop), Some(response)) = (
            params.get("nc"),
            params.get("cnonce"),
            params.get("qop"),
            params.get("response"),
        ) else {
            return false;
        };

        let hash: fn(String) -> String = match params.get("algorithm").copied().unwrap_or("MD5") {
            "MD5" => md5_hex,
            "SHA-256" => sha256_hex,
            _ => return false,
        };

        let ha1 = hash(format!("{USERNAME}:{REALM}:{}", self.password));
        let ha2 = hash(format!("{}:{uri}", request.method));
        let expected = hash(format!("{ha1}:{NONCE}:{nc}:{cnonce}:{qop}:{ha2}"));
        *response == expected
    }
}

pub fn md5_hex(data: String) -> String {
    format!("{:x}", md5::compute(data))
}

pub fn sha256_hex(data: String) -> String {
    Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

pub fn status_xml(request_url: &str, code: u32, status: &str, sub_status: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ResponseStatus version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
<requestURL>{request_url}</requestURL>
<statusCode>{code}</statusCode>
<statusString>{status}</statusString>
<subStatusCode>{sub_status}</subStatusCode>
</ResponseStatus>"#
    )
}

/// Success status of a per-attribute endpoint.
pub fn single_ok(request_url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(status_xml(request_url, 1, "OK", "ok"), "application/xml")
}

/// Success status of the bulk image endpoint.
pub fn bulk_ok(request_url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(status_xml(request_url, 0, "OK", "ok"), "application/xml")
}
