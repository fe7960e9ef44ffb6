mod common;

use common::{mount_digest_challenge, setup_test_client, DigestAuth};
use isapi_client::{FailureClass, IsapiError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_bytes, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CERTIFICATES: &str = "/ISAPI/Security/serverCertificate/certificates";
const UPLOAD: &str = "/ISAPI/Security/serverCertificate/certificate";

fn json_status(request_url: &str, code: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "requestURL": request_url,
        "statusCode": code,
        "statusString": "OK",
        "subStatusCode": "ok"
    }))
}

#[tokio::test]
async fn test_list_certificates() {
    // What it tests: The certificate list is requested as JSON and the nested entries are
    // decoded into typed records.
    let mock_server = MockServer::start().await;
    mount_digest_challenge(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(CERTIFICATES))
        .and(query_param("format", "json"))
        .and(DigestAuth::valid())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CertificateInfoList": {
                "CertificateInfo": [
                    {
                        "customID": "lab1",
                        "issuerDN": "Lab CA",
                        "subjectDN": "camera.lab",
                        "startDate": "2024-11-01 08:00:00",
                        "endDate": "2025-11-05 07:59:59",
                        "type": "HTTPS",
                        "status": "normal"
                    },
                    {
                        "customID": "old",
                        "status": "expired"
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    let certificates = client.certificates().list().await.unwrap();

    assert_eq!(certificates.len(), 2);
    assert_eq!(certificates[0].custom_id, "lab1");
    assert_eq!(certificates[0].subject_dn.as_deref(), Some("camera.lab"));
    assert_eq!(certificates[0].certificate_type.as_deref(), Some("HTTPS"));
    assert_eq!(certificates[1].status.as_deref(), Some("expired"));
    assert_eq!(certificates[1].end_date, None);
}

#[tokio::test]
async fn test_list_certificates_rejects_non_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CERTIFICATES))
        .respond_with(ResponseTemplate::new(200).set_body_string("<CertificateInfoList/>"))
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    let err = client.certificates().list().await.unwrap_err();
    assert!(matches!(err, IsapiError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_list_certificates_rejects_mistyped_entry() {
    // What it tests: A certificate entry with a wrongly typed field is a malformed device
    // response, classified as a protocol failure.
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CERTIFICATES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CertificateInfoList": { "CertificateInfo": [{ "customID": 7 }] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    let err = client.certificates().list().await.unwrap_err();
    assert!(matches!(err, IsapiError::MalformedResponse(_)), "got {err:?}");
    assert_eq!(err.class(), FailureClass::Protocol);
}

#[tokio::test]
async fn test_delete_certificate() {
    // What it tests: Deletion targets the certificate's own path and is confirmed by the
    // JSON status document.
    let mock_server = MockServer::start().await;
    mount_digest_challenge(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{CERTIFICATES}/lab1")))
        .and(query_param("format", "json"))
        .and(DigestAuth::valid())
        .respond_with(json_status(&format!("{CERTIFICATES}/lab1"), 1))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    let status = client.certificates().delete("lab1").await.unwrap();
    assert_eq!(status.status_code, 1);
}

#[tokio::test]
async fn test_delete_rejects_path_in_id() {
    let mock_server = MockServer::start().await;
    let client = setup_test_client(&mock_server.uri());

    let err = client.certificates().delete("../lab1").await.unwrap_err();
    assert!(matches!(err, IsapiError::InvalidEndpoint(_)), "got {err:?}");
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_reports_device_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{CERTIFICATES}/lab1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 6,
            "statusString": "Invalid Content",
            "subStatusCode": "certificateNotExist"
        })))
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    let err = client.certificates().delete("lab1").await.unwrap_err();
    let status = err.device_status().unwrap();
    assert_eq!(status.sub_status_code.as_deref(), Some("certificateNotExist"));
}

#[tokio::test]
async fn test_upload_binary_certificate() {
    // What it tests: A plain certificate is posted as an octet stream under its custom id,
    // and the digest exchange covers the POST.
    let mock_server = MockServer::start().await;
    mount_digest_challenge(&mock_server).await;
    let pem = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".to_vec();

    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .and(query_param("customID", "lab1"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(pem.clone()))
        .and(DigestAuth::valid())
        .respond_with(json_status(UPLOAD, 1))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    client.certificates().upload("lab1").data(pem).send().await.unwrap();
}

#[tokio::test]
async fn test_upload_pkcs12_from_file() {
    // What it tests: A PKCS#12 bundle is read from disk and posted after an XML request
    // header that carries the base64 encoded bundle password.
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let pfx_path = dir.path().join("server.pfx");
    let pfx = vec![0x30, 0x82, 0x0a, 0x1f, 0x02, 0x01, 0x03];
    std::fs::write(&pfx_path, &pfx).unwrap();

    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .and(query_param("customID", "lab2"))
        .and(header("content-type", "application/xml"))
        .and(body_string_contains("<PKCSPassword>cGZ4LXBhc3M=</PKCSPassword>"))
        .respond_with(json_status(UPLOAD, 1))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());
    client
        .certificates()
        .upload("lab2")
        .pkcs12("pfx-pass")
        .file(&pfx_path)
        .send()
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body = &requests[0].body;
    assert!(body.starts_with(b"<?xml"));
    assert!(body.ends_with(&pfx));
}

#[tokio::test]
async fn test_upload_without_content() {
    let mock_server = MockServer::start().await;
    let client = setup_test_client(&mock_server.uri());

    let err = client.certificates().upload("lab1").send().await.unwrap_err();
    match err {
        IsapiError::ConfigurationError(msg) => assert_eq!(msg, "Certificate content is required"),
        other => panic!("Expected ConfigurationError, got {other:?}"),
    }

    let err = client
        .certificates()
        .upload("lab1")
        .file("/nonexistent/server.pfx")
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, IsapiError::Io(_)), "got {err:?}");
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
