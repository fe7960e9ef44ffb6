mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{mount_digest_challenge, setup_test_client, single_ok, DigestAuth};
use tokio::sync::Barrier;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[tokio::test]
async fn test_concurrent_client_usage() -> Result<(), Box<dyn std::error::Error>> {
    // What it tests: Clones of one client issue writes concurrently, and each request runs
    // its own challenge-response exchange.
    //
    // Why it's valuable: The client keeps no per-device session, so concurrent use must not
    // share or reuse nonces between requests.
    let challenge_count = Arc::new(AtomicUsize::new(0));
    let challenge_count_clone = Arc::clone(&challenge_count);

    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/ISAPI/Image/channels/1/gain"))
        .and(DigestAuth::valid())
        .respond_with(single_ok("/ISAPI/Image/channels/1/gain"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/ISAPI/Image/channels/1/EIS"))
        .and(DigestAuth::valid())
        .respond_with(single_ok("/ISAPI/Image/channels/1/EIS"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(wiremock::matchers::any())
        .respond_with(move |_: &Request| {
            challenge_count_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(401)
                .insert_header("WWW-Authenticate", common::digest_challenge().as_str())
        })
        .with_priority(10)
        .mount(&mock_server)
        .await;

    let client = setup_test_client(&mock_server.uri());

    // Create a barrier to ensure both tasks start at the same time
    let barrier = Arc::new(Barrier::new(2));
    let client1 = client.clone();
    let client2 = client.clone();
    let barrier1 = Arc::clone(&barrier);
    let barrier2 = Arc::clone(&barrier);

    let task1 = tokio::spawn(async move {
        barrier1.wait().await;
        client1.image().set_gain(1, 30).await
    });
    let task2 = tokio::spawn(async move {
        barrier2.wait().await;
        client2.image().set_eis(1, true).await
    });

    let gain = task1.await??;
    let eis = task2.await??;

    assert_eq!(gain.request_url.as_deref(), Some("/ISAPI/Image/channels/1/gain"));
    assert_eq!(eis.request_url.as_deref(), Some("/ISAPI/Image/channels/1/EIS"));
    assert_eq!(
        challenge_count.load(Ordering::SeqCst),
        2,
        "each request should be challenged exactly once"
    );

    Ok(())
}

#[tokio::test]
async fn test_independent_cameras() -> Result<(), Box<dyn std::error::Error>> {
    // What it tests: Two clients pointed at two devices run side by side without their
    // requests crossing over.
    let camera_a = MockServer::start().await;
    let camera_b = MockServer::start().await;
    mount_digest_challenge(&camera_a).await;
    mount_digest_challenge(&camera_b).await;

    for camera in [&camera_a, &camera_b] {
        Mock::given(method("PUT"))
            .and(path("/ISAPI/Image/channels/1/shutter"))
            .and(DigestAuth::valid())
            .respond_with(single_ok("/ISAPI/Image/channels/1/shutter"))
            .expect(1)
            .mount(camera)
            .await;
    }

    let client_a = setup_test_client(&camera_a.uri());
    let client_b = setup_test_client(&camera_b.uri());

    let image_a = client_a.image();
    let image_b = client_b.image();
    let (a, b) = tokio::join!(image_a.set_shutter(1, "1/120"), image_b.set_shutter(1, "1/25"));
    a?;
    b?;

    let body_a = String::from_utf8(camera_a.received_requests().await.unwrap()[1].body.clone())?;
    let body_b = String::from_utf8(camera_b.received_requests().await.unwrap()[1].body.clone())?;
    assert!(body_a.contains("<ShutterLevel>1/120</ShutterLevel>"));
    assert!(body_b.contains("<ShutterLevel>1/25</ShutterLevel>"));

    Ok(())
}
