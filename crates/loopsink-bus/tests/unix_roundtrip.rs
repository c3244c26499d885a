//! Integration test: Unix socket bus roundtrip in a temp directory.

use std::time::Duration;

use loopsink_bus::{unix, BusClient, BusError, BusEvent, BusTransport, UnixBus};
use loopsink_types::{CallError, Response};
use tokio::sync::mpsc;

const TEST_NAME: &str = "org.loopsink.test";

/// Own the name in `dir`, export, and answer calls with scripted replies.
async fn serve(dir: &std::path::Path) -> UnixBus {
    let (tx, mut rx) = mpsc::channel(16);
    let mut bus = UnixBus::new(TEST_NAME, dir);
    bus.own_name(tx).await.unwrap();

    match rx.recv().await {
        Some(BusEvent::NameAcquired) => {}
        _ => panic!("expected NameAcquired"),
    }
    bus.export().await.unwrap();

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let BusEvent::Call { method, reply } = event {
                let response = if method == "LoadModule" {
                    Response::Return { success: true }
                } else {
                    Response::Error(CallError {
                        domain: TEST_NAME.to_string(),
                        code: 2,
                        message: format!("unknown method {method}"),
                    })
                };
                let _ = reply.send(response);
            }
        }
    });

    bus
}

#[tokio::test]
async fn call_and_property_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut bus = serve(dir.path()).await;
    bus.set_module_in_kernel(true);

    let path = unix::socket_path(dir.path(), TEST_NAME);
    let mut client = BusClient::connect(&path).await.unwrap();

    assert!(client.load_module().await.unwrap());
    assert!(client.module_in_kernel().await.unwrap());

    bus.set_module_in_kernel(false);
    assert!(!client.module_in_kernel().await.unwrap());
}

#[tokio::test]
async fn error_replies_carry_the_domain() {
    let dir = tempfile::tempdir().unwrap();
    let _bus = serve(dir.path()).await;

    let path = unix::socket_path(dir.path(), TEST_NAME);
    let mut client = BusClient::connect(&path).await.unwrap();

    let err = client.call("Frobnicate").await.unwrap_err();
    match err {
        BusError::Call(call) => {
            assert_eq!(call.domain, TEST_NAME);
            assert_eq!(call.code, 2);
        }
        other => panic!("expected call error, got {other}"),
    }
}

#[tokio::test]
async fn second_owner_loses_the_name() {
    let dir = tempfile::tempdir().unwrap();
    let _bus = serve(dir.path()).await;

    let (tx, mut rx) = mpsc::channel(16);
    let mut competitor = UnixBus::new(TEST_NAME, dir.path());
    competitor.own_name(tx).await.unwrap();

    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(BusEvent::NameLost)) => {}
        other => panic!("expected NameLost, got {:?}", other.map(|e| e.is_some())),
    }
}

#[tokio::test]
async fn stale_socket_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let path = unix::socket_path(dir.path(), TEST_NAME);

    // A previous owner died without cleanup: the file exists but nobody
    // accepts on it.
    let stale = std::os::unix::net::UnixListener::bind(&path).unwrap();
    drop(stale);
    assert!(path.exists());

    let (tx, mut rx) = mpsc::channel(16);
    let mut bus = UnixBus::new(TEST_NAME, dir.path());
    bus.own_name(tx).await.unwrap();
    match rx.recv().await {
        Some(BusEvent::NameAcquired) => {}
        _ => panic!("expected NameAcquired after reclaiming stale socket"),
    }
}

#[tokio::test]
async fn release_removes_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let mut bus = serve(dir.path()).await;
    let path = unix::socket_path(dir.path(), TEST_NAME);
    assert!(path.exists());

    bus.unexport().await;
    bus.release_name().await;
    assert!(!path.exists());

    // Teardown is idempotent.
    bus.unexport().await;
    bus.release_name().await;
    assert!(!path.exists());
}
