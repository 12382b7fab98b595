use super::*;

#[test]
fn test_request_id_increment() {
    let id = AtomicU64::new(1);
    assert_eq!(id.fetch_add(1, Ordering::SeqCst), 1);
    assert_eq!(id.fetch_add(1, Ordering::SeqCst), 2);
    assert_eq!(id.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_connect_unreachable_endpoint() {
    let result = CdpClient::connect("http://127.0.0.1:1", Duration::from_secs(2)).await;
    assert!(matches!(result, Err(CdpError::ChromeNotAvailable(_))));
}

#[tokio::test]
async fn test_connect_malformed_ws_url() {
    let result = CdpClient::connect("ws://", Duration::from_secs(2)).await;
    assert!(matches!(result, Err(CdpError::ConnectionFailed(_))));
}
