//! Connection registry contract, exercised through the crate's public API.

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use notification_service::websocket::{ConnectionRegistry, Envelope, EventPayload};

fn envelope() -> Envelope {
    Envelope::new(EventPayload::low_stock_alert("Dipirona", 3), Utc::now())
}

#[tokio::test]
async fn test_connect_then_disconnect_leaves_no_trace() {
    let registry = ConnectionRegistry::new();
    let user_id = Uuid::new_v4();
    let (tx, _rx) = mpsc::unbounded_channel();

    let id = registry.connect(user_id, tx).await;
    assert_eq!(registry.user_connection_count(user_id).await, 1);

    registry.disconnect(id).await;
    assert_eq!(registry.user_connection_count(user_id).await, 0);
    assert_eq!(registry.connected_user_count().await, 0);
    assert_eq!(registry.connection_count().await, 0);
}

#[tokio::test]
async fn test_send_to_user_with_no_links_is_a_noop() {
    let registry = ConnectionRegistry::new();
    let delivered = registry.send_to_user(Uuid::new_v4(), &envelope()).await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_one_dead_link_does_not_block_the_rest() {
    let registry = ConnectionRegistry::new();
    let user_id = Uuid::new_v4();

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, rx2) = mpsc::unbounded_channel();
    let (tx3, mut rx3) = mpsc::unbounded_channel();
    registry.connect(user_id, tx1).await;
    registry.connect(user_id, tx2).await;
    registry.connect(user_id, tx3).await;

    // Kill the middle link.
    drop(rx2);

    let sent = envelope();
    let delivered = registry.send_to_user(user_id, &sent).await;

    assert_eq!(delivered, 2);
    assert_eq!(registry.user_connection_count(user_id).await, 2);
    assert_eq!(rx1.recv().await.unwrap(), sent);
    assert_eq!(rx3.recv().await.unwrap(), sent);
}

#[tokio::test]
async fn test_fan_out_reaches_every_device() {
    let registry = ConnectionRegistry::new();
    let user_id = Uuid::new_v4();
    let mut receivers = vec![];

    for _ in 0..4 {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.connect(user_id, tx).await;
        receivers.push(rx);
    }

    let sent = envelope();
    assert_eq!(registry.send_to_user(user_id, &sent).await, 4);
    for mut rx in receivers {
        assert_eq!(rx.recv().await.unwrap(), sent);
    }
}

#[tokio::test]
async fn test_broadcast_spans_users_and_prunes() {
    let registry = ConnectionRegistry::new();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    registry.connect(Uuid::new_v4(), tx_a).await;

    let dead_user = Uuid::new_v4();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    registry.connect(dead_user, tx_b).await;
    drop(rx_b);

    let sent = envelope();
    assert_eq!(registry.broadcast(&sent).await, 1);
    assert_eq!(rx_a.recv().await.unwrap(), sent);

    // The dead user's empty entry was dropped wholesale.
    assert_eq!(registry.user_connection_count(dead_user).await, 0);
    assert_eq!(registry.connected_user_count().await, 1);
}
