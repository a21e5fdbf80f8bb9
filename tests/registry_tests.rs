//! Integration tests for the chat room registry
use std::time::Duration;

use murmur::error::MurmurError;
use murmur::room::{ClientId, ClientRegistry, IntentKind, NewMessage};
use murmur::settings::RegistrySettings;

fn registry() -> ClientRegistry {
    ClientRegistry::new(RegistrySettings::default())
}

fn id(name: &str) -> ClientId {
    ClientId::from(name)
}

#[tokio::test]
async fn test_join_send_and_read_history() {
    let registry = registry();

    let accepted = registry.request_join(id("alice")).await.unwrap();
    assert_eq!(accepted.intent, IntentKind::Join);
    registry.request_join(id("bob")).await.unwrap();
    registry.wait_idle().await;

    registry
        .request_message(NewMessage::new(id("alice"), "hello").unwrap())
        .await
        .unwrap();
    registry
        .request_message(NewMessage::new(id("bob"), "hi alice").unwrap())
        .await
        .unwrap();
    registry.wait_idle().await;

    let history = registry.fetch_history(id("bob")).await.unwrap();
    let texts: Vec<_> = history.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "hi alice"]);
    assert_eq!(history.client_id, id("bob"));
    assert!(history.notice.is_none());
    assert!(history.messages[0].sent_at <= history.messages[1].sent_at);

    registry.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_history_carries_notice() {
    let registry = registry();
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;

    let history = registry.fetch_history(id("alice")).await.unwrap();
    assert!(history.messages.is_empty());
    assert_eq!(history.notice.as_deref(), Some("No new messages"));
}

#[tokio::test]
async fn test_duplicate_join_is_refused_once_applied() {
    let registry = registry();
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;

    let err = registry.request_join(id("alice")).await.unwrap_err();
    assert!(matches!(err, MurmurError::AlreadyMember(ref c) if c == &id("alice")));
    assert_eq!(registry.member_count().await, 1);
}

#[tokio::test]
async fn test_leave_keeps_sent_messages() {
    let registry = registry();
    registry.request_join(id("alice")).await.unwrap();
    registry.request_join(id("bob")).await.unwrap();
    registry.wait_idle().await;
    registry
        .request_message(NewMessage::new(id("alice"), "bye").unwrap())
        .await
        .unwrap();
    registry.wait_idle().await;

    registry.request_leave(id("alice")).await.unwrap();
    registry.wait_idle().await;
    assert!(!registry.is_member(&id("alice")).await);

    let history = registry.fetch_history(id("bob")).await.unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].sender, id("alice"));

    // A former member is treated like a stranger
    assert!(matches!(
        registry.fetch_history(id("alice")).await,
        Err(MurmurError::NotMember(_))
    ));
    assert!(matches!(
        registry
            .request_message(NewMessage::new(id("alice"), "again").unwrap())
            .await,
        Err(MurmurError::NotMember(_))
    ));
    assert!(matches!(
        registry.request_leave(id("alice")).await,
        Err(MurmurError::NotMember(_))
    ));
}

#[tokio::test]
async fn test_rejoin_sees_messages_sent_before_leaving() {
    let registry = registry();
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;
    registry
        .request_message(NewMessage::new(id("alice"), "before leaving").unwrap())
        .await
        .unwrap();
    registry.wait_idle().await;
    registry.request_leave(id("alice")).await.unwrap();
    registry.wait_idle().await;

    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;
    let history = registry.fetch_history(id("alice")).await.unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].sender, id("alice"));
    assert_eq!(history.messages[0].text, "before leaving");
}

#[tokio::test]
async fn test_rejoin_after_leave() {
    let registry = registry();
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;
    registry.request_leave(id("alice")).await.unwrap();
    registry.wait_idle().await;
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;
    assert!(registry.is_member(&id("alice")).await);
}

#[tokio::test]
async fn test_shutdown_drains_then_refuses() {
    let registry = ClientRegistry::new(RegistrySettings {
        intent_queue_capacity: 4,
        history_timeout: Duration::from_secs(1),
    });
    registry.request_join(id("alice")).await.unwrap();
    registry.wait_idle().await;
    for n in 0..3 {
        registry
            .request_message(NewMessage::new(id("alice"), format!("m{}", n)).unwrap())
            .await
            .unwrap();
    }

    registry.shutdown().await.unwrap();
    assert_eq!(registry.message_count().await, 3);
    assert_eq!(registry.outstanding(), 0);
    assert!(registry.is_shutting_down());

    assert!(matches!(
        registry.request_join(id("bob")).await,
        Err(MurmurError::ShuttingDown)
    ));
    assert!(matches!(
        registry.fetch_history(id("alice")).await,
        Err(MurmurError::ShuttingDown)
    ));
    // Second shutdown is a no-op
    registry.shutdown().await.unwrap();
}
