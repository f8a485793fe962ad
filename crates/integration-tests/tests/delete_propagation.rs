use std::time::Duration;

use domains::{ChatError, Message};
use integration_tests::{member, moderator, Client, Harness, MINUTE_MS, MODERATOR_UID};
use services::SendRequest;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

async fn post(client: &Client, body: &str) -> Message {
    client.engine.send(SendRequest::text(body)).await.unwrap()
}

#[tokio::test]
async fn authors_delete_their_own_messages_without_broadcasting() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let message = post(&author, "oops").await;

    assert!(author.engine.can_delete(&message.id).await);
    assert_ok!(author.engine.delete(&message.id).await);

    assert!(!harness.log.contains(&message.id));
    assert!(author.engine.messages().await.is_empty());
    assert!(harness.events.events().is_empty());
}

#[tokio::test]
async fn members_cannot_delete_other_members_messages() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let other = harness.client(member("u-2"));
    let message = post(&author, "mine").await;

    other.engine.sync_messages().await;
    assert!(!other.engine.can_delete(&message.id).await);

    let err = assert_err!(other.engine.delete(&message.id).await);
    assert_eq!(
        err,
        ChatError::UnauthorizedDelete("You can only delete your own messages.".to_string())
    );
    assert_eq!(harness.log.messages(), vec![message]);
    assert_eq!(other.engine.messages().await.len(), 1);
}

#[tokio::test]
async fn unknown_message_ids_are_not_found() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));

    let err = assert_err!(author.engine.delete("missing").await);
    assert_eq!(err.to_string(), "Message not found with ID missing");
}

#[tokio::test(start_paused = true)]
async fn moderator_delete_broadcasts_one_effect_before_removal() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let moderation = harness.client(moderator());
    let message = post(&author, "rule-breaking").await;

    let mut observer = author.engine.observe_moderation();
    moderation.engine.sync_messages().await;
    assert!(moderation.engine.is_moderator());
    assert!(moderation.engine.can_delete(&message.id).await);

    let started = Instant::now();
    let engine = moderation.engine.clone();
    let message_id = message.id.clone();
    let deletion = tokio::spawn(async move { engine.delete(&message_id).await });

    let effects = loop {
        let batch = observer.next_effects().await.unwrap();
        if !batch.is_empty() {
            break batch;
        }
    };
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].message_id, message.id);
    assert_eq!(effects[0].target_uid, "u-1");
    assert_eq!(effects[0].actor_uid, MODERATOR_UID);
    assert!(harness.log.contains(&message.id), "effect must precede removal");

    assert_ok!(deletion.await.unwrap());
    assert!(started.elapsed() >= Duration::from_millis(340));
    assert!(!harness.log.contains(&message.id));
    assert_eq!(harness.events.events().len(), 1);

    assert!(observer.drain().is_empty());
    let effect_id = effects[0].id.clone();
    assert!(observer.feed_mut().consume(&effect_id).is_some());
    assert_eq!(observer.feed().active().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn moderator_deleting_own_message_skips_the_effect() {
    let harness = Harness::new();
    let moderation = harness.client(moderator());
    let message = post(&moderation, "announcement").await;

    let started = Instant::now();
    assert_ok!(moderation.engine.delete(&message.id).await);
    assert!(started.elapsed() < Duration::from_millis(340));
    assert!(harness.events.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_broadcast_does_not_block_the_delete() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let moderation = harness.client(moderator());
    let message = post(&author, "spam link").await;
    moderation.engine.sync_messages().await;

    harness.events.set_offline(true);
    assert_ok!(moderation.engine.delete(&message.id).await);
    assert!(!harness.log.contains(&message.id));
}

#[tokio::test]
async fn failed_log_delete_is_a_transport_error() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let message = post(&author, "keep me").await;

    harness.log.set_offline(true);
    let err = assert_err!(author.engine.delete(&message.id).await);
    assert_eq!(err.code(), "transport_error");
    assert_eq!(author.engine.messages().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn historical_events_never_replay_and_ids_are_processed_once() {
    let harness = Harness::new();
    let author = harness.client(member("u-1"));
    let moderation = harness.client(moderator());

    let first = post(&author, "first").await;
    moderation.engine.sync_messages().await;
    assert_ok!(moderation.engine.delete(&first.id).await);

    // A client that subscribes afterwards sees the old event as history.
    harness.advance(MINUTE_MS);
    let latecomer = harness.client(member("u-3"));
    let mut observer = latecomer.engine.observe_moderation();
    assert!(observer.next_effects().await.unwrap().is_empty());

    let second = post(&author, "second").await;
    moderation.engine.sync_messages().await;
    assert_ok!(moderation.engine.delete(&second.id).await);

    let effects = observer.drain();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].message_id, second.id);

    // Snapshots redeliver every event; none of them fire again.
    let third = post(&author, "third").await;
    moderation.engine.sync_messages().await;
    assert_ok!(moderation.engine.delete(&third.id).await);

    let effects = observer.drain();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].message_id, third.id);
    assert_eq!(observer.feed().active().count(), 2);
}
