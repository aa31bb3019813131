//! Reconciliation engine behaviour against the in-memory chat backend.

use chrono::Duration;
use mirror_directory::remote::methods;
use mirror_directory::{
    ChannelApi, ChannelDirectory, ChannelEntry, ChannelReconciler, ChatCall, Clock,
    DirectoryError, InMemoryChatApi, ManualClock, ProjectKey,
};
use std::sync::Arc;

struct Harness {
    api: Arc<InMemoryChatApi>,
    clock: Arc<ManualClock>,
    directory: Arc<ChannelDirectory>,
    reconciler: Arc<ChannelReconciler>,
}

fn harness() -> Harness {
    let api = Arc::new(InMemoryChatApi::new());
    let clock = Arc::new(ManualClock::starting_now());
    let directory = Arc::new(ChannelDirectory::new());
    let reconciler = Arc::new(ChannelReconciler::new(
        api.clone(),
        directory.clone(),
        clock.clone(),
        Duration::minutes(15),
    ));
    Harness {
        api,
        clock,
        directory,
        reconciler,
    }
}

async fn cached(h: &Harness, key: &str) -> ChannelEntry {
    h.directory
        .get(&ProjectKey::new(key))
        .await
        .expect("entry should be cached")
}

#[tokio::test]
async fn missing_channel_is_created_then_purpose_set() {
    let h = harness();
    h.api.add_channel("other", false, "Other", &[]).await;

    let entry = h.reconciler.resolve_channel("ABC", "My Project").await.unwrap();

    let calls = h.api.calls().await;
    assert_eq!(calls[0], ChatCall::ListChannels);
    assert_eq!(calls[1], ChatCall::CreateChannel("abc".to_string()));
    assert_eq!(
        calls[2],
        ChatCall::SetChannelPurpose {
            id: entry.remote_id.clone(),
            purpose: "My Project".to_string(),
        }
    );
    assert_eq!(calls.len(), 3);

    let stored = cached(&h, "abc").await;
    assert_eq!(stored.key.as_str(), "abc");
    assert!(!stored.archived);
    assert_eq!(stored.purpose, "My Project");
    assert!(stored.is_member("UBOT"));
}

#[tokio::test]
async fn repeated_resolve_sets_purpose_once() {
    let h = harness();

    h.reconciler.resolve_channel("abc", "My Project").await.unwrap();
    h.reconciler.resolve_channel("abc", "My Project").await.unwrap();

    assert_eq!(h.api.count(methods::SET_PURPOSE).await, 1);
    assert_eq!(h.api.count(methods::LIST_CHANNELS).await, 1);
}

#[tokio::test]
async fn changed_purpose_is_pushed_on_fresh_hit() {
    let h = harness();
    h.reconciler.resolve_channel("abc", "Old Name").await.unwrap();
    h.api.clear_calls().await;

    let entry = h.reconciler.resolve_channel("abc", "New Name").await.unwrap();

    assert_eq!(
        h.api.calls().await,
        vec![ChatCall::SetChannelPurpose {
            id: entry.remote_id,
            purpose: "New Name".to_string(),
        }]
    );
    assert_eq!(cached(&h, "abc").await.purpose, "New Name");
}

#[tokio::test]
async fn fresh_entry_makes_no_remote_call() {
    let h = harness();
    h.api.add_channel("abc", false, "P", &[]).await;
    h.reconciler.resolve_channel("abc", "P").await.unwrap();
    h.api.clear_calls().await;

    h.clock.advance(Duration::minutes(15) - Duration::milliseconds(1));
    h.reconciler.resolve_channel("abc", "P").await.unwrap();

    assert!(h.api.calls().await.is_empty());
}

#[tokio::test]
async fn expired_entry_refreshes_with_one_info_call() {
    let h = harness();
    let id = h.api.add_channel("abc", false, "P", &[]).await;
    h.reconciler.resolve_channel("abc", "P").await.unwrap();
    h.api.clear_calls().await;

    h.clock.advance(Duration::minutes(15));
    let entry = h.reconciler.resolve_channel("abc", "P").await.unwrap();

    assert_eq!(h.api.calls().await, vec![ChatCall::GetChannelInfo(id)]);
    assert_eq!(entry.expires_at, h.clock.now() + Duration::minutes(15));
}

#[tokio::test]
async fn refresh_picks_up_remote_changes() {
    let h = harness();
    let id = h.api.add_channel("abc", false, "P", &[]).await;
    h.reconciler.resolve_channel("abc", "P").await.unwrap();

    // Someone archived the channel behind our back
    h.api.archive_channel(&id).await.unwrap();
    h.api.clear_calls().await;

    h.clock.advance(Duration::minutes(20));
    let entry = h.reconciler.resolve_channel("abc", "P").await.unwrap();

    assert!(!entry.archived);
    assert_eq!(
        h.api.calls().await,
        vec![
            ChatCall::GetChannelInfo(id.clone()),
            ChatCall::UnarchiveChannel(id),
            ChatCall::JoinChannel("abc".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_refresh_does_not_fall_back_to_stale_entry() {
    let h = harness();
    h.api.add_channel("abc", false, "P", &[]).await;
    h.reconciler.resolve_channel("abc", "P").await.unwrap();

    h.clock.advance(Duration::minutes(16));
    h.api.fail(methods::CHANNEL_INFO, "ratelimited").await;

    let result = h.reconciler.resolve_channel("abc", "P").await;
    assert!(matches!(result, Err(DirectoryError::Remote(_))));
}

#[tokio::test]
async fn miss_reloads_directory_exactly_once() {
    let h = harness();
    h.api.add_channel("web", false, "Web", &[]).await;
    h.api.add_channel("api", false, "Api", &[]).await;

    h.reconciler.resolve_channel("web", "Web").await.unwrap();

    assert_eq!(h.api.count(methods::LIST_CHANNELS).await, 1);
    assert_eq!(h.api.count(methods::CREATE_CHANNEL).await, 0);
    // The reload cached every channel
    assert_eq!(h.directory.len().await, 2);

    h.reconciler.resolve_channel("api", "Api").await.unwrap();
    assert_eq!(h.api.count(methods::LIST_CHANNELS).await, 1);
}

#[tokio::test]
async fn archived_entry_is_unarchived_joined_then_purpose_synced() {
    let h = harness();
    let id = h.api.add_channel("abc", true, "old", &[]).await;
    h.reconciler.warm().await.unwrap();
    h.api.clear_calls().await;

    let entry = h.reconciler.resolve_channel("abc", "new").await.unwrap();

    assert_eq!(
        h.api.calls().await,
        vec![
            ChatCall::UnarchiveChannel(id.clone()),
            ChatCall::JoinChannel("abc".to_string()),
            ChatCall::SetChannelPurpose {
                id,
                purpose: "new".to_string(),
            },
        ]
    );
    assert!(!entry.archived);
    assert_eq!(entry.purpose, "new");

    let stored = cached(&h, "abc").await;
    assert!(!stored.archived);
    assert_eq!(stored.purpose, "new");
}

#[tokio::test]
async fn archived_entry_with_matching_purpose_skips_set_purpose() {
    let h = harness();
    h.api.add_channel("abc", true, "same", &[]).await;
    h.reconciler.warm().await.unwrap();
    h.api.clear_calls().await;

    h.reconciler.resolve_channel("abc", "same").await.unwrap();

    assert_eq!(h.api.count(methods::UNARCHIVE_CHANNEL).await, 1);
    assert_eq!(h.api.count(methods::JOIN_CHANNEL).await, 1);
    assert_eq!(h.api.count(methods::SET_PURPOSE).await, 0);
}

#[tokio::test]
async fn purpose_failure_after_create_keeps_blank_entry() {
    let h = harness();
    h.api.fail(methods::SET_PURPOSE, "too_long").await;

    let result = h.reconciler.resolve_channel("abc", "My Project").await;
    assert!(result.is_err());

    let stored = cached(&h, "abc").await;
    assert!(!stored.archived);
    assert_eq!(stored.purpose, "");

    // Next attempt does not re-create, only retries the purpose
    h.api.clear_failure(methods::SET_PURPOSE).await;
    h.api.clear_calls().await;
    h.reconciler.resolve_channel("abc", "My Project").await.unwrap();
    assert_eq!(h.api.count(methods::CREATE_CHANNEL).await, 0);
    assert_eq!(h.api.count(methods::SET_PURPOSE).await, 1);
}

#[tokio::test]
async fn join_failure_aborts_before_purpose() {
    let h = harness();
    h.api.add_channel("abc", true, "old", &[]).await;
    h.reconciler.warm().await.unwrap();
    h.api.fail(methods::JOIN_CHANNEL, "ratelimited").await;

    let result = h.reconciler.resolve_channel("abc", "new").await;
    assert!(result.is_err());
    assert_eq!(h.api.count(methods::SET_PURPOSE).await, 0);

    // Unarchive already succeeded and is reflected in the cache
    let stored = cached(&h, "abc").await;
    assert!(!stored.archived);
    assert_eq!(stored.purpose, "old");
}

#[tokio::test]
async fn create_failure_is_not_retried() {
    let h = harness();
    h.api.fail(methods::CREATE_CHANNEL, "restricted_action").await;

    let err = h
        .reconciler
        .resolve_channel("abc", "P")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("restricted_action"));
    assert_eq!(h.api.count(methods::CREATE_CHANNEL).await, 1);
    assert!(h.directory.get(&ProjectKey::new("abc")).await.is_none());
}

#[tokio::test]
async fn list_failure_surfaces_as_error() {
    let h = harness();
    h.api.fail(methods::LIST_CHANNELS, "invalid_auth").await;

    let result = h.reconciler.resolve_channel("abc", "P").await;
    assert!(matches!(result, Err(DirectoryError::Remote(e)) if e.message == "invalid_auth"));
    assert_eq!(h.api.count(methods::CREATE_CHANNEL).await, 0);
}

#[tokio::test]
async fn archive_then_resolve_reactivates() {
    let h = harness();
    h.reconciler.resolve_channel("abc", "P").await.unwrap();
    h.reconciler.archive_channel("ABC").await.unwrap();
    assert!(cached(&h, "abc").await.archived);

    let entry = h.reconciler.resolve_channel("abc", "P").await.unwrap();
    assert!(!entry.archived);
    assert_eq!(h.api.count(methods::UNARCHIVE_CHANNEL).await, 1);
}

#[tokio::test]
async fn concurrent_resolves_for_same_key_create_once() {
    let h = harness();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let reconciler = h.reconciler.clone();
            tokio::spawn(async move { reconciler.resolve_channel("abc", "P").await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.api.count(methods::CREATE_CHANNEL).await, 1);
    assert_eq!(h.api.count(methods::SET_PURPOSE).await, 1);
}
