mod common;

use common::{b64, engine, new_bookmark, new_tag, signed_up_with_vault};
use markvault::api::security;
use markvault::api_service::models::{
    BookmarkUpdate, ItemDelete, ListOptions, NewTag, TagListOptions,
};

#[tokio::test]
async fn test_bookmark_lifecycle() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    // 1. Create at version 1
    let created = engine
        .api
        .bookmarks
        .create(&user_id, new_bookmark("bm_a"))
        .await
        .unwrap();
    assert_eq!(created.version, 1);
    assert!(created.deleted_at.is_none());

    // The etag follows the formula over all four blobs
    let expected = security::compute_etag(
        &created.vault_id,
        1,
        &[
            &created.nonce_content,
            &created.ciphertext_content,
            &created.nonce_wrap,
            &created.dek_wrapped,
        ],
    );
    assert_eq!(created.etag, expected);

    // 2. Read back, tombstone marker included
    let fetched = engine.api.bookmarks.get(&user_id, "bm_a").await.unwrap();
    assert_eq!(fetched.etag, created.etag);
    assert!(fetched.deleted_at.is_none());

    // 3. Soft delete with the current tag
    let deleted = engine
        .api
        .bookmarks
        .soft_delete(
            &user_id,
            "bm_a",
            ItemDelete {
                version: 2,
                deleted_at: 777,
            },
            Some(&created.etag),
        )
        .await
        .unwrap();
    assert_eq!(deleted.version, 2);
    assert_eq!(deleted.deleted_at, Some(777));
    assert_eq!(deleted.updated_at, 777);
    // The tombstone has a fresh etag over the unchanged blobs
    assert_ne!(deleted.etag, created.etag);

    // 4. A second delete is not found, not idempotent success
    let err = engine
        .api
        .bookmarks
        .soft_delete(
            &user_id,
            "bm_a",
            ItemDelete {
                version: 3,
                deleted_at: 778,
            },
            Some(&deleted.etag),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    // 5. Reads still see the tombstone
    let fetched = engine.api.bookmarks.get(&user_id, "bm_a").await.unwrap();
    assert_eq!(fetched.deleted_at, Some(777));
}

#[tokio::test]
async fn test_bookmark_update_guards() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    let created = engine
        .api
        .bookmarks
        .create(&user_id, new_bookmark("bm_a"))
        .await
        .unwrap();

    let update = |version: i64| BookmarkUpdate {
        version,
        nonce_content: b64(&[9u8; 24]),
        ciphertext_content: b64(b"updated ciphertext"),
        nonce_wrap: b64(&[8u8; 24]),
        dek_wrapped: b64(&[7u8; 48]),
        size: 24 + 18 + 24 + 48,
        updated_at: 2,
    };

    // Missing If-Match
    let err = engine
        .api
        .bookmarks
        .update(&user_id, "bm_a", update(2), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Wrong version
    let err = engine
        .api
        .bookmarks
        .update(&user_id, "bm_a", update(5), Some(&created.etag))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Stale etag mutates nothing
    let err = engine
        .api
        .bookmarks
        .update(&user_id, "bm_a", update(2), Some("stale"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    let unchanged = engine.api.bookmarks.get(&user_id, "bm_a").await.unwrap();
    assert_eq!(unchanged.version, 1);
    assert_eq!(unchanged.etag, created.etag);

    // Correct guard commits and bumps exactly one version
    let updated = engine
        .api
        .bookmarks
        .update(&user_id, "bm_a", update(2), Some(&created.etag))
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert!(updated.updated_at >= unchanged.updated_at);
    assert_eq!(updated.ciphertext_content, b"updated ciphertext");

    // An update against the tombstone is not found
    engine
        .api
        .bookmarks
        .soft_delete(
            &user_id,
            "bm_a",
            ItemDelete {
                version: 3,
                deleted_at: 999,
            },
            Some(&updated.etag),
        )
        .await
        .unwrap();
    let err = engine
        .api
        .bookmarks
        .update(&user_id, "bm_a", update(4), Some(&updated.etag))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_create_requires_vault_and_unique_id() {
    let engine = engine().await;

    // No vault yet: the engine refuses the write
    let outcome = engine
        .api
        .auth
        .register("alice", "correct horse battery staple")
        .await
        .unwrap();
    let err = engine
        .api
        .bookmarks
        .create(&outcome.user_id, new_bookmark("bm_a"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    engine.api.vault.get_or_create(&outcome.user_id).await.unwrap();
    engine
        .api
        .bookmarks
        .create(&outcome.user_id, new_bookmark("bm_a"))
        .await
        .unwrap();

    // Duplicate item id conflicts
    let err = engine
        .api
        .bookmarks
        .create(&outcome.user_id, new_bookmark("bm_a"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}

#[tokio::test]
async fn test_item_size_cap() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    // A 70,000-byte tag ciphertext is over the cap
    let oversized = NewTag {
        tag_id: "t_big".to_string(),
        nonce_content: b64(&[0u8; 24]),
        ciphertext_content: b64(&vec![0u8; 70_000]),
        tag_token: None,
        size: 70_024,
        created_at: 1,
        updated_at: 1,
    };
    let err = engine.api.tags.create(&user_id, oversized).await.unwrap_err();
    assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");

    // A 100-byte ciphertext is fine
    let small = NewTag {
        tag_id: "t_small".to_string(),
        nonce_content: b64(&[0u8; 24]),
        ciphertext_content: b64(&vec![0u8; 100]),
        tag_token: None,
        size: 124,
        created_at: 1,
        updated_at: 1,
    };
    let created = engine.api.tags.create(&user_id, small).await.unwrap();
    assert_eq!(created.size, 124);
}

#[tokio::test]
async fn test_non_canonical_blob_rejected_before_persistence() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    let mut bad = new_bookmark("bm_bad");
    bad.ciphertext_content = "aGVsbG8".to_string(); // missing padding

    let err = engine.api.bookmarks.create(&user_id, bad).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = engine.api.bookmarks.get(&user_id, "bm_bad").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_pagination_walks_each_item_exactly_once() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    for index in 0..7 {
        engine
            .api
            .bookmarks
            .create(&user_id, new_bookmark(&format!("bm_{:02}", index)))
            .await
            .unwrap();
    }

    // Walk with page size 3: 3 + 3 + 1
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = engine
            .api
            .bookmarks
            .list(
                &user_id,
                ListOptions {
                    limit: Some(3),
                    cursor: cursor.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for item in &page.items {
            seen.push(item.item_id.clone());
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let expected: Vec<String> = (0..7).map(|i| format!("bm_{:02}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_list_filters() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    let mut first = new_bookmark("bm_a");
    first.updated_at = 100;
    let mut second = new_bookmark("bm_b");
    second.updated_at = 200;
    let created_a = engine.api.bookmarks.create(&user_id, first).await.unwrap();
    engine.api.bookmarks.create(&user_id, second).await.unwrap();

    // updated_after is a strict bound
    let page = engine
        .api
        .bookmarks
        .list(
            &user_id,
            ListOptions {
                updated_after: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].item_id, "bm_b");

    // Tombstones are hidden unless asked for
    engine
        .api
        .bookmarks
        .soft_delete(
            &user_id,
            "bm_a",
            ItemDelete {
                version: 2,
                deleted_at: 300,
            },
            Some(&created_a.etag),
        )
        .await
        .unwrap();

    let page = engine
        .api
        .bookmarks
        .list(&user_id, ListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].item_id, "bm_b");

    let page = engine
        .api
        .bookmarks
        .list(
            &user_id,
            ListOptions {
                include_deleted: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);

    // Tombstones carry their deletion time for incremental sync
    let page = engine
        .api
        .bookmarks
        .list(
            &user_id,
            ListOptions {
                include_deleted: true,
                updated_after: Some(250),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].item_id, "bm_a");
    assert_eq!(page.items[0].deleted_at, Some(300));
}

#[tokio::test]
async fn test_tag_token_blind_index_lookup() {
    let engine = engine().await;
    let (user_id, _) = signed_up_with_vault(&engine.api, "alice").await;

    engine
        .api
        .tags
        .create(&user_id, new_tag("t_a", Some("tok_reading")))
        .await
        .unwrap();
    engine
        .api
        .tags
        .create(&user_id, new_tag("t_b", Some("tok_work")))
        .await
        .unwrap();
    engine
        .api
        .tags
        .create(&user_id, new_tag("t_c", None))
        .await
        .unwrap();

    // Equality on the stored token
    let page = engine
        .api
        .tags
        .list(
            &user_id,
            TagListOptions {
                by_token: Some("tok_work".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].tag_id, "t_b");

    // Empty string explicitly selects rows without a token
    let page = engine
        .api
        .tags
        .list(
            &user_id,
            TagListOptions {
                by_token: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].tag_id, "t_c");

    // No filter returns everything
    let page = engine
        .api
        .tags
        .list(&user_id, TagListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 3);
}

#[tokio::test]
async fn test_vault_isolation() {
    let engine = engine().await;
    let (alice, _) = signed_up_with_vault(&engine.api, "alice").await;
    let (bob, _) = signed_up_with_vault(&engine.api, "bob").await;

    let created = engine
        .api
        .bookmarks
        .create(&alice, new_bookmark("bm_a"))
        .await
        .unwrap();

    // Bob cannot see, modify, or delete Alice's bookmark through his vault
    assert_eq!(
        engine.api.bookmarks.get(&bob, "bm_a").await.unwrap_err().code(),
        "NOT_FOUND"
    );
    assert_eq!(
        engine
            .api
            .bookmarks
            .soft_delete(
                &bob,
                "bm_a",
                ItemDelete {
                    version: 2,
                    deleted_at: 1,
                },
                Some(&created.etag),
            )
            .await
            .unwrap_err()
            .code(),
        "NOT_FOUND"
    );

    let page = engine
        .api
        .bookmarks
        .list(&bob, ListOptions::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());

    // Alice's record is untouched
    let fetched = engine.api.bookmarks.get(&alice, "bm_a").await.unwrap();
    assert_eq!(fetched.version, 1);
    assert!(fetched.deleted_at.is_none());
}

#[tokio::test]
async fn test_list_before_vault_is_empty() {
    let engine = engine().await;
    let outcome = engine
        .api
        .auth
        .register("alice", "correct horse battery staple")
        .await
        .unwrap();

    let page = engine
        .api
        .bookmarks
        .list(&outcome.user_id, ListOptions::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_none());
}
