use conversation_store::test_support::{TestDatabase, TestDatabaseError};
use conversation_store::{
    ApplierSource, BatchMutator, Conversation, ConversationError, Locator, NO_POSITION,
    Operation, OperationApplier, OperationValue,
};

fn conversation(id: i64, date_ms: i64) -> Conversation {
    Conversation {
        id,
        uri: Some(Locator::parse(&format!("content://mail/conversations/{id}")).expect("valid")),
        message_list_uri: Some(
            Locator::parse(&format!("content://mail/conversations/{id}/messages")).expect("valid"),
        ),
        subject: format!("thread {id}"),
        date_ms,
        snippet: Some("hello".to_string()),
        senders: "alice".to_string(),
        num_messages: 2,
        ..Conversation::default()
    }
}

async fn provision(test: &str) -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping {test}: no container runtime ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

#[tokio::test]
async fn stored_rows_decode_back() {
    let Some(test_db) = provision("stored_rows_decode_back").await else {
        return;
    };
    let store = test_db.store();

    let mut original = conversation(1, 5_000);
    original.position = 3;
    store.insert(&original).await.expect("insert");

    let stored = store.get(1).await.expect("query").expect("present");
    assert!(stored.same_content(&original));
    assert_eq!(stored.position, NO_POSITION);
    assert!(store.get(2).await.expect("query").is_none());

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn null_subject_reads_as_empty() {
    let Some(test_db) = provision("null_subject_reads_as_empty").await else {
        return;
    };
    let store = test_db.store();
    store.insert(&conversation(1, 0)).await.expect("insert");
    sqlx::query("UPDATE conversations SET subject = NULL, senders = NULL WHERE id = 1")
        .execute(test_db.pool())
        .await
        .expect("null out");

    let stored = store.get(1).await.expect("query").expect("present");
    assert_eq!(stored.subject, "");
    assert_eq!(stored.senders, "");

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn malformed_stored_locator_fails_the_read() {
    let Some(test_db) = provision("malformed_stored_locator_fails_the_read").await else {
        return;
    };
    let store = test_db.store();
    store.insert(&conversation(1, 0)).await.expect("insert");
    sqlx::query("UPDATE conversations SET uri = 'no scheme here' WHERE id = 1")
        .execute(test_db.pool())
        .await
        .expect("corrupt uri");

    let err = store.get(1).await.expect_err("malformed");
    assert!(matches!(err, ConversationError::MalformedLocator { field: "uri", .. }));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn batches_are_applied_and_journaled() {
    let Some(test_db) = provision("batches_are_applied_and_journaled").await else {
        return;
    };
    let store = test_db.store();
    let conversations = [conversation(1, 100), conversation(2, 300), conversation(3, 200)];
    for c in &conversations {
        store.insert(c).await.expect("insert");
    }

    let listed: Vec<_> = store
        .list(10)
        .await
        .expect("list")
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(listed, vec![2, 3, 1]);

    let mutator = BatchMutator::new(store.clone());
    let starred = mutator
        .update_boolean(&conversations[..2], "starred", true)
        .await
        .expect("star");
    let deleted = mutator.delete_one(&conversations[2]).await.expect("delete");
    assert!(deleted > starred);

    assert!(store.get(1).await.expect("query").expect("present").starred);
    assert!(store.get(2).await.expect("query").expect("present").starred);
    assert!(store.get(3).await.expect("query").is_none());

    let journal = store.batch_operations(starred).await.expect("journal");
    assert_eq!(journal.len(), 2);
    assert_eq!(journal[0].conversation_id, 1);
    assert_eq!(journal[1].conversation_id, 2);
    assert_eq!(journal[0].column_name.as_deref(), Some("starred"));
    assert_eq!(journal[0].new_value.as_deref(), Some("1"));

    let stored_flag: i32 = sqlx::query_scalar("SELECT starred FROM conversations WHERE id = 1")
        .fetch_one(test_db.pool())
        .await
        .expect("flag");
    assert_eq!(stored_flag, 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn failing_batch_rolls_back_every_operation() {
    let Some(test_db) = provision("failing_batch_rolls_back_every_operation").await else {
        return;
    };
    let store = test_db.store();
    store.insert(&conversation(1, 0)).await.expect("insert");

    let mut handle = store.acquire("conversations").await.expect("handle");
    let err = handle
        .apply(&[
            Operation::update(&conversation(1, 0), "read", OperationValue::Bool(true)),
            Operation::update(&conversation(1, 0), "bogus", OperationValue::Bool(true)),
        ])
        .await
        .expect_err("unknown column");
    drop(handle);

    assert!(matches!(err, ConversationError::UnknownColumn(ref column) if column == "bogus"));
    assert!(!store.get(1).await.expect("query").expect("present").read);
    let batches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversation_batches")
        .fetch_one(test_db.pool())
        .await
        .expect("count");
    assert_eq!(batches, 0);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn unknown_applier_id_is_unavailable() {
    let Some(test_db) = provision("unknown_applier_id_is_unavailable").await else {
        return;
    };

    let result = test_db.store().acquire("contacts").await;
    assert!(matches!(result, Err(ConversationError::ApplierUnavailable { .. })));

    test_db.close().await.expect("failed to drop test database");
}
