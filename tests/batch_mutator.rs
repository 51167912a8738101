use conversation_store::{
    BatchMutator, Conversation, ConversationError, Locator, MemoryConversationStore, Operation,
    OperationKind, OperationValue,
};

fn conversation(id: i64) -> Conversation {
    Conversation {
        id,
        uri: Some(Locator::parse(&format!("content://mail/conversations/{id}")).expect("valid")),
        message_list_uri: Some(
            Locator::parse(&format!("content://mail/conversations/{id}/messages")).expect("valid"),
        ),
        subject: format!("thread {id}"),
        date_ms: id * 1_000,
        ..Conversation::default()
    }
}

#[tokio::test]
async fn starring_one_equals_starring_a_list_of_one() {
    let r = conversation(3);
    let store = MemoryConversationStore::with_conversations([r.clone()]);
    let mutator = BatchMutator::new(store.clone());

    mutator
        .update_boolean(&[r.clone()], "starred", true)
        .await
        .expect("list form");
    mutator
        .update_boolean_one(&r, "starred", true)
        .await
        .expect("single form");

    let batches = store.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches[0].operations,
        vec![Operation::update(&r, "starred", OperationValue::Bool(true))]
    );
    assert_eq!(batches[0].operations, batches[1].operations);
    assert!(store.get(3).expect("decodes").expect("present").starred);
}

#[tokio::test]
async fn delete_submits_n_operations_in_one_call() {
    let conversations: Vec<_> = [10, 4, 7, 1].into_iter().map(conversation).collect();
    let store = MemoryConversationStore::with_conversations(conversations.clone());
    let mutator = BatchMutator::new(store.clone());

    mutator.delete(&conversations).await.expect("deleted");

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    let ops = &batches[0].operations;
    assert_eq!(ops.len(), conversations.len());
    assert!(ops.iter().all(|op| op.kind() == OperationKind::Delete));
    let ids: Vec<_> = ops.iter().map(|op| op.target().id).collect();
    assert_eq!(ids, vec![10, 4, 7, 1]);
    assert!(store.list().expect("decodes").is_empty());
    assert_eq!(store.acquisitions(), 1);
    assert_eq!(store.outstanding_handles(), 0);
}

#[tokio::test]
async fn sequence_numbers_come_back_from_the_store() {
    let store = MemoryConversationStore::with_conversations([conversation(1), conversation(2)]);
    let mutator = BatchMutator::new(store.clone());

    let first = mutator
        .update_boolean_one(&conversation(1), "read", true)
        .await
        .expect("first");
    let second = mutator
        .update_boolean(&[conversation(1), conversation(2)], "read", false)
        .await
        .expect("second");

    assert!(second > first);
    let sequences: Vec<_> = store.batches().iter().map(|b| b.sequence).collect();
    assert_eq!(sequences, vec![first, second]);
}

#[tokio::test]
async fn empty_input_still_submits_one_batch() {
    let store = MemoryConversationStore::new();
    let mutator = BatchMutator::new(store.clone());

    let none: Vec<Conversation> = Vec::new();
    mutator.delete(&none).await.expect("empty batch");

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].operations.is_empty());
}

#[tokio::test]
async fn missing_applier_submits_nothing() {
    let store = MemoryConversationStore::with_conversations([conversation(1)]);
    store.set_unavailable(Some("provider not installed"));
    let mutator = BatchMutator::new(store.clone());

    let err = mutator
        .update_boolean_one(&conversation(1), "starred", true)
        .await
        .expect_err("no applier");
    assert!(matches!(
        err,
        ConversationError::ApplierUnavailable { ref applier, ref reason }
            if applier == "conversations" && reason == "provider not installed"
    ));
    assert!(store.batches().is_empty());

    store.set_unavailable(None);
    mutator
        .update_boolean_one(&conversation(1), "starred", true)
        .await
        .expect("applier back");
}

#[tokio::test]
async fn applier_failure_is_passed_through_and_handle_released() {
    let store = MemoryConversationStore::with_conversations([conversation(1), conversation(2)]);
    store.reject_next_batch("constraint violated");
    let mutator = BatchMutator::new(store.clone());

    let err = mutator
        .delete(&[conversation(1), conversation(2)])
        .await
        .expect_err("rejected");
    assert!(matches!(err, ConversationError::Rejected(ref reason) if reason == "constraint violated"));
    assert_eq!(store.list().expect("decodes").len(), 2);
    assert_eq!(store.outstanding_handles(), 0);
}
