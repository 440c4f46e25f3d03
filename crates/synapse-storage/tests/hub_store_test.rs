//! Tenant store: idempotent persistence, change log, clock tracking and
//! clock-based change queries.

use synapse_storage::HubStore;
use test_fixtures::{clock, episode, episode_message, T0};

#[tokio::test]
async fn duplicate_sequence_numbers_are_ignored() {
    let hub = HubStore::in_memory();
    let tenant = hub.tenant("t1").unwrap();
    let msg = episode_message(1, "A", &[("A", 1)], episode("ep-1", "task", "A", T0));

    let first = tenant.persist_push("A", &[msg.clone()], &clock(&[("A", 1)]), T0).await.unwrap();
    assert_eq!(first.inserted.len(), 1);
    assert!(first.duplicates.is_empty());

    let retry = tenant.persist_push("A", &[msg], &clock(&[("A", 1)]), T0 + 1).await.unwrap();
    assert!(retry.inserted.is_empty());
    assert_eq!(retry.duplicates, vec![1]);

    assert_eq!(tenant.all_records().await.unwrap().len(), 1);
    let log = tenant.change_log().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, "create");
    assert_eq!(log[0].episode_id, "ep-1");
    assert_eq!(log[0].agent_id, "A");
}

#[tokio::test]
async fn tenant_clock_joins_record_and_agent_clocks() {
    let hub = HubStore::in_memory();
    let tenant = hub.tenant("t1").unwrap();
    tenant
        .persist_push(
            "A",
            &[
                episode_message(1, "A", &[("A", 1)], episode("a1", "t", "A", T0)),
                episode_message(2, "A", &[("A", 2)], episode("a2", "t", "A", T0)),
            ],
            &clock(&[("A", 2)]),
            T0,
        )
        .await
        .unwrap();
    let outcome = tenant
        .persist_push(
            "B",
            &[episode_message(1, "B", &[("A", 1), ("B", 1)], episode("b1", "t", "B", T0))],
            &clock(&[("A", 1), ("B", 1)]),
            T0,
        )
        .await
        .unwrap();
    assert_eq!(outcome.hub_clock, clock(&[("A", 2), ("B", 1)]));
    assert_eq!(tenant.clock().await.unwrap(), clock(&[("A", 2), ("B", 1)]));
}

#[tokio::test]
async fn changes_since_skips_covered_records_and_pages() {
    let hub = HubStore::in_memory();
    let tenant = hub.tenant("t1").unwrap();
    let batch: Vec<_> = (1..=3)
        .map(|seq| episode_message(seq, "A", &[("A", seq)], episode(&format!("a{seq}"), "t", "A", T0)))
        .collect();
    tenant.persist_push("A", &batch, &clock(&[("A", 3)]), T0).await.unwrap();

    let all = tenant.changes_since(&clock(&[]), None, 10).await.unwrap();
    assert_eq!(all.records.len(), 3);
    assert!(!all.has_more);
    assert_eq!(all.hub_clock, clock(&[("A", 3)]));

    let page = tenant.changes_since(&clock(&[]), None, 2).await.unwrap();
    assert_eq!(page.records.len(), 2);
    assert!(page.has_more);

    let rest = tenant.changes_since(&clock(&[("A", 2)]), None, 10).await.unwrap();
    assert_eq!(rest.records.len(), 1);
    assert_eq!(rest.records[0].sequence_number, 3);
    assert!(!rest.has_more);

    let resumed = tenant.changes_since(&clock(&[]), page.cursor, 10).await.unwrap();
    assert_eq!(resumed.records.len(), 1);
    assert_eq!(resumed.records[0].sequence_number, 3);
    assert_eq!(resumed.cursor, all.cursor);
}

#[tokio::test]
async fn paged_catch_up_walks_the_log_once() {
    let hub = HubStore::in_memory();
    let tenant = hub.tenant("t1").unwrap();
    let mut batch: Vec<_> = (1..=600)
        .map(|seq| episode_message(seq, "A", &[("A", seq)], episode(&format!("a{seq}"), "t", "A", T0)))
        .collect();
    batch.extend((1..=5).map(|seq| episode_message(seq, "B", &[("B", seq)], episode(&format!("b{seq}"), "t", "B", T0))));
    tenant.persist_push("A", &batch[..600], &clock(&[("A", 600)]), T0).await.unwrap();
    tenant.persist_push("B", &batch[600..], &clock(&[("B", 5)]), T0).await.unwrap();

    // An agent that already has everything from A pages through B's records only.
    let known = clock(&[("A", 600)]);
    let first = tenant.changes_since(&known, None, 3).await.unwrap();
    let ids: Vec<_> = first.records.iter().map(|m| m.sequence_number).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(first.has_more);

    let second = tenant.changes_since(&known, first.cursor, 3).await.unwrap();
    let ids: Vec<_> = second.records.iter().map(|m| m.sequence_number).collect();
    assert_eq!(ids, vec![4, 5]);
    assert!(!second.has_more);
    assert!(second.cursor > first.cursor);

    let mut fresh = Vec::new();
    let mut cursor = None;
    loop {
        let page = tenant.changes_since(&clock(&[]), cursor, 100).await.unwrap();
        fresh.extend(page.records);
        cursor = page.cursor;
        if !page.has_more {
            break;
        }
    }
    assert_eq!(fresh.len(), 605);
}

#[tokio::test]
async fn tenants_do_not_see_each_other() {
    let hub = HubStore::in_memory();
    let t1 = hub.tenant("t1").unwrap();
    let t2 = hub.tenant("t2").unwrap();
    t1.persist_push(
        "A",
        &[episode_message(1, "A", &[("A", 1)], episode("secret", "t", "A", T0))],
        &clock(&[("A", 1)]),
        T0,
    )
    .await
    .unwrap();
    let visible = t2.changes_since(&clock(&[]), None, 10).await.unwrap();
    assert!(visible.records.is_empty());
    assert!(t2.clock().await.unwrap().is_empty());
}
