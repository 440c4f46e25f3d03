//! File-backed stores survive reopen; tenant databases stay separate files.

use synapse_storage::pool::pragmas::journal_mode;
use synapse_storage::queries::{episode_ops, sync_state_ops};
use synapse_storage::{AgentStore, HubStore};
use test_fixtures::{clock, episode, T0};

#[tokio::test]
async fn agent_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.db");
    {
        let store = AgentStore::open(&path, 2).unwrap();
        store
            .with_transaction(|conn| {
                sync_state_ops::init_sync_state(conn, "A")?;
                sync_state_ops::save_clock(conn, &clock(&[("A", 7)]))?;
                episode_ops::upsert_episode(conn, &episode("ep-1", "persist me", "A", T0))
            })
            .await
            .unwrap();
    }

    let reopened = AgentStore::open(&path, 2).unwrap();
    let state = reopened
        .with_reader(|conn| sync_state_ops::load_sync_state(conn))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.vector_clock, clock(&[("A", 7)]));
    let episodes = reopened
        .with_reader(|conn| episode_ops::list_episodes(conn, false))
        .await
        .unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(reopened.db_path(), Some(&path));
}

#[tokio::test]
async fn each_tenant_gets_its_own_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let hub = HubStore::open(dir.path()).unwrap();
    hub.tenant("acme").unwrap();
    hub.tenant("globex").unwrap();
    // Same tenant twice reuses the open store.
    hub.tenant("acme").unwrap();

    let mut files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".db"))
        .collect();
    files.sort();
    assert_eq!(files, vec!["tenant-61636d65.db", "tenant-676c6f626578.db"]);
    assert_eq!(hub.tenant_ids(), vec!["acme", "globex"]);
}

#[tokio::test]
async fn file_store_runs_in_wal_with_read_only_readers() {
    let dir = tempfile::tempdir().unwrap();
    let store = AgentStore::open(&dir.path().join("wal.db"), 3).unwrap();
    assert_eq!(store.reader_count(), 3);

    let mode = store.with_writer(|conn| journal_mode(conn)).await.unwrap();
    assert_eq!(mode, "wal");

    let write_through_reader = store
        .with_reader(|conn| episode_ops::upsert_episode(conn, &episode("ep-x", "nope", "A", T0)))
        .await;
    assert!(write_through_reader.is_err());
}

#[tokio::test]
async fn in_memory_store_has_no_read_pool() {
    let store = AgentStore::open_in_memory().unwrap();
    assert_eq!(store.reader_count(), 0);
    assert!(store.db_path().is_none());
}
