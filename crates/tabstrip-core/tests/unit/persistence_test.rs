//! Unit tests for host binding and debounced persistence.

use std::sync::Arc;
use std::time::Duration;

use tabstrip_core::{
    Config, CoreError, Database, HostContext, HostId, MemorySink, OutboundMessage, SyncState,
    TabRegistry, UiLoop,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

fn setup(persist_delay_ms: u64) -> (TabRegistry, UiLoop) {
    let (tx, _rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let config = Config {
        persist_delay_ms,
        ..Config::new("/tmp/tabstrip-persist".into())
    };
    TabRegistry::new(config, Arc::new(tx))
}

fn memory_host(id: u64) -> (HostContext, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let host = HostContext::new(HostId(id), Handle::current(), sink.clone());
    (host, sink)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_burst_of_changes_persists_once() {
    let (registry, mut ui) = setup(50);
    let (host, sink) = memory_host(1);
    registry.attach(host);

    for id in 0..3 {
        registry.add_tab(id, Some(format!("https://p{}.test/", id)), false, None, format!("P{}", id), false);
        registry.select_tab(id);
    }
    ui.drain();
    assert!(registry.persist_pending());

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(sink.flush_count(), 1);
    let records = sink.latest().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.tab_id).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(records[1].title, "P1");
    assert_eq!(records[2].position, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unrelated_events_do_not_persist() {
    let (registry, mut ui) = setup(20);
    let (host, sink) = memory_host(1);
    registry.attach(host);

    registry.add_tab(1, None, false, None, String::new(), false);
    registry.notify_listeners(
        registry.get_tab(1),
        tabstrip_core::TabEvent::Title,
        tabstrip_core::EventData::None,
    );
    ui.drain();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.flush_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_detach_cancels_pending_flush() {
    let (registry, mut ui) = setup(100);
    let (host, sink) = memory_host(7);
    registry.attach(host);

    registry.add_tab(1, None, false, None, String::new(), false);
    registry.select_tab(1);
    ui.drain();
    assert!(registry.persist_pending());

    assert!(!registry.detach(HostId(8)));
    assert!(registry.detach(HostId(7)));
    assert!(!registry.is_attached());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(sink.flush_count(), 0);
    assert!(matches!(registry.persist_all_tabs(), Err(CoreError::NotAttached)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_attach_is_idempotent_and_rebinds() {
    let (registry, _ui) = setup(50);
    let (first, first_sink) = memory_host(1);
    let (second, second_sink) = memory_host(2);

    registry.attach(first.clone());
    registry.attach(first);
    assert_eq!(registry.host().unwrap().id(), HostId(1));

    registry.attach(second);
    assert_eq!(registry.host().unwrap().id(), HostId(2));

    registry.add_tab(1, Some("https://a.test/".into()), false, None, String::new(), false);
    registry.persist_all_tabs().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(first_sink.flush_count(), 0);
    assert_eq!(second_sink.flush_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_state_gates_and_triggers_flush() {
    let (registry, _ui) = setup(50);
    let (accounts_tx, accounts_rx) = watch::channel(SyncState::NotConfigured);
    let (host, sink) = memory_host(1);
    registry.attach(host.with_sync_state(accounts_rx));

    registry.add_tab(1, Some("https://a.test/".into()), false, None, String::new(), false);
    registry.persist_all_tabs().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.flush_count(), 0);

    // Account added: flush right away
    accounts_tx.send(SyncState::Configured).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.flush_count(), 1);

    // Watcher stops with the host
    assert!(registry.detach(HostId(1)));
    let _ = accounts_tx.send(SyncState::NotConfigured);
    let _ = accounts_tx.send(SyncState::Configured);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.flush_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_flush_on_detach() {
    let (tx, _rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let config = Config {
        flush_on_detach: true,
        persist_delay_ms: 10_000,
        ..Config::new("/tmp/tabstrip-persist".into())
    };
    let (registry, _ui) = TabRegistry::new(config, Arc::new(tx));
    let (host, sink) = memory_host(3);
    registry.attach(host);

    registry.add_tab(1, Some("https://a.test/".into()), false, None, String::new(), false);
    registry.detach(HostId(3));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(sink.flush_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sqlite_host_stores_public_tabs() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        persist_delay_ms: 20,
        ..Config::new(dir.path().to_path_buf())
    };
    let (tx, _rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (registry, _ui) = TabRegistry::new(config.clone(), Arc::new(tx));

    let host = HostContext::open(HostId(1), Handle::current(), &config).unwrap();
    registry.attach(host);

    registry.add_tab(1, Some("https://public.test/".into()), false, None, "Public".into(), false);
    registry.add_tab(2, Some("https://secret.test/".into()), false, None, "Secret".into(), true);
    registry.add_tab(3, None, false, None, "Pending".into(), false);
    registry.add_tab(4, Some("https://second.test/".into()), false, Some(1), "Second".into(), false);
    registry.persist_all_tabs().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stored = Database::open(&config.database_path).unwrap().load_tabs().unwrap();
    assert_eq!(
        stored.iter().map(|r| r.tab_id).collect::<Vec<_>>(),
        vec![1, 4]
    );
    assert_eq!(stored[1].parent_id, Some(1));
    assert!(stored.iter().all(|r| !r.is_private));
}
