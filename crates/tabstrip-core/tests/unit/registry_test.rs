//! Unit tests for the tab registry: selection and close scenarios,
//! concurrent registration, and notification ordering.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tabstrip_core::{
    Config, EventBridge, EventData, LoadFlags, OutboundMessage, Tab, TabEvent, TabId, TabRegistry,
    UiLoop,
};
use tokio::sync::mpsc;

fn setup() -> (
    TabRegistry,
    UiLoop,
    mpsc::UnboundedReceiver<OutboundMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (registry, ui) = TabRegistry::new(Config::new("/tmp/tabstrip-unit".into()), Arc::new(tx));
    (registry, ui, rx)
}

fn record(registry: &TabRegistry) -> Arc<Mutex<Vec<(Option<TabId>, TabEvent)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    registry.register_listener(Arc::new(
        move |tab: Option<&Arc<Tab>>, event: TabEvent, _: &EventData| {
            sink.lock().push((tab.map(|t| t.id()), event));
        },
    ));
    seen
}

#[test]
fn test_first_selection_has_no_unselected() {
    let (registry, mut ui, mut rx) = setup();
    let seen = record(&registry);

    registry.add_tab(5, Some("https://five.test/".into()), false, None, String::new(), false);
    registry.select_tab(5);
    ui.drain();

    assert_eq!(*seen.lock(), vec![(Some(5), TabEvent::Selected)]);
    assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Selected { tab_id: 5 });
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_close_sequence_walks_the_strip() {
    let (registry, mut ui, mut rx) = setup();
    for id in 1..=3 {
        registry.add_tab(id, None, false, None, String::new(), false);
    }
    registry.select_tab(2);
    ui.drain();
    while rx.try_recv().is_ok() {}
    let seen = record(&registry);

    let two = registry.get_tab(2).unwrap();
    registry.close_tab(&two);
    assert_eq!(registry.selected_tab().unwrap().id(), 3);

    let three = registry.get_tab(3).unwrap();
    registry.close_tab(&three);
    assert_eq!(registry.selected_tab().unwrap().id(), 1);

    ui.drain();
    assert_eq!(
        *seen.lock(),
        vec![
            (Some(3), TabEvent::Selected),
            (Some(2), TabEvent::Unselected),
            (Some(2), TabEvent::Closed),
            (Some(1), TabEvent::Selected),
            (Some(3), TabEvent::Unselected),
            (Some(3), TabEvent::Closed),
        ]
    );

    let messages: Vec<OutboundMessage> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        messages,
        vec![
            OutboundMessage::Selected { tab_id: 3 },
            OutboundMessage::Closed { tab_id: 2 },
            OutboundMessage::Selected { tab_id: 1 },
            OutboundMessage::Closed { tab_id: 3 },
        ]
    );
}

#[test]
fn test_closing_only_tab_leaves_home_tab() {
    let (registry, _ui, _rx) = setup();
    let only = registry.add_tab(1, None, false, None, String::new(), false);
    registry.select_tab(1);

    registry.close_tab(&only);

    let tabs = registry.tabs_in_order();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].url().as_deref(), Some(registry.config().home_url.as_str()));
    assert!(registry.is_selected(&tabs[0]));
}

#[test]
fn test_sibling_wins_over_parent() {
    let (registry, _ui, _rx) = setup();
    registry.add_tab(1, None, false, None, String::new(), false);
    let child = registry.add_tab(2, None, false, Some(1), String::new(), false);
    registry.add_tab(3, None, false, Some(1), String::new(), false);
    registry.select_tab(2);

    registry.close_tab(&child);
    assert_eq!(registry.selected_tab().unwrap().id(), 3);
}

#[test]
fn test_load_url_in_tab_reuses_open_tab() {
    let (registry, _ui, mut rx) = setup();
    registry.add_tab(1, Some("https://docs.test/".into()), false, None, String::new(), false);
    registry.add_tab(2, Some("https://news.test/".into()), false, None, String::new(), false);
    registry.select_tab(2);
    while rx.try_recv().is_ok() {}

    registry.load_url_in_tab("https://docs.test/");

    assert_eq!(registry.tab_count(), 2);
    assert_eq!(registry.selected_tab().unwrap().id(), 1);
    let messages: Vec<OutboundMessage> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(messages, vec![OutboundMessage::Selected { tab_id: 1 }]);
}

#[test]
fn test_concurrent_add_tab_loses_nothing() {
    let (registry, _ui, _rx) = setup();
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    let id = registry.next_tab_id().unwrap();
                    registry.add_tab(id, None, false, None, String::new(), false);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let order = registry.tabs_in_order();
    assert_eq!(order.len(), threads * per_thread);
    let mut ids: Vec<TabId> = order.iter().map(|t| t.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), threads * per_thread);
}

#[test]
fn test_concurrent_load_url_tabs_are_selected_once_each() {
    let (registry, mut ui, _rx) = setup();
    let seen = record(&registry);

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    registry.load_url(&format!("https://t{}-{}.test/", n, i), None, None, LoadFlags::NEW_TAB);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    ui.drain();

    let selected: Vec<TabId> = seen
        .lock()
        .iter()
        .filter(|(_, e)| *e == TabEvent::Selected)
        .filter_map(|(id, _)| *id)
        .collect();
    assert_eq!(selected.len(), 40);

    // Last SELECTED matches the final selection
    assert_eq!(selected.last().copied(), registry.selected_tab().map(|t| t.id()));
}

#[test]
fn test_bridge_driven_session_restore() {
    let (registry, mut ui, _rx) = setup();
    let bridge = EventBridge::new(registry.clone());
    let seen = record(&registry);

    for id in 0..3 {
        bridge.handle_message(
            "Tab:Added",
            &serde_json::json!({
                "tabID": id,
                "uri": format!("https://restored{}.test/", id),
                "stub": false,
                "external": false,
                "parentId": -1,
                "title": "",
                "isPrivate": false,
                "selected": id == 2,
                "delayLoad": id != 2,
                "desktopMode": false
            }),
        );
    }
    bridge.handle_message("Session:RestoreEnd", &serde_json::Value::Null);
    ui.drain();
    registry.add_tab(10, None, false, None, String::new(), false);
    ui.drain();

    // Restored tabs do not animate in; tabs after the restore do
    assert_eq!(
        *seen.lock(),
        vec![
            (Some(2), TabEvent::Selected),
            (None, TabEvent::Restored),
            (Some(10), TabEvent::Added),
        ]
    );
    assert_eq!(registry.get_display_count(), 4);
}
