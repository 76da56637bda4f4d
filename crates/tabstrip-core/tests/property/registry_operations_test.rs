//! Property-based tests for tab registry operations.
//!
//! Random sequences of adds, removes, selections and closes must keep the
//! order list and the id map in agreement, keep at most one tab selected,
//! and never leave the strip empty after a close.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tabstrip_core::{Config, EventData, Tab, TabEvent, TabId, TabRegistry, UiLoop};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
enum RegistryOp {
    Add { private: bool },
    Remove(usize),
    Select(usize),
    Close(usize),
}

fn arb_ops() -> impl Strategy<Value = Vec<RegistryOp>> {
    prop::collection::vec(
        prop_oneof![
            4 => any::<bool>().prop_map(|private| RegistryOp::Add { private }),
            1 => (0..20usize).prop_map(RegistryOp::Remove),
            2 => (0..20usize).prop_map(RegistryOp::Select),
            2 => (0..20usize).prop_map(RegistryOp::Close),
        ],
        1..60,
    )
}

fn new_registry() -> (TabRegistry, UiLoop) {
    let (tx, _rx) = mpsc::unbounded_channel();
    TabRegistry::new(Config::new("/tmp/tabstrip-proptest".into()), Arc::new(tx))
}

fn pick(registry: &TabRegistry, idx: usize) -> Option<Arc<Tab>> {
    let order = registry.tabs_in_order();
    if order.is_empty() {
        return None;
    }
    Some(Arc::clone(&order[idx % order.len()]))
}

// The ordered list and the id map always describe the same tabs, and the
// selection is either empty or one of them.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn order_and_map_stay_consistent(ops in arb_ops()) {
        let (registry, _ui) = new_registry();
        let mut next_id: TabId = 0;

        for op in &ops {
            match op {
                RegistryOp::Add { private } => {
                    registry.add_tab(next_id, None, false, None, String::new(), *private);
                    next_id += 1;
                }
                RegistryOp::Remove(idx) => {
                    if let Some(tab) = pick(&registry, *idx) {
                        registry.remove_tab(tab.id());
                    }
                }
                RegistryOp::Select(idx) => {
                    if let Some(tab) = pick(&registry, *idx) {
                        registry.select_tab(tab.id());
                    }
                }
                RegistryOp::Close(idx) => {
                    if let Some(tab) = pick(&registry, *idx) {
                        registry.close_tab(&tab);
                        prop_assert!(registry.tab_count() >= 1);
                        prop_assert!(registry.get_tab(tab.id()).is_none());
                        prop_assert!(tab.is_destroyed());
                    }
                }
            }

            let order = registry.tabs_in_order();
            let ids: HashSet<TabId> = order.iter().map(|t| t.id()).collect();
            prop_assert_eq!(ids.len(), order.len());
            prop_assert_eq!(registry.tab_count(), order.len());
            for id in &ids {
                prop_assert!(registry.get_tab(*id).is_some());
            }

            if let Some(selected) = registry.selected_tab() {
                prop_assert!(ids.contains(&selected.id()));
                let selected_count = order.iter().filter(|t| registry.is_selected(t)).count();
                prop_assert_eq!(selected_count, 1);
            }
        }
    }
}

// Selection notifications: never two SELECTED for the same tab without
// an UNSELECTED in between, and every UNSELECTED follows a SELECTED.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn selection_events_alternate(picks in prop::collection::vec(0..6usize, 1..40)) {
        let (registry, mut ui) = new_registry();
        for id in 0..6 {
            registry.add_tab(id, None, false, None, String::new(), false);
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register_listener(Arc::new(
            move |tab: Option<&Arc<Tab>>, event: TabEvent, _: &EventData| {
                if matches!(event, TabEvent::Selected | TabEvent::Unselected) {
                    if let Some(tab) = tab {
                        sink.lock().push((tab.id(), event));
                    }
                }
            },
        ));

        for id in &picks {
            registry.select_tab(*id as TabId);
        }
        ui.drain();

        let mut selected: Option<TabId> = None;
        for (id, event) in seen.lock().iter() {
            match event {
                TabEvent::Selected => {
                    prop_assert_ne!(selected, Some(*id));
                    selected = Some(*id);
                }
                TabEvent::Unselected => {
                    prop_assert_ne!(selected, Some(*id));
                    prop_assert!(selected.is_some());
                }
                _ => unreachable!(),
            }
        }
    }
}

// Closing the selected private tab never lands on another private tab once
// none remain, and always lands on a normal tab if one exists.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn private_close_falls_back_to_normal(layout in prop::collection::vec(any::<bool>(), 1..12), target in 0..12usize) {
        let (registry, _ui) = new_registry();
        for (id, private) in layout.iter().enumerate() {
            registry.add_tab(id as TabId, None, false, None, String::new(), *private);
        }

        // Close every private tab except one, then close that one
        let privates: Vec<Arc<Tab>> = registry
            .tabs_in_order()
            .into_iter()
            .filter(|t| t.is_private())
            .collect();
        prop_assume!(!privates.is_empty());
        let keep = Arc::clone(&privates[target % privates.len()]);
        for tab in privates.iter().filter(|t| t.id() != keep.id()) {
            registry.remove_tab(tab.id());
        }

        registry.select_tab(keep.id());
        let has_normal = registry.tabs_in_order().iter().any(|t| !t.is_private());
        let next = registry.get_next_tab(&keep);

        if has_normal {
            let next = next.expect("a normal tab remains");
            prop_assert!(!next.is_private());
        } else {
            prop_assert!(next.is_none());
        }
    }
}

// Whatever was registered can be looked up again with the same fields.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn add_then_get_returns_same_tab(
        id in 0..10_000i32,
        url in prop::option::of("https://[a-z]{1,10}\\.test/"),
        title in "[a-zA-Z ]{0,20}",
        private in any::<bool>(),
        parent in prop::option::of(0..10_000i32),
    ) {
        let (registry, _ui) = new_registry();
        let added = registry.add_tab(id, url.clone(), false, parent, title.clone(), private);
        let found = registry.get_tab(id).expect("tab registered");

        prop_assert!(Arc::ptr_eq(&added, &found));
        prop_assert_eq!(found.url(), url);
        prop_assert_eq!(found.title(), title);
        prop_assert_eq!(found.is_private(), private);
        prop_assert_eq!(found.parent_id(), parent);
    }
}
