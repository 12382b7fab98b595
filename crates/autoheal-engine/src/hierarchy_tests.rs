use super::*;

fn tracker() -> (broadcast::Sender<WindowEvent>, WindowTracker) {
    let (tx, rx) = broadcast::channel(32);
    (tx, WindowTracker::new(rx))
}

fn w(id: &str) -> WindowId {
    WindowId::new(id)
}

#[test]
fn test_first_window_becomes_root() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("main"), None, "https://app.test/");
    tracker.on_window_opened(w("popup"), Some(w("main")), "");

    assert_eq!(tracker.root(), Some(&w("main")));
    assert_eq!(tracker.node(&w("main")).unwrap().level, 0);
    assert_eq!(tracker.node(&w("popup")).unwrap().level, 1);
    assert_eq!(tracker.node(&w("popup")).unwrap().parent, Some(w("main")));
    assert_eq!(tracker.node(&w("main")).unwrap().children, vec![w("popup")]);
}

#[test]
fn test_unknown_parent_attaches_to_root() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("main"), None, "");
    tracker.on_window_opened(w("orphan"), Some(w("nowhere")), "");

    let node = tracker.node(&w("orphan")).unwrap();
    assert_eq!(node.parent, Some(w("main")));
    assert_eq!(node.level, 1);
}

#[test]
fn test_latest_pointer_survives_close() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("main"), None, "");
    tracker.on_window_opened(w("popup"), Some(w("main")), "");
    tracker.on_window_closed(&w("popup"));

    assert_eq!(tracker.latest(), Some(&w("popup")));
    assert_eq!(tracker.latest_open(), None);
    assert!(!tracker.is_open(&w("popup")));
    // Closed entries stay in the registry.
    assert_eq!(tracker.len(), 2);
}

#[test]
fn test_active_windows_newest_first() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("a"), None, "");
    tracker.on_window_opened(w("b"), Some(w("a")), "");
    tracker.on_window_opened(w("c"), Some(w("a")), "");
    tracker.on_window_closed(&w("b"));

    assert_eq!(tracker.active_windows(), vec![w("c"), w("a")]);
}

#[test]
fn test_search_order_latest_first_root_last() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("root"), None, "");
    tracker.on_window_opened(w("p1"), Some(w("root")), "");
    tracker.on_window_opened(w("p1-child"), Some(w("p1")), "");
    tracker.on_window_opened(w("p2"), Some(w("root")), "");

    let order = tracker.search_order(None);
    assert_eq!(order, vec![w("p2"), w("p1-child"), w("p1"), w("root")]);
}

#[test]
fn test_search_order_descends_before_next_sibling() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("root"), None, "");
    tracker.on_window_opened(w("p1"), Some(w("root")), "");
    tracker.on_window_opened(w("p2"), Some(w("root")), "");
    tracker.on_window_opened(w("p1-child"), Some(w("p1")), "");

    // p1-child is the latest; p2 is next by recency; p1 comes after.
    let order = tracker.search_order(None);
    assert_eq!(order, vec![w("p1-child"), w("p2"), w("p1"), w("root")]);
}

#[test]
fn test_search_order_excludes_window_and_closed() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("root"), None, "");
    tracker.on_window_opened(w("p1"), Some(w("root")), "");
    tracker.on_window_opened(w("p2"), Some(w("root")), "");
    tracker.on_window_closed(&w("p1"));

    assert_eq!(tracker.search_order(Some(&w("p2"))), vec![w("root")]);
    assert_eq!(tracker.search_order(Some(&w("root"))), vec![w("p2")]);
}

#[test]
fn test_sync_applies_events_and_dialogs() {
    let (tx, mut tracker) = tracker();
    tx.send(WindowEvent::Opened {
        id: w("main"),
        opener: None,
        url: "https://app.test/".to_string(),
    })
    .unwrap();
    tx.send(WindowEvent::Opened {
        id: w("popup"),
        opener: Some(w("main")),
        url: "https://app.test/help".to_string(),
    })
    .unwrap();
    tx.send(WindowEvent::Dialog {
        window: w("main"),
        kind: DialogKind::Alert,
        message: "Saved".to_string(),
    })
    .unwrap();
    tx.send(WindowEvent::Closed { id: w("popup") }).unwrap();

    tracker.sync();

    assert_eq!(tracker.root(), Some(&w("main")));
    assert!(!tracker.is_open(&w("popup")));
    assert_eq!(tracker.node(&w("popup")).unwrap().url, "https://app.test/help");
    let dialogs: Vec<_> = tracker.recent_dialogs().collect();
    assert_eq!(dialogs.len(), 1);
    assert_eq!(dialogs[0].message, "Saved");
}

#[test]
fn test_absorb_marks_missing_closed_and_registers_new() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("main"), None, "");
    tracker.on_window_opened(w("gone"), Some(w("main")), "");

    tracker.absorb(&[
        WindowInfo {
            id: w("main"),
            title: "Main".to_string(),
            url: "https://app.test/".to_string(),
            opener: None,
        },
        WindowInfo {
            id: w("new"),
            title: "New".to_string(),
            url: "https://app.test/new".to_string(),
            opener: Some(w("main")),
        },
    ]);

    assert!(!tracker.is_open(&w("gone")));
    assert!(tracker.is_open(&w("new")));
    assert_eq!(tracker.node(&w("main")).unwrap().title, "Main");
    assert_eq!(tracker.latest(), Some(&w("new")));
}

#[test]
fn test_absorb_resets_replaced_session() {
    let (_tx, mut tracker) = tracker();
    tracker.on_window_opened(w("old"), None, "");

    tracker.absorb(&[WindowInfo {
        id: w("fresh"),
        title: String::new(),
        url: String::new(),
        opener: None,
    }]);

    assert_eq!(tracker.root(), Some(&w("fresh")));
    assert_eq!(tracker.len(), 1);
}
