use skainet::{
    decode_message_log, Classification, DataMerger, MapView, Message, MessageStore, RemoteError,
    RemoteSource, SeedDataset, Urgency, MAX_BUFFERED_MESSAGES,
};
use std::sync::{Arc, Mutex};

/*-------------------------------------------------------------------------------------------------
 *                                       Test helpers
 *-----------------------------------------------------------------------------------------------*/

/// A remote held entirely in memory, with switches to make it fail.
#[derive(Clone, Default)]
struct MemoryRemote {
    messages: Arc<Mutex<Vec<Message>>>,
    fail_fetch: Arc<Mutex<bool>>,
    fail_clear: Arc<Mutex<bool>>,
}

impl RemoteSource for MemoryRemote {
    fn fetch_messages(&self) -> Result<Vec<Message>, RemoteError> {
        if *self.fail_fetch.lock().unwrap() {
            return Err(RemoteError::Connection("offline".to_string()));
        }
        Ok(self.messages.lock().unwrap().clone())
    }

    fn clear_messages(&self) -> Result<(), RemoteError> {
        if *self.fail_clear.lock().unwrap() {
            return Err(RemoteError::Status {
                code: 500,
                message: "database locked".to_string(),
            });
        }
        self.messages.lock().unwrap().clear();
        Ok(())
    }

    fn mark_rescued(&self, _log_id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Connection("offline".to_string()))
    }
}

fn located(node: &str, id: &str, lat: f64, lon: f64, urgency: Urgency) -> Message {
    Message::new(node, node, id)
        .with_coordinates(lat, lon)
        .with_urgency(urgency)
}

/*-------------------------------------------------------------------------------------------------
 *                                      Message Store
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_store_append_dedup_and_eviction() {
    let store = MessageStore::new(MemoryRemote::default());

    let first = Message::new("nodeA", "nodeA", "1");
    assert!(store.append_one(first.clone()));
    assert!(!store.append_one(first));
    assert_eq!(store.len(), 1);

    for i in 2..=(MAX_BUFFERED_MESSAGES + 1) {
        assert!(store.append_one(Message::new("nodeA", "nodeA", i.to_string().as_str())));
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), MAX_BUFFERED_MESSAGES);
    assert_eq!(snapshot[0].message_id(), "2");
    assert_eq!(
        snapshot[MAX_BUFFERED_MESSAGES - 1].message_id(),
        (MAX_BUFFERED_MESSAGES + 1).to_string()
    );
}

#[test]
fn test_store_failed_clear_keeps_data() {
    let remote = MemoryRemote::default();
    remote
        .messages
        .lock()
        .unwrap()
        .extend((0..5).map(|i| Message::new("n", "n", i.to_string().as_str())));

    let store = MessageStore::new(remote.clone());
    assert_eq!(store.fetch_all().unwrap(), 5);

    *remote.fail_clear.lock().unwrap() = true;
    assert!(store.clear_all().is_err());
    assert_eq!(store.len(), 5);
    assert!(store.error().is_some());

    *remote.fail_fetch.lock().unwrap() = true;
    assert!(store.fetch_all().is_err());
    assert_eq!(store.len(), 5);
    assert!(store.error().is_some());
    assert!(!store.is_loading());

    // Acknowledge never surfaces the failure.
    store.acknowledge("42");
    assert_eq!(store.len(), 5);

    *remote.fail_fetch.lock().unwrap() = false;
    *remote.fail_clear.lock().unwrap() = false;
    assert!(store.clear_all().is_ok());
    assert!(store.is_empty());
    assert!(store.error().is_none());
}

/*-------------------------------------------------------------------------------------------------
 *                                        Data Merger
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_merge_seed_wins_and_unlocated_dropped() {
    let seed = SeedDataset::from_messages(vec![
        located("X", "1", 10.0, 10.0, Urgency::High).with_text("seed copy")
    ]);
    let merger = DataMerger::with_seed(seed);

    let live = decode_message_log(
        br#"{"logs": [
            {"source_node": "X", "message_id": "1", "message": "live copy",
             "gps": {"latitude": 20.0, "longitude": 20.0}, "urgency": "LOW"},
            {"source_node": "Y", "message_id": "2",
             "gps": {"latitude": null, "longitude": 5.0}, "urgency": "HIGH"},
            {"source_node": "Z", "message_id": "3",
             "gps": {"latitude": "15.5", "longitude": "16.5"}, "urgency": "MEDIUM"}
        ]}"#,
    )
    .unwrap();
    assert_eq!(live.len(), 3);

    let merged = merger.merge(&live);
    let ids: Vec<(&str, &str)> = merged.iter().map(|m| m.key()).collect();
    assert_eq!(ids, vec![("X", "1"), ("Z", "3")]);
    assert_eq!(merged[0].text(), "seed copy");
}

/*-------------------------------------------------------------------------------------------------
 *                                     Clustering Engine
 *-----------------------------------------------------------------------------------------------*/
#[test]
fn test_map_view_by_zoom() {
    let points = vec![
        located("a", "1", 0.0, 0.0, Urgency::High),
        located("a", "2", 0.0, 0.099, Urgency::Medium),
        located("a", "3", 0.0, 0.1, Urgency::Low),
        located("a", "4", 5.0, 5.0, Urgency::None),
        located("a", "5", 5.001, 5.001, Urgency::None),
    ];

    match MapView::build(points.clone(), 14) {
        MapView::Points(pts) => assert_eq!(pts.len(), 5),
        MapView::Clusters(_) => panic!("zoom 14 should show points"),
    }

    let view = MapView::build(points, 9);
    let clusters = match view {
        MapView::Clusters(ref clusters) => clusters,
        MapView::Points(_) => panic!("zoom 9 should show clusters"),
    };

    let counts: Vec<usize> = clusters.iter().map(|c| c.count()).collect();
    assert_eq!(counts, vec![2, 1, 2]);
    assert_eq!(view.incident_count(), 5);

    // HIGH and MEDIUM tie at one each, HIGH wins.
    assert_eq!(clusters[0].classification(), Classification::Critical);
    assert_eq!(clusters[1].classification(), Classification::Low);
    assert_eq!(clusters[2].classification(), Classification::Info);
}

#[test]
fn test_seed_dir_to_kml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("disaster_logs_high_urgency.json"),
        r#"{"logs": [
            {"source_node": "s", "message_id": "h1", "urgency": "HIGH",
             "gps": {"latitude": 14.60, "longitude": 121.00}},
            {"source_node": "s", "message_id": "h2", "urgency": "HIGH",
             "gps": {"latitude": 14.61, "longitude": 121.01}}
        ]}"#,
    )
    .unwrap();

    let merger = DataMerger::from_seed_dir(dir.path().to_path_buf());
    let live = vec![located("live", "1", 14.605, 121.005, Urgency::Low)];

    let view = MapView::build(merger.merge(&live), 9);
    assert_eq!(view.len(), 1);

    let summary = view.summary();
    assert_eq!(summary.mode, "clusters");
    assert_eq!(summary.items[0].count, 3);
    assert_eq!(summary.items[0].label, "Critical");
    assert_eq!(summary.items[0].color, "#ef4444");

    let kml_path = dir.path().join("map.kml");
    view.save_kml(&kml_path).unwrap();
    let kml = std::fs::read_to_string(&kml_path).unwrap();
    assert!(kml.contains("<name>Critical Zone</name>"));
}
