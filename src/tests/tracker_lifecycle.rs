// Tracker Lifecycle - Connection events feeding latency windows end to end
// Ledger events in, windows attached to the local self report out

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PeerscopeConfig;
use crate::latency::{
    LatencyProbe, LatencyTracker, ProbeError, TrackerConfig, LATENCY_WINDOW_CAPACITY,
};
use crate::network::{ConnectionLedger, TransportView};
use crate::topology::{DebugInfo, NodeLabel, TopologyGraph};
use crate::types::{ConnectionDirection, ConnectionRecord, Multiaddr, PeerIdentifier};

const INTERVAL: Duration = Duration::from_millis(100);

fn id(s: &str) -> PeerIdentifier {
    PeerIdentifier::from(s)
}

fn ma(s: &str) -> Multiaddr {
    s.parse().unwrap()
}

/// Fixed round trip per peer; unknown peers never answer
struct StaticProbe {
    rtts: HashMap<PeerIdentifier, u64>,
}

#[async_trait]
impl LatencyProbe for StaticProbe {
    async fn probe(&self, peer: &PeerIdentifier) -> Result<Duration, ProbeError> {
        self.rtts
            .get(peer)
            .map(|ms| Duration::from_millis(*ms))
            .ok_or_else(|| ProbeError::NoPong(format!("{} is silent", peer)))
    }
}

fn probe() -> Arc<StaticProbe> {
    Arc::new(StaticProbe {
        rtts: [(id("QmRelay"), 30), (id("QmPeer"), 80)].into_iter().collect(),
    })
}

fn open(ledger: &mut ConnectionLedger, tracker: &LatencyTracker, conn: &str, peer: &str, addr: &str) {
    let record = ConnectionRecord::new(conn, id(peer), ma(addr), ConnectionDirection::Outbound);
    if let Some(event) = ledger.connection_opened(record) {
        event.apply_to(tracker);
    }
}

fn close(ledger: &mut ConnectionLedger, tracker: &LatencyTracker, conn: &str) {
    if let Some(event) = ledger.connection_closed(conn) {
        event.apply_to(tracker);
    }
}

#[tokio::test(start_paused = true)]
async fn test_connection_events_drive_windows() {
    let mut ledger = ConnectionLedger::new(id("QmSelf"), vec![ma("/ip4/0.0.0.0/tcp/4001")]);
    let tracker = LatencyTracker::new(
        Some(probe()),
        PeerscopeConfig::default().with_ping_interval_ms(100).with_probe_timeout_ms(Some(50)).tracker_config(),
        ledger.connected_peers(),
    )
    .unwrap();

    open(&mut ledger, &tracker, "c1", "QmRelay", "/ip4/5.6.7.8/tcp/4001");
    open(&mut ledger, &tracker, "c2", "QmPeer", "/ip4/5.6.7.8/tcp/4001/p2p/QmRelay/p2p-circuit/p2p/QmPeer");
    open(&mut ledger, &tracker, "c3", "QmPeer", "/ip4/9.9.9.9/tcp/4001");
    assert_eq!(tracker.tracked_peers(), vec![id("QmPeer"), id("QmRelay")]);

    tokio::time::sleep(INTERVAL * 2 + INTERVAL / 2).await;
    assert_eq!(tracker.get_latency_values(&id("QmRelay")), Some(vec![30.0, 30.0]));
    assert_eq!(tracker.get_latency_values(&id("QmPeer")), Some(vec![80.0, 80.0]));

    // One of two connections closing keeps the peer tracked
    close(&mut ledger, &tracker, "c3");
    assert!(tracker.get_latency_values(&id("QmPeer")).is_some());
    close(&mut ledger, &tracker, "c2");
    assert_eq!(tracker.get_latency_values(&id("QmPeer")), None);

    // Reconnecting starts an empty window
    open(&mut ledger, &tracker, "c4", "QmPeer", "/ip4/9.9.9.9/tcp/4001");
    assert_eq!(tracker.get_latency_values(&id("QmPeer")), Some(vec![]));

    tracker.destroy();
}

#[tokio::test(start_paused = true)]
async fn test_window_stays_capped_over_long_run() {
    let mut ledger = ConnectionLedger::new(id("QmSelf"), vec![]);
    let tracker = LatencyTracker::new(Some(probe()), TrackerConfig::with_interval(INTERVAL), Vec::new()).unwrap();

    open(&mut ledger, &tracker, "c1", "QmRelay", "/ip4/5.6.7.8/tcp/4001");
    tokio::time::sleep(INTERVAL * 20 + INTERVAL / 2).await;

    let values = tracker.get_latency_values(&id("QmRelay")).unwrap();
    assert_eq!(values.len(), LATENCY_WINDOW_CAPACITY);
    assert_eq!(tracker.stats().samples_applied, 20);
}

#[tokio::test(start_paused = true)]
async fn test_silent_peer_keeps_empty_window() {
    let mut ledger = ConnectionLedger::new(id("QmSelf"), vec![]);
    let tracker = LatencyTracker::new(Some(probe()), TrackerConfig::with_interval(INTERVAL), Vec::new()).unwrap();

    open(&mut ledger, &tracker, "c1", "QmSilent", "/ip4/1.1.1.1/tcp/1");
    tokio::time::sleep(INTERVAL * 3 + INTERVAL / 2).await;

    assert_eq!(tracker.get_latency_values(&id("QmSilent")), Some(vec![]));
    assert_eq!(tracker.stats().probe_failures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_self_report_carries_latency_into_graph() {
    let relay = ma("/ip4/5.6.7.8/tcp/4001");
    let mut ledger = ConnectionLedger::new(id("QmSelf"), vec![ma("/ip4/0.0.0.0/tcp/4001")]);
    let tracker = LatencyTracker::new(Some(probe()), TrackerConfig::with_interval(INTERVAL), Vec::new()).unwrap();

    open(&mut ledger, &tracker, "c1", "QmRelay", "/ip4/5.6.7.8/tcp/4001");
    tokio::time::sleep(INTERVAL + INTERVAL / 2).await;

    let report = DebugInfo::collect(&ledger, Some(&relay), Some(&tracker)).unwrap();
    assert_eq!(report.conn_info[0].latency, vec![30.0]);
    assert_eq!(report.self_info.primary_relay_multiaddr, Some(relay.clone()));

    let graph = TopologyGraph::from_reports(&id("QmSelf"), [&report], Some(&relay));
    assert_eq!(graph.node(&id("QmRelay")).unwrap().label, NodeLabel::RelayPrimary);
    assert_eq!(graph.node(&id("QmSelf")).unwrap().label, NodeLabel::SelfNode);
}

#[tokio::test(start_paused = true)]
async fn test_destroyed_tracker_ignores_events() {
    let mut ledger = ConnectionLedger::new(id("QmSelf"), vec![]);
    let tracker = LatencyTracker::new(Some(probe()), TrackerConfig::with_interval(INTERVAL), Vec::new()).unwrap();

    open(&mut ledger, &tracker, "c1", "QmRelay", "/ip4/5.6.7.8/tcp/4001");
    tokio::time::sleep(INTERVAL + INTERVAL / 2).await;
    tracker.destroy();
    tracker.destroy();

    let before = tracker.snapshot();
    open(&mut ledger, &tracker, "c2", "QmPeer", "/ip4/9.9.9.9/tcp/4001");
    close(&mut ledger, &tracker, "c1");
    tokio::time::sleep(INTERVAL * 3).await;

    assert_eq!(*tracker.snapshot(), *before);
    assert_eq!(tracker.get_latency_values(&id("QmPeer")), None);
}
