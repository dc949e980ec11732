// Latency Tracker - Periodic probing of every connected peer
// Principle: One writer, atomic snapshots for readers, nothing happens after destroy

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::window::LatencyWindow;
use super::{
    LatencyProbe, ProbeError, TrackerConfig, TrackerError, MAX_PROBES_IN_FLIGHT_PER_PEER,
};
use crate::types::PeerIdentifier;

/// Latency windows keyed by peer, one entry per connected peer
pub type PeerLatencyMap = HashMap<PeerIdentifier, LatencyWindow>;

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    probes_issued: AtomicU64,
    samples_applied: AtomicU64,
    probe_failures: AtomicU64,
    results_discarded: AtomicU64,
    probes_skipped: AtomicU64,
}

/// Tracker statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Peers with a latency window
    pub tracked_peers: usize,

    /// Probes started since creation
    pub probes_issued: u64,

    /// Samples written into a window
    pub samples_applied: u64,

    /// Probes that failed or timed out
    pub probe_failures: u64,

    /// Successful probes whose peer had left, or that finished after destroy
    pub results_discarded: u64,

    /// Rounds that skipped a peer already at its in-flight limit
    pub probes_skipped: u64,
}

// =============================================================================
// SHARED STATE
// =============================================================================

struct Shared {
    /// Published map; writers swap in a modified copy
    latency: RwLock<Arc<PeerLatencyMap>>,

    /// Set once, under the write lock
    destroyed: AtomicBool,

    counters: Counters,

    /// Running probes per peer
    in_flight: Mutex<HashMap<PeerIdentifier, usize>>,
}

impl Shared {
    fn new(initial: PeerLatencyMap) -> Self {
        Self {
            latency: RwLock::new(Arc::new(initial)),
            destroyed: AtomicBool::new(false),
            counters: Counters::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Claim a probe slot for a peer; false once the peer is at its limit
    fn claim_probe(&self, peer: &PeerIdentifier) -> bool {
        let mut running = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let count = running.entry(peer.clone()).or_insert(0);
        if *count >= MAX_PROBES_IN_FLIGHT_PER_PEER {
            return false;
        }
        *count += 1;
        true
    }

    fn release_probe(&self, peer: &PeerIdentifier) {
        let mut running = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = running.get_mut(peer) {
            *count -= 1;
            if *count == 0 {
                running.remove(peer);
            }
        }
    }

    fn snapshot(&self) -> Arc<PeerLatencyMap> {
        self.latency
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Run a mutation unless the tracker has been destroyed.
    ///
    /// Holding the write lock for the whole closure serializes updates in
    /// completion order; readers holding an older `Arc` keep seeing it intact.
    fn update<R>(&self, f: impl FnOnce(&mut PeerLatencyMap) -> R) -> Option<R> {
        let mut published = self.latency.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_destroyed() {
            return None;
        }
        Some(f(Arc::make_mut(&mut published)))
    }

    fn record_sample(&self, peer: &PeerIdentifier, rtt: Duration) {
        let mut published = self.latency.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_destroyed() || !published.contains_key(peer) {
            self.counters.results_discarded.fetch_add(1, Ordering::Relaxed);
            debug!("Discarding latency sample for {}", peer);
            return;
        }

        if let Some(window) = Arc::make_mut(&mut published).get_mut(peer) {
            window.push_rtt(rtt);
            self.counters.samples_applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a probe about to start; false once destroyed.
    ///
    /// Checked under the read lock, so once `mark_destroyed` returns no new
    /// probe is counted or started.
    fn begin_probe(&self) -> bool {
        let _published = self.latency.read().unwrap_or_else(PoisonError::into_inner);
        if self.is_destroyed() {
            return false;
        }
        self.counters.probes_issued.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn mark_destroyed(&self) -> bool {
        let _published = self.latency.write().unwrap_or_else(PoisonError::into_inner);
        !self.destroyed.swap(true, Ordering::SeqCst)
    }
}

// =============================================================================
// LATENCY TRACKER
// =============================================================================

/// Keeps a rolling latency window for every connected peer.
///
/// Constructed disabled when no probe capability is available: queries then
/// answer "no data" and no poll task runs.
pub struct LatencyTracker {
    /// `None` when disabled
    shared: Option<Arc<Shared>>,

    /// Poll task, taken by `destroy`
    poll_task: Mutex<Option<JoinHandle<()>>>,

    config: TrackerConfig,
}

impl LatencyTracker {
    /// Create a tracker and start polling.
    ///
    /// `connected_peers` are the peers already connected when the tracker is
    /// created; they get empty windows right away. Must be called from within
    /// a tokio runtime unless `probe` is `None`.
    pub fn new(
        probe: Option<Arc<dyn LatencyProbe>>,
        config: TrackerConfig,
        connected_peers: impl IntoIterator<Item = PeerIdentifier>,
    ) -> Result<Self, TrackerError> {
        let Some(probe) = probe else {
            info!("Latency tracker not enabled as no ping capability is configured");
            return Ok(Self::disabled(config));
        };

        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;

        let initial: PeerLatencyMap = connected_peers
            .into_iter()
            .map(|peer| (peer, LatencyWindow::new()))
            .collect();
        let tracked = initial.len();

        let shared = Arc::new(Shared::new(initial));
        let poll_task = runtime.spawn(run_poll_loop(shared.clone(), probe, config));

        info!(
            "Latency tracker started (interval: {:?}, {} peers already connected)",
            config.ping_interval, tracked
        );

        Ok(Self {
            shared: Some(shared),
            poll_task: Mutex::new(Some(poll_task)),
            config,
        })
    }

    /// A tracker without probe capability
    pub fn disabled(config: TrackerConfig) -> Self {
        Self {
            shared: None,
            poll_task: Mutex::new(None),
            config,
        }
    }

    /// Whether a probe capability was provided
    pub fn enabled(&self) -> bool {
        self.shared.is_some()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Ensure a (possibly empty) window exists for the peer
    pub fn on_peer_connect(&self, peer: &PeerIdentifier) {
        let Some(shared) = &self.shared else { return };

        let inserted = shared.update(|map| {
            if map.contains_key(peer) {
                false
            } else {
                map.insert(peer.clone(), LatencyWindow::new());
                true
            }
        });

        if inserted == Some(true) {
            debug!("Tracking latency for peer {}", peer);
        }
    }

    /// Drop the peer's window; called once the last connection to it closed
    pub fn on_peer_disconnect(&self, peer: &PeerIdentifier) {
        let Some(shared) = &self.shared else { return };

        // Check first so an absent peer does not force a copy of the map
        if !shared.snapshot().contains_key(peer) {
            return;
        }
        if shared.update(|map| map.remove(peer)).flatten().is_some() {
            debug!("Stopped tracking latency for peer {}", peer);
        }
    }

    /// Window contents newest first, or `None` if the peer is not tracked
    pub fn get_latency_values(&self, peer: &PeerIdentifier) -> Option<Vec<f64>> {
        let shared = self.shared.as_ref()?;
        shared.snapshot().get(peer).map(LatencyWindow::values)
    }

    /// Consistent view of every window at one point in time
    pub fn snapshot(&self) -> Arc<PeerLatencyMap> {
        match &self.shared {
            Some(shared) => shared.snapshot(),
            None => Arc::new(PeerLatencyMap::new()),
        }
    }

    /// Tracked peers, sorted
    pub fn tracked_peers(&self) -> Vec<PeerIdentifier> {
        let mut peers: Vec<_> = self.snapshot().keys().cloned().collect();
        peers.sort();
        peers
    }

    pub fn stats(&self) -> TrackerStats {
        let Some(shared) = &self.shared else {
            return TrackerStats::default();
        };
        let counters = &shared.counters;

        TrackerStats {
            tracked_peers: shared.snapshot().len(),
            probes_issued: counters.probes_issued.load(Ordering::Relaxed),
            samples_applied: counters.samples_applied.load(Ordering::Relaxed),
            probe_failures: counters.probe_failures.load(Ordering::Relaxed),
            results_discarded: counters.results_discarded.load(Ordering::Relaxed),
            probes_skipped: counters.probes_skipped.load(Ordering::Relaxed),
        }
    }

    /// Whether `destroy` has been called
    pub fn is_destroyed(&self) -> bool {
        self.shared.as_ref().map(|s| s.is_destroyed()).unwrap_or(false)
    }

    /// Stop polling and detach from lifecycle events.
    ///
    /// Idempotent. Once this returns no window changes any more: the poll
    /// task and its in-flight probes are aborted, and a probe that still
    /// completes sees the destroyed flag and is discarded.
    pub fn destroy(&self) {
        let Some(shared) = &self.shared else { return };

        let first = shared.mark_destroyed();

        let handle = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        if first {
            info!("Latency tracker stopped");
        }
    }
}

impl Drop for LatencyTracker {
    fn drop(&mut self) {
        self.destroy();
    }
}

// =============================================================================
// POLL LOOP
// =============================================================================

async fn run_poll_loop(shared: Arc<Shared>, probe: Arc<dyn LatencyProbe>, config: TrackerConfig) {
    let start = tokio::time::Instant::now() + config.ping_interval;
    let mut interval = tokio::time::interval_at(start, config.ping_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Dropping the set (task abort) cancels every in-flight probe
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if shared.is_destroyed() {
                    break;
                }

                let peers: Vec<PeerIdentifier> = shared.snapshot().keys().cloned().collect();
                for peer in peers {
                    // Without a timeout a hung probe would otherwise pile up
                    // a task every round
                    if !shared.claim_probe(&peer) {
                        shared.counters.probes_skipped.fetch_add(1, Ordering::Relaxed);
                        debug!("Too many latency probes to {} still running, skipping", peer);
                        continue;
                    }
                    let slot = ProbeSlot { shared: shared.clone(), peer };
                    in_flight.spawn(probe_peer(slot, probe.clone(), config.probe_timeout));
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!("Latency probe task panicked: {}", e);
                    }
                }
            }
        }
    }

    in_flight.abort_all();
}

/// A claimed probe slot, released when the probe task ends or is aborted
struct ProbeSlot {
    shared: Arc<Shared>,
    peer: PeerIdentifier,
}

impl Drop for ProbeSlot {
    fn drop(&mut self) {
        self.shared.release_probe(&self.peer);
    }
}

async fn probe_peer(slot: ProbeSlot, probe: Arc<dyn LatencyProbe>, timeout: Option<Duration>) {
    let shared = &slot.shared;
    let peer = &slot.peer;

    // A round can be spawned just before destroy(); never start a probe after it
    if !shared.begin_probe() {
        return;
    }

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, probe.probe(peer))
            .await
            .unwrap_or(Err(ProbeError::Timeout(limit))),
        None => probe.probe(peer).await,
    };

    match outcome {
        Ok(rtt) => shared.record_sample(peer, rtt),
        Err(e) => {
            // On error i.e. no pong
            shared.counters.probe_failures.fetch_add(1, Ordering::Relaxed);
            debug!("Latency probe to {} failed: {}", peer, e);
        }
    }
}
