// Tests module
// Topology: report folding across a small swarm, order independence
// Tracker: connection events driving latency windows end to end

pub mod tracker_lifecycle;
