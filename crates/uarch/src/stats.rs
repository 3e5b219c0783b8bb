//! Per-core event counters.

use serde::Serialize;

/// Counters accumulated over a run; serialized into the embedding
/// simulator's report.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CoreStats {
    /// Cycles advanced.
    pub cycles: u64,
    /// Instructions admitted to the reorder buffer.
    pub dispatched: u64,
    /// Instructions retired in program order.
    pub retired: u64,
    /// Instructions committed (externally visible).
    pub committed: u64,
    /// Instructions removed by squashes.
    pub squashed: u64,
    /// Squash events (any cause).
    pub squash_events: u64,
    /// Branches resolved in the graph.
    pub branches_resolved: u64,
    /// Branches resolved against their prediction.
    pub mispredicts: u64,
    /// Load requests issued to the memory hierarchy.
    pub loads_issued: u64,
    /// Loads satisfied from an older in-queue store without a request.
    pub loads_forwarded: u64,
    /// Stores drained to the memory hierarchy at commit.
    pub stores_committed: u64,
    /// Exclusive-store passes that failed their monitor check.
    pub exclusive_failures: u64,
    /// Synchronous exceptions raised at retirement.
    pub exceptions: u64,
    /// Coherence broadcasts answered.
    pub snoops_answered: u64,
}

impl CoreStats {
    /// Retired instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.retired as f64 / self.cycles as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_handles_zero_cycles() {
        let stats = CoreStats::default();
        assert_eq!(stats.ipc(), 0.0);
    }

    #[test]
    fn test_serializes_counter_names() {
        let stats = CoreStats {
            cycles: 10,
            retired: 7,
            ..CoreStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cycles"], 10);
        assert_eq!(json["retired"], 7);
    }
}
