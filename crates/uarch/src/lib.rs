//! Cycle-level out-of-order core model library.
//!
//! This crate implements the execution engine of a simulated CPU core with
//! the following:
//! 1. **Graph:** Per-instruction dependency graphs (actions, effect chains,
//!    edges) allocated from a chained fixed-capacity arena and driven by
//!    explicit satisfy/squash messages.
//! 2. **Instruction:** The per-dynamic-instruction record (operand table,
//!    effect chains, retirement dependences, rename rollback state).
//! 3. **Decode:** AArch64-flavored decode of branch, load/store, and atomic
//!    families into wired records, with an unallocated fallback.
//! 4. **Core:** Reorder buffer, load/store queue, MSHRs, register rename,
//!    in-order retirement, deferred store commit, and youngest-first
//!    squash, connected to the machine through typed bounded ports.
//! 5. **Ambient:** Serde configuration, serialized statistics, and tracing
//!    instrumentation throughout.

/// Common types (addresses, registers, exceptions).
pub mod common;
/// Core sizing configuration.
pub mod config;
/// The out-of-order core and its resource structures.
pub mod core;
/// Instruction decode (family builders and top-level dispatch).
pub mod decode;
/// Dependency-graph primitives (arena, actions, effects).
pub mod graph;
/// Per-instruction record and graph pump.
pub mod insn;
/// Per-core event counters.
pub mod stats;

/// Core sizing; use `CoreConfig::default()` or deserialize from JSON.
pub use crate::config::CoreConfig;
/// The core itself; construct with `OutOfOrderCore::new`.
pub use crate::core::{ExecutionBackend, OutOfOrderCore};
/// Decode entry point.
pub use crate::decode::{decode, FetchedOpcode};
/// The per-instruction state container.
pub use crate::insn::InstructionRecord;
/// Accumulated counters; serialized into run reports.
pub use crate::stats::CoreStats;
