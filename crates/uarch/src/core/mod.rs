//! The out-of-order core: admission, cycle advance, retirement, commit,
//! and squash over the per-instruction dependency graphs.
//!
//! The core owns the resource structures (reorder buffer, load/store queue,
//! MSHRs, rename table) and interprets the effect chains the decoder wired
//! into each record. Communication with the rest of the simulated machine
//! goes through typed bounded ports:
//! 1. Egress memory requests, snoop replies, and translation requests.
//! 2. Ingress memory messages and translation replies, pushed by the
//!    embedder.
//! 3. One-shot control notifications (redirects, squash causes, branch
//!    feedback, store-forwarding hits) polled by the front end after each
//!    cycle.
//!
//! Architectural register values live in an external [`ExecutionBackend`];
//! the core models timing, ordering, and speculation, not arithmetic.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::common::error::Exception;
use crate::common::reg::LogReg;
use crate::common::{PhysAddr, VirtAddr};
use crate::config::CoreConfig;
use crate::graph::effect::{EffectKind, Event};
use crate::graph::{GraphMsg, Outcome};
use crate::insn::class::{AccessClass, AccessSize};
use crate::insn::operand::OperandCode;
use crate::insn::{InsnState, InstructionRecord, RetireConstraint};
use crate::stats::CoreStats;

/// Load/store queue.
pub mod lsq;

/// Port message types.
pub mod msg;

/// Miss-status holding registers.
pub mod mshr;

/// Typed bounded ports.
pub mod ports;

/// Register rename.
pub mod rename;

/// Reorder buffer.
pub mod rob;

use lsq::{LoadStoreQueue, LsqEntry, LsqKind};
use msg::{
    BranchFeedback, ControlNotifications, MemoryMessage, MemoryRequest, MemoryRequestKind,
    SnoopReply, SquashCause, StoreForward, TransactionId, TranslationReply, TranslationRequest,
};
use mshr::MshrTable;
use ports::PortQueue;
use rename::{RenameTable, Waiter};
use rob::ReorderBuffer;

/// Source of architectural register state.
///
/// The functional model lives outside this crate; the core asks it for
/// values that are not covered by an in-flight rename mapping.
pub trait ExecutionBackend {
    /// Architectural value of a logical register.
    fn read_register(&mut self, core: usize, reg: LogReg) -> u64;

    /// Architectural NZCV flags (N=bit3 .. V=bit0).
    fn condition_flags(&mut self, core: usize) -> u8;
}

/// One simulated out-of-order core.
pub struct OutOfOrderCore {
    index: usize,
    config: CoreConfig,
    stats: CoreStats,

    rob: ReorderBuffer,
    /// Retired memory instructions awaiting commit, oldest first.
    srb: VecDeque<InstructionRecord>,
    lsq: LoadStoreQueue,
    mshr: MshrTable,
    rename: RenameTable,
    backend: Box<dyn ExecutionBackend>,

    memory_out: PortQueue<MemoryRequest>,
    snoop_out: PortQueue<SnoopReply>,
    translation_out: PortQueue<TranslationRequest>,
    notifications: ControlNotifications,

    /// Entries whose effective address is known but whose translation
    /// request has not yet fit on the port.
    pending_translations: VecDeque<u64>,
    /// Armed exclusive-monitor block, if any.
    exclusive_monitor: Option<PhysAddr>,
    next_transaction: u64,
}

/// Outcome of the store-forwarding scan for one load.
enum Forward {
    /// An older same-address store supplies the value.
    Hit {
        /// The supplying store.
        store_seq: u64,
        /// Store data masked to the load's width.
        value: u64,
    },
    /// An older overlapping write exists but cannot supply the value.
    Blocked,
    /// No older overlapping write is known.
    Miss,
}

impl OutOfOrderCore {
    /// Creates a core with the given sizing and functional backend.
    pub fn new(index: usize, config: CoreConfig, backend: Box<dyn ExecutionBackend>) -> Self {
        config.validate();
        Self {
            index,
            rob: ReorderBuffer::new(config.rob_entries),
            srb: VecDeque::new(),
            lsq: LoadStoreQueue::new(config.lsq_entries),
            mshr: MshrTable::new(config.mshr_entries),
            rename: RenameTable::new(config.phys_regs),
            backend,
            memory_out: PortQueue::new(config.memory_port_depth),
            snoop_out: PortQueue::new(config.snoop_port_depth),
            translation_out: PortQueue::new(config.translation_port_depth),
            notifications: ControlNotifications::default(),
            pending_translations: VecDeque::new(),
            exclusive_monitor: None,
            next_transaction: 0,
            stats: CoreStats::default(),
            config,
        }
    }

    /// This core's index in the simulated machine.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Accumulated counters.
    pub fn stats(&self) -> &CoreStats {
        &self.stats
    }

    /// The sizing this core was built with.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Instructions that can still be admitted this cycle.
    ///
    /// Conservative: every admission is assumed to need a load/store-queue
    /// entry and a physical register.
    pub fn available_slots(&self) -> usize {
        self.rob
            .available()
            .min(self.lsq.available())
            .min(self.rename.available())
    }

    /// True when admission is blocked on a full resource.
    pub fn is_stalled(&self) -> bool {
        self.available_slots() == 0
    }

    /// True when nothing is in flight anywhere in the core.
    pub fn is_quiesced(&self) -> bool {
        self.rob.is_empty()
            && self.srb.is_empty()
            && self.lsq.is_empty()
            && self.mshr.is_empty()
            && self.pending_translations.is_empty()
    }

    /// Takes the pending one-shot control notifications.
    pub fn take_notifications(&mut self) -> ControlNotifications {
        self.notifications.take()
    }

    /// Pulls the next egress memory request, if any.
    pub fn pull_memory_request(&mut self) -> Option<MemoryRequest> {
        self.memory_out.try_pull()
    }

    /// Pulls the next egress snoop reply, if any.
    pub fn pull_snoop_reply(&mut self) -> Option<SnoopReply> {
        self.snoop_out.try_pull()
    }

    /// Pulls the next egress translation request, if any.
    pub fn pull_translation_request(&mut self) -> Option<TranslationRequest> {
        self.translation_out.try_pull()
    }

    /// Admits one decoded instruction.
    ///
    /// # Panics
    ///
    /// Admission without a free slot is a front-end defect; callers gate on
    /// [`Self::available_slots`].
    pub fn dispatch(&mut self, mut record: InstructionRecord) {
        assert!(
            self.available_slots() > 0,
            "dispatch into a full core (seq {})",
            record.seq()
        );
        debug!(
            core = self.index,
            seq = record.seq(),
            pc = format_args!("{:#x}", record.pc()),
            class = ?record.class(),
            "dispatch"
        );
        record.set_state(InsnState::Dispatched);
        self.stats.dispatched += 1;

        if record.reads_flags() {
            let flags = self.backend.condition_flags(self.index);
            record.set_operand(OperandCode::CondFlags, u64::from(flags));
        }
        // Sources resolve against pre-instruction rename state, before the
        // dispatch chain maps the destination; an instruction whose source
        // register is also its destination must read the older value.
        self.resolve_sources(&mut record);
        self.run_dispatch_chain(&mut record);
        record.launch();
        record.set_state(InsnState::Executing);

        let seq = record.seq();
        self.rob.push(record);
        let mut pending = VecDeque::from([seq]);
        self.drain_graphs(&mut pending);
    }

    /// Advances the core by one cycle.
    pub fn cycle(&mut self) {
        self.stats.cycles += 1;
        self.issue_translations();
        self.issue_memory();
        self.retire();
        self.commit();
    }

    /// Delivers one ingress message from the memory hierarchy.
    pub fn push_memory_message(&mut self, message: MemoryMessage) {
        match message {
            MemoryMessage::LoadReply { transaction, value } => {
                self.complete_fill(transaction, value, None);
            }
            MemoryMessage::AtomicReply {
                transaction,
                old_value,
                success,
            } => self.complete_fill(transaction, old_value, Some(success)),
            MemoryMessage::StoreAck { transaction } => {
                trace!(core = self.index, ?transaction, "store acknowledged");
            }
            MemoryMessage::Invalidate { paddr } => {
                self.clear_monitor_if_hit(paddr);
                self.answer_snoop(SnoopReply::InvalidateAck { paddr });
            }
            MemoryMessage::Downgrade { paddr } => {
                self.answer_snoop(SnoopReply::DowngradeAck { paddr });
            }
            MemoryMessage::Probe { paddr } => {
                self.answer_snoop(SnoopReply::ProbeMiss { paddr });
            }
            MemoryMessage::ReturnRequest { paddr } => {
                self.answer_snoop(SnoopReply::ReturnReply { paddr, data: None });
            }
        }
    }

    /// Delivers one address-translation reply.
    pub fn push_translation_reply(&mut self, reply: TranslationReply) {
        let seq = reply.transaction.0;
        let Some(entry) = self.lsq.get_mut(seq) else {
            // The owner was squashed while the request was in flight.
            return;
        };
        match reply.result {
            Ok(paddr) => {
                entry.paddr = Some(paddr);
                trace!(core = self.index, seq, paddr = format_args!("{:#x}", paddr.0), "translated");
            }
            Err(fault) => {
                entry.fault = Some(fault);
                warn!(core = self.index, seq, %fault, "translation fault recorded");
                // The value will never arrive; the owner's annulment chain
                // cancels its consumers so the record reaches its trap
                // check instead of waiting.
                self.run_annulment_chain(seq);
            }
        }
    }

    /// Rolls back every instruction younger than `seq` (and `seq` itself
    /// when `inclusive`), youngest first.
    pub fn squash_from(&mut self, seq: u64, inclusive: bool, cause: SquashCause) {
        debug!(core = self.index, seq, inclusive, ?cause, "squash");
        self.stats.squash_events += 1;
        self.notifications.squash = Some(cause);

        loop {
            let Some(back) = self.rob.back() else { break };
            let bseq = back.seq();
            if bseq < seq || (!inclusive && bseq == seq) {
                break;
            }
            let Some(mut record) = self.rob.pop_back() else { break };
            for kind in record.effects(Event::Squash) {
                match kind {
                    EffectKind::UnmapDestination => {
                        if let (Some(dest), Some(undo)) =
                            (record.destination(), record.rename_undo())
                        {
                            self.rename.unmap(dest, undo.allocated, undo.previous);
                        }
                    }
                    EffectKind::EraseLsq => {
                        let _ = self.lsq.erase(bseq);
                    }
                    other => panic!("effect {other:?} is not valid at squash"),
                }
            }
            self.rename.remove_waiters_of(bseq);
            self.mshr.remove_waiter(bseq);
            self.pending_translations.retain(|&s| s != bseq);
            record.set_state(InsnState::Squashed);
            self.stats.squashed += 1;
            trace!(core = self.index, seq = bseq, "squashed");
            // The record drops here; its whole graph arena is reclaimed.
        }
    }

    fn next_tid(&mut self) -> TransactionId {
        self.next_transaction += 1;
        TransactionId(self.next_transaction)
    }

    /// Interprets the dispatch effect chain against core state.
    fn run_dispatch_chain(&mut self, record: &mut InstructionRecord) {
        let seq = record.seq();
        for kind in record.effects(Event::Dispatch) {
            match kind {
                EffectKind::MapDestination => {
                    let Some(dest) = record.destination() else {
                        panic!("MapDestination on seq {seq} with no destination")
                    };
                    let (allocated, previous) = self.rename.map_destination(dest);
                    record.set_rename_undo(crate::insn::RenameUndo {
                        allocated,
                        previous,
                    });
                }
                EffectKind::Branch(target) => {
                    // Speculative front-end redirect when the prediction
                    // disagrees with the decoded target. The redirect becomes
                    // the effective prediction: fetch now runs down the
                    // decoded path, so retirement must confirm it rather
                    // than squash the instructions behind it.
                    if record.predicted_target() != Some(target) {
                        self.notifications.redirect = Some(target);
                        record.set_predicted_target(target);
                    }
                }
                EffectKind::Satisfy(edge) => record.post(GraphMsg::Satisfy(edge)),
                EffectKind::SquashEdge(edge) => record.post(GraphMsg::Squash(edge)),
                EffectKind::AllocateLoad { size, class, dep } => {
                    let mut entry = LsqEntry::new(seq, LsqKind::Load, size, class);
                    entry.value_dep = Some(dep);
                    self.lsq.allocate(entry);
                }
                EffectKind::AllocateStore { size, class } => {
                    self.lsq.allocate(LsqEntry::new(seq, LsqKind::Store, size, class));
                }
                EffectKind::AllocateRmw { size, dep } => {
                    let mut entry = LsqEntry::new(
                        seq,
                        LsqKind::Rmw,
                        size,
                        crate::insn::class::AccessClass::Atomic,
                    );
                    entry.value_dep = Some(dep);
                    self.lsq.allocate(entry);
                }
                EffectKind::AllocateCas { size, dep } => {
                    let mut entry = LsqEntry::new(
                        seq,
                        LsqKind::Cas,
                        size,
                        crate::insn::class::AccessClass::Atomic,
                    );
                    entry.value_dep = Some(dep);
                    self.lsq.allocate(entry);
                }
                other => panic!("effect {other:?} is not valid at dispatch"),
            }
        }
    }

    /// Resolves source-register reads through rename or the backend.
    fn resolve_sources(&mut self, record: &mut InstructionRecord) {
        for read in record.source_reads() {
            match self.rename.lookup(read.reg) {
                Some(phys) => match self.rename.read(phys) {
                    Some(value) => {
                        record.set_operand(read.code, value);
                        record.post(GraphMsg::Satisfy(read.edge));
                    }
                    None => self.rename.add_waiter(
                        phys,
                        Waiter {
                            seq: record.seq(),
                            edge: read.edge,
                            code: read.code,
                        },
                    ),
                },
                None => {
                    let value = self.backend.read_register(self.index, read.reg);
                    record.set_operand(read.code, value);
                    record.post(GraphMsg::Satisfy(read.edge));
                }
            }
        }
    }

    /// Drains graph worklists across records, following cross-instruction
    /// wakeups until no more progress is possible.
    fn drain_graphs(&mut self, pending: &mut VecDeque<u64>) {
        while let Some(seq) = pending.pop_front() {
            let outcomes = match self.rob.find_mut(seq) {
                Some(record) => record.pump(),
                None => continue,
            };
            for outcome in outcomes {
                self.apply_outcome(seq, outcome, pending);
            }
        }
    }

    fn apply_outcome(&mut self, seq: u64, outcome: Outcome, pending: &mut VecDeque<u64>) {
        match outcome {
            Outcome::ValueProduced {
                code: OperandCode::Result,
                value,
            } => {
                let undo = self.rob.find(seq).and_then(InstructionRecord::rename_undo);
                if let Some(undo) = undo {
                    self.publish(undo.allocated, value, pending);
                }
            }
            Outcome::ValueProduced {
                code: OperandCode::StoreValue,
                value,
            } => {
                if let Some(entry) = self.lsq.get_mut(seq) {
                    entry.data = Some(value);
                }
            }
            Outcome::ValueProduced {
                code: OperandCode::Operand3,
                value,
            } => {
                // Compare value of a compare-and-swap.
                if let Some(entry) = self.lsq.get_mut(seq) {
                    if entry.kind == LsqKind::Cas {
                        entry.compare = Some(value);
                    }
                }
            }
            Outcome::ValueProduced { .. } => {}
            Outcome::AddressReady(vaddr) => {
                if let Some(entry) = self.lsq.get_mut(seq) {
                    entry.vaddr = Some(vaddr);
                    self.pending_translations.push_back(seq);
                }
            }
            Outcome::BranchResolved { taken } => {
                trace!(core = self.index, seq, taken, "branch resolved");
                self.stats.branches_resolved += 1;
            }
        }
    }

    /// Publishes a produced physical-register value and wakes waiters.
    fn publish(&mut self, phys: crate::common::reg::PhysReg, value: u64, pending: &mut VecDeque<u64>) {
        for waiter in self.rename.write(phys, value) {
            if let Some(record) = self.rob.find_mut(waiter.seq) {
                record.set_operand(waiter.code, value);
                record.post(GraphMsg::Satisfy(waiter.edge));
                pending.push_back(waiter.seq);
            }
        }
    }

    /// Sends queued translation requests while the port has room.
    fn issue_translations(&mut self) {
        while self.translation_out.has_room() {
            let Some(seq) = self.pending_translations.pop_front() else {
                break;
            };
            let Some(entry) = self.lsq.get(seq) else { continue };
            let Some(vaddr) = entry.vaddr else { continue };
            self.translation_out.push(TranslationRequest {
                transaction: TransactionId(seq),
                vaddr,
            });
        }
    }

    /// Issues translated loads (and non-speculative atomics) to memory.
    fn issue_memory(&mut self) {
        let oldest_seq = self.rob.front().map(InstructionRecord::seq);
        let candidates: Vec<u64> = self
            .lsq
            .iter()
            .filter(|e| {
                if e.issued || e.fault.is_some() || e.paddr.is_none() {
                    return false;
                }
                match e.kind {
                    LsqKind::Load => true,
                    // Atomics perform their write at the memory system, so
                    // they issue only once they are the oldest instruction
                    // and their outgoing data is staged.
                    LsqKind::Rmw => oldest_seq == Some(e.seq) && e.data.is_some(),
                    LsqKind::Cas => {
                        oldest_seq == Some(e.seq) && e.data.is_some() && e.compare.is_some()
                    }
                    LsqKind::Store => false,
                }
            })
            .map(|e| e.seq)
            .collect();

        for seq in candidates {
            let Some(entry) = self.lsq.get(seq) else { continue };
            let Some(paddr) = entry.paddr else { continue };
            let block = paddr.block_base(self.config.block_size);
            let kind = entry.kind;
            let size = entry.size;
            let class = entry.class;

            if kind == LsqKind::Load {
                match self.forward_source(seq, paddr, size, class) {
                    Forward::Hit { store_seq, value } => {
                        let mut dep = None;
                        if let Some(entry) = self.lsq.get_mut(seq) {
                            entry.issued = true;
                            entry.complete = true;
                            dep = entry.value_dep;
                        }
                        if let Some(record) = self.rob.find_mut(seq) {
                            record.set_operand(OperandCode::MemValue, value);
                            if let Some(dep) = dep {
                                record.post(GraphMsg::Satisfy(dep));
                            }
                        }
                        let mut pending = VecDeque::from([seq]);
                        self.drain_graphs(&mut pending);
                        self.stats.loads_forwarded += 1;
                        self.notifications.forwards.push(StoreForward {
                            load_seq: seq,
                            store_seq,
                            paddr,
                        });
                        trace!(core = self.index, seq, store_seq, "load forwarded from store");
                        continue;
                    }
                    Forward::Blocked => continue,
                    Forward::Miss => {}
                }
                if let Some(outstanding) = self.mshr.get(block) {
                    // Share the outstanding fill.
                    let transaction = outstanding.transaction;
                    self.mshr.add_waiter(block, seq);
                    if let Some(entry) = self.lsq.get_mut(seq) {
                        entry.issued = true;
                        entry.transaction = Some(transaction);
                    }
                    continue;
                }
            } else if self.mshr.get(block).is_some() {
                // Atomics never piggyback; wait for the block to settle.
                continue;
            }

            if !self.mshr.available() || !self.memory_out.has_room() {
                break;
            }
            let tid = self.next_tid();
            self.mshr.allocate(block, tid, seq);
            let Some(entry) = self.lsq.get_mut(seq) else { continue };
            entry.issued = true;
            entry.transaction = Some(tid);
            let request = MemoryRequest {
                transaction: tid,
                kind: match kind {
                    LsqKind::Load => MemoryRequestKind::Load,
                    LsqKind::Rmw => MemoryRequestKind::Rmw,
                    LsqKind::Cas => MemoryRequestKind::Cas,
                    LsqKind::Store => unreachable!("stores issue at commit"),
                },
                paddr,
                size: entry.size,
                data: entry.data,
                compare: entry.compare,
            };
            self.memory_out.push(request);
            if kind == LsqKind::Load {
                self.stats.loads_issued += 1;
            }
            trace!(core = self.index, seq, ?tid, "memory request issued");
        }
    }

    /// Scans older queue entries for a write overlapping a load at `paddr`.
    ///
    /// The youngest older writer decides: an exact-address store whose data
    /// is staged forwards its value; any other overlap holds the load until
    /// the writer drains. Older writes whose address is still unresolved are
    /// ignored and the load issues speculatively. Exclusive loads always
    /// observe the memory system so the monitor is armed against a real
    /// fill.
    fn forward_source(
        &self,
        seq: u64,
        paddr: PhysAddr,
        size: AccessSize,
        class: AccessClass,
    ) -> Forward {
        if class == AccessClass::Atomic {
            return Forward::Miss;
        }
        let lo = paddr.0;
        let hi = lo + size.bytes();
        let mut found = Forward::Miss;
        for entry in self.lsq.iter() {
            if entry.seq >= seq {
                break;
            }
            if !entry.writes_memory() || entry.dropped {
                continue;
            }
            let Some(store_paddr) = entry.paddr else {
                continue;
            };
            let store_lo = store_paddr.0;
            let store_hi = store_lo + entry.size.bytes();
            if store_hi <= lo || hi <= store_lo {
                continue;
            }
            let covers = entry.kind == LsqKind::Store && store_lo == lo && store_hi >= hi;
            found = match entry.data {
                Some(data) if covers => {
                    let bits = size.bytes() * 8;
                    let value = if bits == 64 { data } else { data & ((1 << bits) - 1) };
                    Forward::Hit {
                        store_seq: entry.seq,
                        value,
                    }
                }
                _ => Forward::Blocked,
            };
        }
        found
    }

    /// Routes a fill or atomic reply to every waiting instruction.
    fn complete_fill(&mut self, transaction: TransactionId, value: u64, atomic_success: Option<bool>) {
        let Some(block) = self.mshr.find_transaction(transaction) else {
            // Every waiter was squashed and the fill has no home.
            trace!(core = self.index, ?transaction, "orphan fill dropped");
            return;
        };
        let waiters = self.mshr.release(block);
        let mut pending = VecDeque::new();
        for seq in waiters {
            let Some(entry) = self.lsq.get_mut(seq) else { continue };
            entry.complete = true;
            entry.transaction = None;
            let dep = entry.value_dep;
            let Some(record) = self.rob.find_mut(seq) else { continue };
            record.set_operand(OperandCode::MemValue, value);
            if let Some(dep) = dep {
                record.post(GraphMsg::Satisfy(dep));
            }
            if atomic_success.is_some() {
                // Memory-order speculation resolved; the atomic may commit.
                record.set_may_commit(true);
            }
            pending.push_back(seq);
        }
        self.drain_graphs(&mut pending);
        if let Some(success) = atomic_success {
            trace!(core = self.index, ?transaction, success, "atomic reply");
        }
    }

    /// Retires from the head of the reorder buffer, in program order.
    fn retire(&mut self) {
        let mut retired = 0;
        while retired < self.config.retire_width {
            let Some(front) = self.rob.front() else { break };
            let seq = front.seq();

            if front.retirement_squashed() {
                // The record's own graph abandoned a retirement dependence;
                // raise the recorded trap if there is one, else resync.
                let pc = front.pc();
                if let Some(exception) = self.check_trap(seq) {
                    self.raise(seq, pc, exception);
                } else {
                    self.squash_from(seq, true, SquashCause::Resync);
                    self.notifications.redirect = Some(VirtAddr(pc));
                }
                break;
            }
            let pc = front.pc();
            if !front.retirement_ready() || !self.constraints_met(front) {
                break;
            }
            if let Some(exception) = self.check_trap(seq) {
                self.raise(seq, pc, exception);
                break;
            }

            let Some(mut record) = self.rob.pop_front() else { break };
            self.run_retirement_chain(&mut record);
            record.set_state(InsnState::Retired);
            self.stats.retired += 1;
            retired += 1;
            trace!(core = self.index, seq, "retired");

            if record.effects(Event::Commit).is_empty() {
                record.set_state(InsnState::Committed);
                self.stats.committed += 1;
            } else {
                self.srb.push_back(record);
            }
        }
    }

    /// Evaluates the head instruction's retirement constraints.
    fn constraints_met(&self, record: &InstructionRecord) -> bool {
        let seq = record.seq();
        record.retirement_constraints().iter().all(|c| match c {
            // A recorded fault satisfies any memory constraint; the trap
            // check will raise it instead of retiring.
            RetireConstraint::LoadComplete => self
                .lsq
                .get(seq)
                .is_none_or(|e| e.complete || e.fault.is_some()),
            RetireConstraint::StoreQueueReady => self
                .lsq
                .get(seq)
                .is_none_or(|e| e.store_ready() || e.fault.is_some()),
        })
    }

    /// Runs a record's annulment chain: the access will never deliver its
    /// value, so the consumers wired to it are cancelled.
    fn run_annulment_chain(&mut self, seq: u64) {
        let Some(record) = self.rob.find_mut(seq) else {
            return;
        };
        for kind in record.effects(Event::Annulment) {
            match kind {
                EffectKind::SquashEdge(edge) => record.post(GraphMsg::Squash(edge)),
                other => panic!("effect {other:?} is not valid at annulment"),
            }
        }
        let mut pending = VecDeque::from([seq]);
        self.drain_graphs(&mut pending);
    }

    /// Runs the head instruction's trap-check chain.
    fn check_trap(&mut self, seq: u64) -> Option<Exception> {
        let effects = self.rob.find(seq)?.effects(Event::CheckTrap);
        for kind in effects {
            match kind {
                EffectKind::TranslationCheck => {
                    if let Some(fault) = self.lsq.get(seq).and_then(|e| e.fault) {
                        return Some(fault);
                    }
                }
                EffectKind::RaiseException(exception) => return Some(exception),
                other => panic!("effect {other:?} is not valid at trap check"),
            }
        }
        None
    }

    /// Raises a synchronous exception at the head: squash inclusive and
    /// redirect the front end to resynchronize.
    fn raise(&mut self, seq: u64, pc: u64, exception: Exception) {
        warn!(core = self.index, seq, pc = format_args!("{pc:#x}"), %exception, "exception");
        self.stats.exceptions += 1;
        self.squash_from(seq, true, SquashCause::Exception);
        self.notifications.redirect = Some(VirtAddr(pc));
    }

    /// Interprets the retirement effect chain of an instruction just popped
    /// from the reorder-buffer head.
    fn run_retirement_chain(&mut self, record: &mut InstructionRecord) {
        let seq = record.seq();
        for kind in record.effects(Event::Retirement) {
            match kind {
                EffectKind::UpdateUnconditional(target) | EffectKind::UpdateCall(target) => {
                    self.confirm_branch(record, target, true);
                }
                EffectKind::UpdateConditional(target) => {
                    let taken = record.operand_or(OperandCode::Condition, 0) != 0;
                    let resolved = if taken {
                        target
                    } else {
                        VirtAddr(record.pc().wrapping_add(4))
                    };
                    self.confirm_branch(record, resolved, taken);
                }
                EffectKind::BranchToComputedAddress => {
                    let target = VirtAddr(record.operand(OperandCode::Address));
                    self.confirm_branch(record, target, true);
                }
                EffectKind::FreeMapping => {
                    if let Some(prev) = record.rename_undo().and_then(|u| u.previous) {
                        self.rename.free(prev);
                    }
                }
                EffectKind::RetireMem => {
                    if let Some(entry) = self.lsq.get_mut(seq) {
                        entry.retired = true;
                    }
                }
                EffectKind::MarkExclusive { .. } => {
                    if let Some(paddr) = self.lsq.get(seq).and_then(|e| e.paddr) {
                        self.exclusive_monitor =
                            Some(paddr.block_base(self.config.block_size));
                    }
                }
                EffectKind::ExclusivePass { .. } => self.exclusive_pass(record),
                other => panic!("effect {other:?} is not valid at retirement"),
            }
        }
    }

    /// Confirms a resolved branch against its prediction, squashing and
    /// redirecting on a mispredict.
    fn confirm_branch(&mut self, record: &InstructionRecord, target: VirtAddr, taken: bool) {
        let mispredicted = match (taken, record.predicted_target()) {
            (true, Some(predicted)) => predicted != target,
            (true, None) => true,
            (false, Some(_)) => true,
            (false, None) => false,
        };
        self.notifications.feedback.push(BranchFeedback {
            pc: VirtAddr(record.pc()),
            target,
            taken,
            mispredicted,
        });
        if mispredicted {
            debug!(
                core = self.index,
                seq = record.seq(),
                target = format_args!("{:#x}", target.0),
                "mispredict"
            );
            self.stats.mispredicts += 1;
            self.squash_from(record.seq(), false, SquashCause::Mispredict);
            self.notifications.redirect = Some(target);
        }
    }

    /// Checks a store-exclusive against the monitor, publishing the status
    /// result and dropping the store on failure.
    fn exclusive_pass(&mut self, record: &mut InstructionRecord) {
        let seq = record.seq();
        let block = self
            .lsq
            .get(seq)
            .and_then(|e| e.paddr)
            .map(|p| p.block_base(self.config.block_size));
        let success = block.is_some() && self.exclusive_monitor == block;
        if !success {
            self.stats.exclusive_failures += 1;
            if let Some(entry) = self.lsq.get_mut(seq) {
                entry.dropped = true;
            }
        }
        // Status convention: 0 on success, 1 on failure.
        let status = u64::from(!success);
        record.set_operand(OperandCode::Result, status);
        if let Some(undo) = record.rename_undo() {
            let mut pending = VecDeque::new();
            self.publish(undo.allocated, status, &mut pending);
            self.drain_graphs(&mut pending);
        }
        // The store-exclusive's speculation is resolved either way.
        record.set_may_commit(true);
    }

    /// Commits retired memory instructions from the front of the retired
    /// buffer, draining stores to the memory port.
    fn commit(&mut self) {
        let mut committed = 0;
        while committed < self.config.commit_width {
            let Some(front) = self.srb.front() else { break };
            if !front.may_commit() {
                break;
            }
            let seq = front.seq();
            let needs_port = front
                .effects(Event::Commit)
                .iter()
                .any(|k| matches!(k, EffectKind::CommitStore))
                && self.lsq.get(seq).is_some_and(|e| !e.dropped);
            if needs_port && !self.memory_out.has_room() {
                break;
            }

            let Some(mut record) = self.srb.pop_front() else { break };
            for kind in record.effects(Event::Commit) {
                match kind {
                    EffectKind::CommitStore => self.drain_store(seq),
                    EffectKind::AccessMem => {
                        // The architectural access is complete; the entry
                        // leaves the queue.
                        let _ = self.lsq.erase(seq);
                    }
                    EffectKind::ClearExclusive => self.exclusive_monitor = None,
                    other => panic!("effect {other:?} is not valid at commit"),
                }
            }
            record.set_state(InsnState::Committed);
            self.stats.committed += 1;
            committed += 1;
            trace!(core = self.index, seq, "committed");
        }
    }

    /// Sends one committed store to the memory hierarchy and erases its
    /// queue entry. Dropped (failed-exclusive) stores leave silently.
    fn drain_store(&mut self, seq: u64) {
        let Some(entry) = self.lsq.erase(seq) else {
            panic!("committing store seq {seq} without a queue entry")
        };
        assert!(
            entry.retired && entry.writes_memory(),
            "draining seq {seq} that never retired as a writing access"
        );
        if entry.dropped {
            return;
        }
        let Some(paddr) = entry.paddr else {
            panic!("committing store seq {seq} without a translated address")
        };
        let tid = self.next_tid();
        self.memory_out.push(MemoryRequest {
            transaction: tid,
            kind: MemoryRequestKind::Store,
            paddr,
            size: entry.size,
            data: entry.data,
            compare: None,
        });
        self.stats.stores_committed += 1;
    }

    fn clear_monitor_if_hit(&mut self, paddr: PhysAddr) {
        let block = paddr.block_base(self.config.block_size);
        if self.exclusive_monitor == Some(block) {
            trace!(core = self.index, block = format_args!("{:#x}", block.0), "monitor cleared");
            self.exclusive_monitor = None;
        }
    }

    fn answer_snoop(&mut self, reply: SnoopReply) {
        self.stats.snoops_answered += 1;
        if self.snoop_out.has_room() {
            self.snoop_out.push(reply);
        } else {
            // Snoop channel back-pressure is the embedder's concern; the
            // reply is regenerated when the broadcast is redelivered.
            warn!(core = self.index, "snoop reply dropped, port full");
        }
    }
}

impl std::fmt::Debug for OutOfOrderCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutOfOrderCore")
            .field("index", &self.index)
            .field("rob", &self.rob.len())
            .field("srb", &self.srb.len())
            .field("lsq", &self.lsq.len())
            .field("mshr", &self.mshr.len())
            .finish_non_exhaustive()
    }
}
