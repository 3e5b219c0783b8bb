//! Message types carried on the core's ports.

use crate::common::error::Exception;
use crate::common::{PhysAddr, VirtAddr};
use crate::insn::class::AccessSize;

/// Identifies one outstanding memory or translation transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(pub u64);

/// What an egress memory request asks the hierarchy to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryRequestKind {
    /// Read one naturally aligned value.
    Load,
    /// Write one committed store.
    Store,
    /// Perform the read-modify-write at the memory system.
    Rmw,
    /// Perform the compare-and-swap at the memory system.
    Cas,
}

/// One egress request to the memory hierarchy.
#[derive(Clone, Copy, Debug)]
pub struct MemoryRequest {
    /// Transaction identity echoed in the reply.
    pub transaction: TransactionId,
    /// The operation requested.
    pub kind: MemoryRequestKind,
    /// Translated physical address.
    pub paddr: PhysAddr,
    /// Access size.
    pub size: AccessSize,
    /// Outgoing data: store value, RMW operand, or CAS swap value.
    pub data: Option<u64>,
    /// CAS compare value.
    pub compare: Option<u64>,
}

/// One ingress message from the memory hierarchy.
///
/// Replies carry the transaction id of the request they answer; coherence
/// broadcasts carry only an address and are answered with a fresh
/// [`SnoopReply`].
#[derive(Clone, Copy, Debug)]
pub enum MemoryMessage {
    /// A load (or exclusive load) completed.
    LoadReply {
        /// Transaction being answered.
        transaction: TransactionId,
        /// The raw value read, unextended.
        value: u64,
    },
    /// A committed store was accepted.
    StoreAck {
        /// Transaction being answered.
        transaction: TransactionId,
    },
    /// An RMW or CAS completed at the memory system.
    AtomicReply {
        /// Transaction being answered.
        transaction: TransactionId,
        /// The value the location held before the operation.
        old_value: u64,
        /// Whether the operation performed its write.
        success: bool,
    },
    /// Coherence: invalidate the block.
    Invalidate {
        /// Block address.
        paddr: PhysAddr,
    },
    /// Coherence: downgrade the block to shared.
    Downgrade {
        /// Block address.
        paddr: PhysAddr,
    },
    /// Coherence: probe for the block.
    Probe {
        /// Block address.
        paddr: PhysAddr,
    },
    /// Coherence: return the block's data.
    ReturnRequest {
        /// Block address.
        paddr: PhysAddr,
    },
}

/// One egress snoop acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnoopReply {
    /// The block was invalidated.
    InvalidateAck {
        /// Block address.
        paddr: PhysAddr,
    },
    /// The block was downgraded.
    DowngradeAck {
        /// Block address.
        paddr: PhysAddr,
    },
    /// The block is not held here.
    ProbeMiss {
        /// Block address.
        paddr: PhysAddr,
    },
    /// The block's data, when held.
    ReturnReply {
        /// Block address.
        paddr: PhysAddr,
        /// Returned data, absent when the block is not held.
        data: Option<u64>,
    },
}

/// One egress address-translation request.
#[derive(Clone, Copy, Debug)]
pub struct TranslationRequest {
    /// Transaction identity echoed in the reply.
    pub transaction: TransactionId,
    /// The virtual address to translate.
    pub vaddr: VirtAddr,
}

/// One ingress address-translation reply.
#[derive(Clone, Copy, Debug)]
pub struct TranslationReply {
    /// Transaction being answered.
    pub transaction: TransactionId,
    /// The physical address, or the fault the access would raise.
    pub result: Result<PhysAddr, Exception>,
}

/// Why a squash happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SquashCause {
    /// A branch resolved against its prediction.
    Mispredict,
    /// An instruction raised a synchronous exception.
    Exception,
    /// Memory-order speculation failed.
    MemoryOrder,
    /// The front end must resynchronize from architectural state.
    Resync,
}

/// Resolved-branch information for the front end's predictors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchFeedback {
    /// Address of the branch.
    pub pc: VirtAddr,
    /// The resolved target.
    pub target: VirtAddr,
    /// Whether the branch was taken.
    pub taken: bool,
    /// Whether the front end had it wrong.
    pub mispredicted: bool,
}

/// A load satisfied from an older store still in the load/store queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreForward {
    /// Sequence number of the forwarded load.
    pub load_seq: u64,
    /// Sequence number of the store that supplied the value.
    pub store_seq: u64,
    /// Physical address of the access.
    pub paddr: PhysAddr,
}

/// One-shot notifications the front end polls after each cycle.
#[derive(Debug, Default)]
pub struct ControlNotifications {
    /// New fetch address after a redirect.
    pub redirect: Option<VirtAddr>,
    /// Cause of the most recent squash.
    pub squash: Option<SquashCause>,
    /// Resolved branches since the last poll.
    pub feedback: Vec<BranchFeedback>,
    /// Store-forwarding hits since the last poll.
    pub forwards: Vec<StoreForward>,
}

impl ControlNotifications {
    /// Takes all pending notifications, leaving the set empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.redirect.is_none()
            && self.squash.is_none()
            && self.feedback.is_empty()
            && self.forwards.is_empty()
    }
}
