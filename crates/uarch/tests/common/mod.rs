//! Shared test infrastructure: a mock functional backend, a harness that
//! drives one core with explicit port servicing, and instruction encoders.

use uarchsim_uarch::common::{PhysAddr, VirtAddr};
use uarchsim_uarch::core::msg::{MemoryMessage, MemoryRequest, MemoryRequestKind, TranslationReply};
use uarchsim_uarch::decode::{decode, FetchedOpcode};
use uarchsim_uarch::{CoreConfig, ExecutionBackend, OutOfOrderCore};

/// Fixed architectural state served to the core under test.
pub struct MockBackend {
    pub regs: [u64; 32],
    pub flags: u8,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            regs: [0; 32],
            flags: 0,
        }
    }
}

impl ExecutionBackend for MockBackend {
    fn read_register(&mut self, _core: usize, reg: uarchsim_uarch::common::LogReg) -> u64 {
        self.regs[reg.0 as usize]
    }

    fn condition_flags(&mut self, _core: usize) -> u8 {
        self.flags
    }
}

/// One core plus the bookkeeping to feed it instructions and service its
/// ports by hand.
pub struct TestCore {
    pub core: OutOfOrderCore,
    next_seq: u64,
    next_pc: u64,
}

impl TestCore {
    pub fn new() -> Self {
        Self::with_setup(CoreConfig::default(), MockBackend::default())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        Self::with_setup(CoreConfig::default(), backend)
    }

    pub fn with_setup(config: CoreConfig, backend: MockBackend) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Self {
            core: OutOfOrderCore::new(0, config, Box::new(backend)),
            next_seq: 0,
            next_pc: 0x1000,
        }
    }

    /// Decodes and dispatches one word at the next sequential pc, returning
    /// its sequence number.
    pub fn dispatch_word(&mut self, word: u32) -> u64 {
        self.dispatch_predicted(word, None)
    }

    /// Decodes and dispatches one word with a branch prediction attached.
    pub fn dispatch_predicted(&mut self, word: u32, predicted: Option<u64>) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        let fetched = FetchedOpcode {
            pc: VirtAddr(self.next_pc),
            word,
            predicted_target: predicted.map(VirtAddr),
        };
        self.next_pc += 4;
        self.core.dispatch(decode(&fetched, 0, seq));
        seq
    }

    /// The pc the next dispatched word will carry.
    pub fn next_pc(&self) -> u64 {
        self.next_pc
    }

    /// Answers every queued translation request with an identity mapping.
    pub fn service_translations(&mut self) {
        while let Some(req) = self.core.pull_translation_request() {
            self.core.push_translation_reply(TranslationReply {
                transaction: req.transaction,
                result: Ok(PhysAddr(req.vaddr.0)),
            });
        }
    }

    /// Fails every queued translation request with the given fault.
    pub fn fail_translations(&mut self, fault: uarchsim_uarch::common::Exception) {
        while let Some(req) = self.core.pull_translation_request() {
            self.core.push_translation_reply(TranslationReply {
                transaction: req.transaction,
                result: Err(fault),
            });
        }
    }

    /// Answers every queued memory request: loads with `value`, atomics
    /// with `value` as the old value (successful), stores acknowledged.
    /// Returns the serviced requests.
    pub fn service_memory(&mut self, value: u64) -> Vec<MemoryRequest> {
        let mut serviced = Vec::new();
        while let Some(req) = self.core.pull_memory_request() {
            match req.kind {
                MemoryRequestKind::Load => self.core.push_memory_message(MemoryMessage::LoadReply {
                    transaction: req.transaction,
                    value,
                }),
                MemoryRequestKind::Rmw | MemoryRequestKind::Cas => {
                    self.core.push_memory_message(MemoryMessage::AtomicReply {
                        transaction: req.transaction,
                        old_value: value,
                        success: true,
                    });
                }
                MemoryRequestKind::Store => self.core.push_memory_message(MemoryMessage::StoreAck {
                    transaction: req.transaction,
                }),
            }
            serviced.push(req);
        }
        serviced
    }

    /// Runs `n` cycles with translation and memory serviced between each.
    pub fn run_serviced(&mut self, n: usize, memory_value: u64) {
        for _ in 0..n {
            self.core.cycle();
            self.service_translations();
            let _ = self.service_memory(memory_value);
        }
    }
}

/// Instruction word encoders for the decoded families.
pub mod encode {
    /// `B` with a signed word offset.
    pub fn b(offset_words: i32) -> u32 {
        (0b000101 << 26) | ((offset_words as u32) & 0x03FF_FFFF)
    }

    /// `BL` with a signed word offset.
    pub fn bl(offset_words: i32) -> u32 {
        (0b100101 << 26) | ((offset_words as u32) & 0x03FF_FFFF)
    }

    /// `B.cond` with a signed word offset.
    pub fn b_cond(cond: u32, offset_words: i32) -> u32 {
        (0b0101010 << 25) | (((offset_words as u32) & 0x7FFFF) << 5) | cond
    }

    /// `CBZ`/`CBNZ` (64-bit) on `rt`.
    pub fn cbz(rt: u32, offset_words: i32, negated: bool) -> u32 {
        (1 << 31)
            | (0b011010 << 25)
            | (u32::from(negated) << 24)
            | (((offset_words as u32) & 0x7FFFF) << 5)
            | rt
    }

    /// `BR` through `rn`.
    pub fn br(rn: u32) -> u32 {
        (0b1101011 << 25) | (0b11111 << 16) | (rn << 5)
    }

    /// `LDR` (64-bit, unsigned immediate in doublewords).
    pub fn ldr64(rt: u32, rn: u32, imm_dw: u32) -> u32 {
        (0b11 << 30) | (0b111 << 27) | (0b01 << 24) | (0b01 << 22) | (imm_dw << 10) | (rn << 5) | rt
    }

    /// `LDRB` with zero extension.
    pub fn ldrb(rt: u32, rn: u32, imm: u32) -> u32 {
        (0b111 << 27) | (0b01 << 24) | (0b01 << 22) | (imm << 10) | (rn << 5) | rt
    }

    /// `LDRSB` (sign-extending byte load, 64-bit destination).
    pub fn ldrsb(rt: u32, rn: u32, imm: u32) -> u32 {
        (0b111 << 27) | (0b01 << 24) | (0b10 << 22) | (imm << 10) | (rn << 5) | rt
    }

    /// `STR` (64-bit, unsigned immediate in doublewords).
    pub fn str64(rt: u32, rn: u32, imm_dw: u32) -> u32 {
        (0b11 << 30) | (0b111 << 27) | (0b01 << 24) | (imm_dw << 10) | (rn << 5) | rt
    }

    /// `STRB`.
    pub fn strb(rt: u32, rn: u32, imm: u32) -> u32 {
        (0b111 << 27) | (0b01 << 24) | (imm << 10) | (rn << 5) | rt
    }

    /// `LDXR` (64-bit).
    pub fn ldxr(rt: u32, rn: u32) -> u32 {
        (0b11 << 30) | (0b001000 << 24) | (1 << 22) | (0b11111 << 16) | (0b11111 << 10) | (rn << 5) | rt
    }

    /// `STXR` (64-bit), status into `rs`.
    pub fn stxr(rs: u32, rt: u32, rn: u32) -> u32 {
        (0b11 << 30) | (0b001000 << 24) | (rs << 16) | (0b11111 << 10) | (rn << 5) | rt
    }

    /// `CAS` (64-bit): compare in `rs` (old value written back), swap from `rt`.
    pub fn cas(rs: u32, rt: u32, rn: u32) -> u32 {
        (0b11 << 30) | (0b0010001 << 23) | (1 << 22) | (rs << 16) | (0b11111 << 10) | (rn << 5) | rt
    }

    /// `LDADD` (64-bit): old value into `rt`, addend from `rs`.
    pub fn ldadd(rs: u32, rt: u32, rn: u32) -> u32 {
        (0b11 << 30) | (0b111 << 27) | (1 << 21) | (rs << 16) | (rn << 5) | rt
    }

    /// A word no family decodes.
    pub fn unallocated() -> u32 {
        0x0000_0000
    }
}
