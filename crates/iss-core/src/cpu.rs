//! CPU state as seen by emitted RVC semantic fragments (spec §3 "CPU state").

/// Number of entries in the integer register file, `X[0..31]`.
pub const NUM_REGS: usize = 32;

/// The mutable state a decoded instruction's semantics act on.
///
/// `X[0]` is hard-wired zero: callers must suppress writes to it themselves
/// (see [`CpuState::write_reg`]) rather than relying on the register file to
/// silently discard them, because dependency metadata attached to an
/// instruction's IR must still name the intended destination register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    /// Integer register file. `x[0]` is always logically zero.
    pub x: [u64; NUM_REGS],
    /// Committed branch target for the instruction currently executing.
    pub next_pc: u64,
    /// Program counter, updated from `next_pc` at the end of each instruction.
    pub instruction_pointer: u64,
    /// Pending exception cause, `0` meaning "none".
    pub exception: u32,
    /// Set by a fragment that wants the outer loop to regain control even
    /// though no exception occurred (e.g. after a debugger-visible event).
    pub return_pending: bool,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuState {
    /// Create a CPU state with all registers zeroed and PC at the reset vector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            x: [0; NUM_REGS],
            next_pc: 0,
            instruction_pointer: 0,
            exception: 0,
            return_pending: false,
        }
    }

    /// Read register `r`. Always returns `0` for `r == 0` regardless of what
    /// was last stored there.
    #[must_use]
    pub fn read_reg(&self, r: u8) -> u64 {
        if r == 0 { 0 } else { self.x[r as usize] }
    }

    /// Write `value` to register `r`, suppressing the write when `r == 0`.
    pub fn write_reg(&mut self, r: u8, value: u64) {
        if r != 0 {
            self.x[r as usize] = value;
        }
    }

    /// True if an exception is pending.
    #[must_use]
    pub const fn has_exception(&self) -> bool {
        self.exception != 0
    }
}
