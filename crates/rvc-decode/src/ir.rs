//! Lowered IR emitted by the decoder (design note, spec §9): a typed
//! statement list stands in for literal code-generation text, carrying its
//! own register read/write dependency sets for the outer loop's liveness
//! analysis instead of concatenated source fragments.

use iss_core::{CpuState, SystemBus};

/// Where in the surrounding instruction block a [`Fragment`] belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPhase {
    /// Prepended ahead of every instruction by the caller (the debug guard
    /// hook); never produced by an instruction's own `emit` function.
    PreInitialDebugReturning,
    /// The instruction's own semantics.
    InitialRequired,
    /// Trailing control-flow epilogue that may hand control back to the
    /// caller once the instruction has committed its effects.
    AppendedReturningRequired,
}

/// A scalar computation over the integer register file, evaluated against a
/// [`CpuState`] snapshot.
#[derive(Debug, Clone, Copy)]
pub enum IntExpr {
    Imm(i64),
    Reg(u8),
    AddImm(u8, i64),
    AddReg(u8, u8),
    SubReg(u8, u8),
    AndReg(u8, u8),
    OrReg(u8, u8),
    XorReg(u8, u8),
    AndImm(u8, i64),
    ShlImm(u8, u32),
    ShrLogicalImm(u8, u32),
    ShrArithImm(u8, u32),
    ClearLowBit(u8),
}

impl IntExpr {
    #[must_use]
    pub fn eval(self, cpu: &CpuState) -> u64 {
        match self {
            IntExpr::Imm(v) => v as u64,
            IntExpr::Reg(r) => cpu.read_reg(r),
            IntExpr::AddImm(r, imm) => (cpu.read_reg(r) as i64).wrapping_add(imm) as u64,
            IntExpr::AddReg(a, b) => cpu.read_reg(a).wrapping_add(cpu.read_reg(b)),
            IntExpr::SubReg(a, b) => cpu.read_reg(a).wrapping_sub(cpu.read_reg(b)),
            IntExpr::AndReg(a, b) => cpu.read_reg(a) & cpu.read_reg(b),
            IntExpr::OrReg(a, b) => cpu.read_reg(a) | cpu.read_reg(b),
            IntExpr::XorReg(a, b) => cpu.read_reg(a) ^ cpu.read_reg(b),
            IntExpr::AndImm(r, imm) => cpu.read_reg(r) & (imm as u64),
            IntExpr::ShlImm(r, sh) => cpu.read_reg(r) << sh,
            IntExpr::ShrLogicalImm(r, sh) => cpu.read_reg(r) >> sh,
            IntExpr::ShrArithImm(r, sh) => ((cpu.read_reg(r) as i64) >> sh) as u64,
            IntExpr::ClearLowBit(r) => cpu.read_reg(r) & !1u64,
        }
    }
}

/// One lowered operation. A [`Fragment`]'s `stmts` execute in order.
#[derive(Debug, Clone, Copy)]
pub enum Stmt {
    WriteReg { rd: u8, value: IntExpr },
    SetNextPc(IntExpr),
    SetNextPcIfZero { reg: u8, target: u64 },
    SetNextPcIfNonZero { reg: u8, target: u64 },
    LoadWord { rd: u8, addr: IntExpr, sign_extend: bool },
    StoreWord { addr: IntExpr, value: IntExpr },
    RaiseException(u32),
    CommitPc,
    ReturnIfPendingOrException,
    ReturnAlways,
    ReturnIfPcChanged { fallthrough_pc: u64 },
}

/// Registers a fragment reads and writes, for the outer loop's dependency
/// analysis (the C++ original's `getRegisterDependencies`/
/// `getAffectedRegisters`). `None` marks the program counter.
#[derive(Debug, Clone, Default)]
pub struct RegDeps {
    pub reads: Vec<Option<u8>>,
    pub writes: Vec<Option<u8>>,
}

impl RegDeps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_reg(&mut self, r: u8) -> &mut Self {
        self.reads.push(Some(r));
        self
    }

    pub fn write_reg(&mut self, r: u8) -> &mut Self {
        self.writes.push(Some(r));
        self
    }

    pub fn write_pc(&mut self) -> &mut Self {
        self.writes.push(None);
        self
    }
}

/// One stage of an instruction's lowering: a phase tag, its dependency set,
/// and the statements to execute.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub phase: FragmentPhase,
    pub deps: RegDeps,
    pub stmts: Vec<Stmt>,
}

impl Fragment {
    #[must_use]
    pub fn new(phase: FragmentPhase, deps: RegDeps, stmts: Vec<Stmt>) -> Self {
        Self { phase, deps, stmts }
    }
}

/// An instruction's full lowering: one or more ordered fragments.
pub type CodeSet = Vec<Fragment>;

/// Whether executing a [`CodeSet`] should hand control back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Return,
}

/// Execute every fragment of `code` in order against `cpu`/`bus`.
///
/// Mirrors the ETISS-generated function body: fragments run sequentially,
/// and an appended epilogue's return statement ends the instruction early
/// without undoing effects already committed by earlier fragments.
pub fn exec_codeset(code: &[Fragment], cpu: &mut CpuState, bus: &mut dyn SystemBus) -> StepOutcome {
    for fragment in code {
        for stmt in &fragment.stmts {
            match *stmt {
                Stmt::WriteReg { rd, value } => {
                    let v = value.eval(cpu);
                    cpu.write_reg(rd, v);
                }
                Stmt::SetNextPc(expr) => cpu.next_pc = expr.eval(cpu),
                Stmt::SetNextPcIfZero { reg, target } => {
                    if cpu.read_reg(reg) == 0 {
                        cpu.next_pc = target;
                    }
                }
                Stmt::SetNextPcIfNonZero { reg, target } => {
                    if cpu.read_reg(reg) != 0 {
                        cpu.next_pc = target;
                    }
                }
                Stmt::LoadWord { rd, addr, sign_extend } => {
                    let a = addr.eval(cpu);
                    let mut buf = [0u8; 4];
                    match bus.read(a, &mut buf) {
                        Ok(()) => {
                            let raw = u32::from_le_bytes(buf);
                            let v = if sign_extend { (raw as i32) as i64 as u64 } else { u64::from(raw) };
                            cpu.write_reg(rd, v);
                        }
                        Err(raw) => cpu.exception = bus.translate_exc_code(raw),
                    }
                }
                Stmt::StoreWord { addr, value } => {
                    let a = addr.eval(cpu);
                    let v = value.eval(cpu) as u32;
                    if let Err(raw) = bus.write(a, &v.to_le_bytes()) {
                        cpu.exception = bus.translate_exc_code(raw);
                    }
                }
                Stmt::RaiseException(cause) => cpu.exception = cause,
                Stmt::CommitPc => cpu.instruction_pointer = cpu.next_pc,
                Stmt::ReturnIfPendingOrException => {
                    if cpu.return_pending || cpu.has_exception() {
                        return StepOutcome::Return;
                    }
                }
                Stmt::ReturnAlways => return StepOutcome::Return,
                Stmt::ReturnIfPcChanged { fallthrough_pc } => {
                    if cpu.next_pc != fallthrough_pc {
                        return StepOutcome::Return;
                    }
                }
            }
        }
    }
    StepOutcome::Continue
}
