//! RVC (RISC-V 16-bit compressed instruction) decoder and semantic emitter.
//!
//! Decoding (`table`/`rvc`) and execution (`ir`) are separate: [`decode`]
//! returns a [`DecodedInstr`] whose [`CodeSet`] can be inspected for its
//! register dependencies before it is ever run, and [`exec_codeset`] is the
//! only thing that touches a live [`CpuState`].

mod bits;
mod ir;
mod rvc;
mod table;

pub use bits::{compressed_reg, sign_extend, BitRange};
pub use ir::{exec_codeset, CodeSet, Fragment, FragmentPhase, IntExpr, RegDeps, StepOutcome, Stmt};
pub use rvc::RVC_TABLE;
pub use table::{DecodedInstr, InstrDef, OpcodeTable};

/// Decode one 16-bit RVC word fetched at `current_address`.
#[must_use]
pub fn decode(word: u16, current_address: u64) -> Option<DecodedInstr> {
    RVC_TABLE.decode(word, current_address)
}
