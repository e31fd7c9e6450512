//! The RV64IMACFD compressed (`C`) extension opcode table (spec §6).
//!
//! Each `emit_*` function lowers one matched 16-bit word into a
//! [`CodeSet`]. Conditionals that only depend on a decoded field (register
//! number, immediate value) are resolved here, at decode time, by choosing
//! which statements to push; only conditionals that depend on a register's
//! *runtime value* (the two branch instructions) appear as IR statements.

use crate::bits::{compressed_reg, sign_extend, BitRange};
use crate::ir::{CodeSet, Fragment, FragmentPhase, IntExpr, RegDeps, Stmt};
use crate::table::{InstrDef, OpcodeTable};

const SP: u8 = 2;
const RA: u8 = 1;

fn fallthrough(addr: u64) -> u64 {
    addr.wrapping_add(2)
}

fn illegal_instruction(addr: u64) -> Vec<Stmt> {
    vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)), Stmt::RaiseException(2), Stmt::CommitPc]
}

fn breakpoint(addr: u64) -> Vec<Stmt> {
    vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)), Stmt::RaiseException(3), Stmt::CommitPc]
}

fn returning_if_pending(stmts: Vec<Stmt>, deps: RegDeps) -> CodeSet {
    vec![
        Fragment::new(FragmentPhase::InitialRequired, deps, stmts),
        Fragment::new(
            FragmentPhase::AppendedReturningRequired,
            RegDeps::new(),
            vec![Stmt::ReturnIfPendingOrException],
        ),
    ]
}

fn returning_always(stmts: Vec<Stmt>, deps: RegDeps) -> CodeSet {
    vec![
        Fragment::new(FragmentPhase::InitialRequired, deps, stmts),
        Fragment::new(FragmentPhase::AppendedReturningRequired, RegDeps::new(), vec![Stmt::ReturnAlways]),
    ]
}

fn not_returning(stmts: Vec<Stmt>, deps: RegDeps) -> CodeSet {
    vec![Fragment::new(FragmentPhase::InitialRequired, deps, stmts)]
}

// c.addi4spn: x[rd'] = x[2] + nzuimm; reserved (illegal) when nzuimm == 0.
fn emit_caddi4spn(word: u16, addr: u64) -> CodeSet {
    let rd = compressed_reg(BitRange::new(4, 2).read(word));
    let mut imm: u16 = 0;
    imm += BitRange::new(5, 5).read(word) << 3;
    imm += BitRange::new(6, 6).read(word) << 2;
    imm += BitRange::new(10, 7).read(word) << 6;
    imm += BitRange::new(12, 11).read(word) << 4;

    if imm == 0 {
        let mut deps = RegDeps::new();
        deps.write_pc();
        return returning_if_pending(illegal_instruction(addr), deps);
    }
    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd, value: IntExpr::AddImm(SP, i64::from(imm)) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(SP).write_reg(rd).write_pc();
    returning_if_pending(stmts, deps)
}

// c.lw: x[rd'] = sext32(mem32[x[rs1'] + uimm]).
fn emit_clw(word: u16, addr: u64) -> CodeSet {
    let rd = compressed_reg(BitRange::new(4, 2).read(word));
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));
    let mut uimm: u16 = 0;
    uimm += BitRange::new(5, 5).read(word) << 6;
    uimm += BitRange::new(6, 6).read(word) << 2;
    uimm += BitRange::new(12, 10).read(word) << 3;

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::LoadWord { rd, addr: IntExpr::AddImm(rs1, i64::from(uimm)), sign_extend: true },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rd).write_pc();
    returning_if_pending(stmts, deps)
}

// c.sw: mem32[x[rs1'] + uimm] = x[rs2'].
fn emit_csw(word: u16, addr: u64) -> CodeSet {
    let rs2 = compressed_reg(BitRange::new(4, 2).read(word));
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));
    let mut uimm: u16 = 0;
    uimm += BitRange::new(5, 5).read(word) << 6;
    uimm += BitRange::new(6, 6).read(word) << 2;
    uimm += BitRange::new(12, 10).read(word) << 3;

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::StoreWord { addr: IntExpr::AddImm(rs1, i64::from(uimm)), value: IntExpr::Reg(rs2) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).read_reg(rs2).write_pc();
    returning_if_pending(stmts, deps)
}

// c.addi: x[rs1] += sext6(imm). No epilogue: it can neither fault nor divert pc.
fn emit_caddi(word: u16, addr: u64) -> CodeSet {
    let rs1 = BitRange::new(11, 7).read(word) as u8;
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(6, 2).read(word));
    imm += u32::from(BitRange::new(12, 12).read(word)) << 5;
    let imm = sign_extend(imm, 6);

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: rs1, value: IntExpr::AddImm(rs1, imm) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rs1).write_pc();
    not_returning(stmts, deps)
}

// c.nop (also covers the HINT encodings with rd == 0, nzimm != 0): no effect.
fn emit_cnop(_word: u16, addr: u64) -> CodeSet {
    let stmts = vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)), Stmt::CommitPc];
    let mut deps = RegDeps::new();
    deps.write_pc();
    not_returning(stmts, deps)
}

// c.li: x[rd] = sext6(imm).
fn emit_cli(word: u16, addr: u64) -> CodeSet {
    let rd = BitRange::new(11, 7).read(word) as u8;
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(6, 2).read(word));
    imm += u32::from(BitRange::new(12, 12).read(word)) << 5;
    let imm = sign_extend(imm, 6);

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd, value: IntExpr::Imm(imm) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.write_reg(rd).write_pc();
    not_returning(stmts, deps)
}

// c.lui: x[rd] = sext18(imm << 12). The all-zero-immediate encoding is
// claimed by the more specific `__reserved_clui` entry, so this function
// never observes imm == 0.
fn emit_clui(word: u16, addr: u64) -> CodeSet {
    let rd = BitRange::new(11, 7).read(word) as u8;
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(6, 2).read(word)) << 12;
    imm += u32::from(BitRange::new(12, 12).read(word)) << 17;
    let imm = sign_extend(imm, 18);

    let mut stmts = vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64))];
    let mut deps = RegDeps::new();
    if rd != 0 {
        stmts.push(Stmt::WriteReg { rd, value: IntExpr::Imm(imm) });
    }
    deps.write_reg(rd);
    stmts.push(Stmt::CommitPc);
    deps.write_pc();
    returning_if_pending(stmts, deps)
}

// c.addi16sp: x[2] += sext10(nzimm). The nzimm == 0 encoding is reserved.
fn emit_caddi16sp(word: u16, addr: u64) -> CodeSet {
    let mut nzimm: u32 = 0;
    nzimm += u32::from(BitRange::new(2, 2).read(word)) << 5;
    nzimm += u32::from(BitRange::new(4, 3).read(word)) << 7;
    nzimm += u32::from(BitRange::new(5, 5).read(word)) << 6;
    nzimm += u32::from(BitRange::new(6, 6).read(word)) << 4;
    nzimm += u32::from(BitRange::new(12, 12).read(word)) << 9;

    if nzimm == 0 {
        let mut deps = RegDeps::new();
        deps.write_pc();
        return returning_if_pending(illegal_instruction(addr), deps);
    }
    let imm = sign_extend(nzimm, 10);
    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: SP, value: IntExpr::AddImm(SP, imm) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(SP).write_reg(SP).write_pc();
    returning_if_pending(stmts, deps)
}

// The all-zero-nzimm c.lui encoding: reserved/illegal.
fn emit_reserved_clui(_word: u16, addr: u64) -> CodeSet {
    let mut deps = RegDeps::new();
    deps.write_pc();
    returning_if_pending(illegal_instruction(addr), deps)
}

// c.srli: x[rs1'] = x[rs1'] >> shamt (logical). No epilogue.
fn emit_csrli(word: u16, addr: u64) -> CodeSet {
    let shamt = u32::from(BitRange::new(6, 2).read(word));
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: rs1, value: IntExpr::ShrLogicalImm(rs1, shamt) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rs1).write_pc();
    not_returning(stmts, deps)
}

// c.srai: x[rs1'] = x[rs1'] >> shamt (arithmetic). No epilogue.
fn emit_csrai(word: u16, addr: u64) -> CodeSet {
    let shamt = u32::from(BitRange::new(6, 2).read(word));
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: rs1, value: IntExpr::ShrArithImm(rs1, shamt) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rs1).write_pc();
    not_returning(stmts, deps)
}

// c.andi: x[rs1'] &= sext6(imm). No epilogue.
fn emit_candi(word: u16, addr: u64) -> CodeSet {
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(6, 2).read(word));
    imm += u32::from(BitRange::new(12, 12).read(word)) << 5;
    let imm = sign_extend(imm, 6);

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: rs1, value: IntExpr::AndImm(rs1, imm) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rs1).write_pc();
    not_returning(stmts, deps)
}

fn emit_creg_alu(word: u16, addr: u64, op: fn(u8, u8) -> IntExpr) -> CodeSet {
    let rs2 = compressed_reg(BitRange::new(4, 2).read(word));
    let rd = compressed_reg(BitRange::new(9, 7).read(word));

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd, value: op(rd, rs2) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rd).read_reg(rs2).write_reg(rd).write_pc();
    not_returning(stmts, deps)
}

fn emit_csub(word: u16, addr: u64) -> CodeSet {
    emit_creg_alu(word, addr, IntExpr::SubReg)
}
fn emit_cxor(word: u16, addr: u64) -> CodeSet {
    emit_creg_alu(word, addr, IntExpr::XorReg)
}
fn emit_cor(word: u16, addr: u64) -> CodeSet {
    emit_creg_alu(word, addr, IntExpr::OrReg)
}
fn emit_cand(word: u16, addr: u64) -> CodeSet {
    emit_creg_alu(word, addr, IntExpr::AndReg)
}

// c.j: pc = addr + sext11(imm), unconditional. Always returns.
fn emit_cj(word: u16, addr: u64) -> CodeSet {
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(2, 2).read(word)) << 5;
    imm += u32::from(BitRange::new(5, 3).read(word)) << 1;
    imm += u32::from(BitRange::new(6, 6).read(word)) << 7;
    imm += u32::from(BitRange::new(7, 7).read(word)) << 6;
    imm += u32::from(BitRange::new(8, 8).read(word)) << 10;
    imm += u32::from(BitRange::new(10, 9).read(word)) << 8;
    imm += u32::from(BitRange::new(11, 11).read(word)) << 4;
    imm += u32::from(BitRange::new(12, 12).read(word)) << 11;
    let target = addr.wrapping_add(sign_extend(imm, 12) as u64);

    let stmts = vec![Stmt::SetNextPc(IntExpr::Imm(target as i64)), Stmt::CommitPc];
    let mut deps = RegDeps::new();
    deps.write_pc();
    returning_always(stmts, deps)
}

fn emit_cbranch(word: u16, addr: u64, if_zero: bool) -> CodeSet {
    let rs1 = compressed_reg(BitRange::new(9, 7).read(word));
    let mut imm: u32 = 0;
    imm += u32::from(BitRange::new(2, 2).read(word)) << 5;
    imm += u32::from(BitRange::new(4, 3).read(word)) << 1;
    imm += u32::from(BitRange::new(6, 5).read(word)) << 6;
    imm += u32::from(BitRange::new(11, 10).read(word)) << 3;
    imm += u32::from(BitRange::new(12, 12).read(word)) << 8;
    let target = addr.wrapping_add(sign_extend(imm, 9) as u64);
    let fallthrough_pc = fallthrough(addr);

    let branch_stmt = if if_zero {
        Stmt::SetNextPcIfZero { reg: rs1, target }
    } else {
        Stmt::SetNextPcIfNonZero { reg: rs1, target }
    };
    let stmts = vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough_pc as i64)), branch_stmt, Stmt::CommitPc];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_pc();

    vec![
        Fragment::new(FragmentPhase::InitialRequired, deps, stmts),
        Fragment::new(
            FragmentPhase::AppendedReturningRequired,
            RegDeps::new(),
            vec![Stmt::ReturnIfPcChanged { fallthrough_pc }],
        ),
    ]
}

fn emit_cbeqz(word: u16, addr: u64) -> CodeSet {
    emit_cbranch(word, addr, true)
}
fn emit_cbnez(word: u16, addr: u64) -> CodeSet {
    emit_cbranch(word, addr, false)
}

// c.slli: x[rs1] <<= nzuimm. No epilogue.
fn emit_cslli(word: u16, addr: u64) -> CodeSet {
    let shamt = u32::from(BitRange::new(6, 2).read(word));
    let rs1 = BitRange::new(11, 7).read(word) as u8;

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::WriteReg { rd: rs1, value: IntExpr::ShlImm(rs1, shamt) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(rs1).write_pc();
    not_returning(stmts, deps)
}

// c.lwsp: x[rd] = sext32(mem32[x[2] + uimm]); rd == 0 is reserved. The
// upstream definition declares no read-dependency on x[2] — preserved here.
fn emit_clwsp(word: u16, addr: u64) -> CodeSet {
    let rd = BitRange::new(11, 7).read(word) as u8;
    let mut uimm: u16 = 0;
    uimm += BitRange::new(3, 2).read(word) << 6;
    uimm += BitRange::new(6, 4).read(word) << 2;
    uimm += BitRange::new(12, 12).read(word) << 5;

    let mut deps = RegDeps::new();
    deps.write_pc();
    if rd == 0 {
        return returning_if_pending(illegal_instruction(addr), deps);
    }
    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::LoadWord { rd, addr: IntExpr::AddImm(SP, i64::from(uimm)), sign_extend: true },
        Stmt::CommitPc,
    ];
    deps.write_reg(rd);
    returning_if_pending(stmts, deps)
}

// c.swsp: mem32[x[2] + uimm] = x[rs2].
fn emit_cswsp(word: u16, addr: u64) -> CodeSet {
    let rs2 = BitRange::new(6, 2).read(word) as u8;
    let mut uimm: u16 = 0;
    uimm += BitRange::new(8, 7).read(word) << 6;
    uimm += BitRange::new(12, 9).read(word) << 2;

    let stmts = vec![
        Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64)),
        Stmt::StoreWord { addr: IntExpr::AddImm(SP, i64::from(uimm)), value: IntExpr::Reg(rs2) },
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(SP).read_reg(rs2).write_pc();
    returning_if_pending(stmts, deps)
}

// c.mv: x[rd] = x[rs2]; rd == 0 is a HINT (no effect), not illegal. No epilogue.
fn emit_cmv(word: u16, addr: u64) -> CodeSet {
    let rs2 = BitRange::new(6, 2).read(word) as u8;
    let rd = BitRange::new(11, 7).read(word) as u8;

    let mut stmts = vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64))];
    let mut deps = RegDeps::new();
    deps.read_reg(rs2);
    if rd != 0 {
        stmts.push(Stmt::WriteReg { rd, value: IntExpr::Reg(rs2) });
    }
    deps.write_reg(rd);
    stmts.push(Stmt::CommitPc);
    deps.write_pc();
    not_returning(stmts, deps)
}

// c.jr: pc = x[rs1] & ~1; rs1 == 0 is reserved (illegal). Always returns.
fn emit_cjr(word: u16, addr: u64) -> CodeSet {
    let rs1 = BitRange::new(11, 7).read(word) as u8;

    if rs1 == 0 {
        let mut deps = RegDeps::new();
        deps.write_pc();
        return returning_always(illegal_instruction(addr), deps);
    }
    let stmts = vec![Stmt::SetNextPc(IntExpr::ClearLowBit(rs1)), Stmt::CommitPc];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_pc();
    returning_always(stmts, deps)
}

// The rs2 == 0, rd == 0 sibling of c.mv: reserved/illegal.
fn emit_reserved_cmv(_word: u16, addr: u64) -> CodeSet {
    let mut deps = RegDeps::new();
    deps.write_pc();
    returning_if_pending(illegal_instruction(addr), deps)
}

// c.add: x[rd] += x[rs2]; rd == 0 is a HINT. No epilogue.
fn emit_cadd(word: u16, addr: u64) -> CodeSet {
    let rs2 = BitRange::new(6, 2).read(word) as u8;
    let rd = BitRange::new(11, 7).read(word) as u8;

    let mut stmts = vec![Stmt::SetNextPc(IntExpr::Imm(fallthrough(addr) as i64))];
    let mut deps = RegDeps::new();
    deps.read_reg(rs2);
    if rd != 0 {
        stmts.push(Stmt::WriteReg { rd, value: IntExpr::AddReg(rd, rs2) });
        deps.read_reg(rd);
    }
    deps.write_reg(rd);
    stmts.push(Stmt::CommitPc);
    deps.write_pc();
    not_returning(stmts, deps)
}

// c.jalr: x[1] = addr + 2; pc = x[rs1] & ~1. Unlike c.jr, rs1 == 0 is not
// special-cased by the upstream definition — preserved here. Always returns.
fn emit_cjalr(word: u16, addr: u64) -> CodeSet {
    let rs1 = BitRange::new(11, 7).read(word) as u8;

    let stmts = vec![
        Stmt::WriteReg { rd: RA, value: IntExpr::Imm(fallthrough(addr) as i64) },
        Stmt::SetNextPc(IntExpr::ClearLowBit(rs1)),
        Stmt::CommitPc,
    ];
    let mut deps = RegDeps::new();
    deps.read_reg(rs1).write_reg(RA).write_pc();
    returning_always(stmts, deps)
}

// c.ebreak: breakpoint trap. Always returns.
fn emit_cebreak(_word: u16, addr: u64) -> CodeSet {
    let mut deps = RegDeps::new();
    deps.write_pc();
    returning_always(breakpoint(addr), deps)
}

// The all-zero 16-bit word: defined illegal instruction. Always returns.
fn emit_dii(_word: u16, addr: u64) -> CodeSet {
    let mut deps = RegDeps::new();
    deps.write_pc();
    returning_always(illegal_instruction(addr), deps)
}

macro_rules! table {
    ($($name:literal, $pattern:expr, $mask:expr, $emit:ident;)*) => {
        &[$(InstrDef { mnemonic: $name, pattern: $pattern, mask: $mask, emit: $emit },)*]
    };
}

/// The full RV64IMACFD `C`-extension opcode table, longest-mask-wins.
pub static RVC_TABLE: OpcodeTable = OpcodeTable {
    entries: table! {
        "dii",              0x0000, 0xffff, emit_dii;
        "caddi4spn",        0x0000, 0xe003, emit_caddi4spn;
        "clw",              0x4000, 0xe003, emit_clw;
        "csw",              0xc000, 0xe003, emit_csw;
        "cnop",             0x0001, 0xef83, emit_cnop;
        "caddi",            0x0001, 0xe003, emit_caddi;
        "cli",              0x4001, 0xe003, emit_cli;
        "caddi16sp",        0x6101, 0xef83, emit_caddi16sp;
        "__reserved_clui",  0x6001, 0xf07f, emit_reserved_clui;
        "clui",             0x6001, 0xe003, emit_clui;
        "csrli",            0x8001, 0xfc03, emit_csrli;
        "csrai",            0x8401, 0xfc03, emit_csrai;
        "candi",            0x8801, 0xec03, emit_candi;
        "csub",             0x8c01, 0xfc63, emit_csub;
        "cxor",             0x8c21, 0xfc63, emit_cxor;
        "cor",              0x8c41, 0xfc63, emit_cor;
        "cand",             0x8c61, 0xfc63, emit_cand;
        "cj",               0xa001, 0xe003, emit_cj;
        "cbeqz",            0xc001, 0xe003, emit_cbeqz;
        "cbnez",            0xe001, 0xe003, emit_cbnez;
        "cslli",            0x0002, 0xf003, emit_cslli;
        "clwsp",            0x4002, 0xe003, emit_clwsp;
        "cebreak",          0x9002, 0xffff, emit_cebreak;
        "cjalr",            0x9002, 0xf07f, emit_cjalr;
        "cadd",             0x9002, 0xf003, emit_cadd;
        "cjr",              0x8002, 0xf07f, emit_cjr;
        "__reserved_cmv",   0x8002, 0xffff, emit_reserved_cmv;
        "cmv",              0x8002, 0xf003, emit_cmv;
        "cswsp",            0xc002, 0xe003, emit_cswsp;
    },
};
