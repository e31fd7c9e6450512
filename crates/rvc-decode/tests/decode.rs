use iss_core::CpuState;
use rvc_decode::{decode, exec_codeset, StepOutcome};

struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    fn new(size: usize) -> Self {
        Self { bytes: vec![0; size] }
    }
}

impl iss_core::SystemBus for FlatMemory {
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> iss_core::MemResult {
        let addr = addr as usize;
        if addr + buf.len() > self.bytes.len() {
            return Err(1);
        }
        buf.copy_from_slice(&self.bytes[addr..addr + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> iss_core::MemResult {
        let addr = addr as usize;
        if addr + buf.len() > self.bytes.len() {
            return Err(1);
        }
        self.bytes[addr..addr + buf.len()].copy_from_slice(buf);
        Ok(())
    }
}

#[test]
fn all_zero_word_is_a_defined_illegal_instruction() {
    let instr = decode(0x0000, 0x1000).expect("dii always decodes");
    assert_eq!(instr.mnemonic, "dii");

    let mut cpu = CpuState::new();
    cpu.instruction_pointer = 0x1000;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);

    assert_eq!(outcome, StepOutcome::Return);
    assert_eq!(cpu.exception, 2);
    assert_eq!(cpu.instruction_pointer, 0x1002);
}

#[test]
fn cli_loads_an_immediate_into_a10() {
    let instr = decode(0x4501, 0x2000).expect("c.li decodes");
    assert_eq!(instr.mnemonic, "cli");

    let mut cpu = CpuState::new();
    cpu.x[10] = 0xdead_beef;
    cpu.instruction_pointer = 0x2000;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);

    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(cpu.read_reg(10), 0);
    assert_eq!(cpu.instruction_pointer, 0x2002);
}

#[test]
fn cjr_returns_via_ra_like_ret() {
    let instr = decode(0x8082, 0x3000).expect("c.jr decodes");
    assert_eq!(instr.mnemonic, "cjr");

    let mut cpu = CpuState::new();
    cpu.x[1] = 0x4444; // ra
    cpu.instruction_pointer = 0x3000;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);

    assert_eq!(outcome, StepOutcome::Return);
    assert_eq!(cpu.exception, 0);
    assert_eq!(cpu.instruction_pointer, 0x4444);
}

#[test]
fn cjr_with_x0_is_reserved() {
    // rs1 field zero: 0x8002 & 0xf07f == 0x8002.
    let instr = decode(0x8002, 0x100).expect("decodes to something");
    assert_eq!(instr.mnemonic, "__reserved_cmv");

    let mut cpu = CpuState::new();
    cpu.instruction_pointer = 0x100;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);
    assert_eq!(outcome, StepOutcome::Return);
    assert_eq!(cpu.exception, 2);
}

#[test]
fn caddi4spn_with_zero_immediate_is_reserved() {
    // Only rd' (bits[4:2]) is set; every immediate-bearing bit is zero, so
    // this exercises caddi4spn's own zero-immediate runtime branch (there is
    // no separate static reserved entry for it, unlike c.lui).
    let instr = decode(0x0004, 0x10).expect("decodes");
    assert_eq!(instr.mnemonic, "caddi4spn");

    let mut cpu = CpuState::new();
    cpu.instruction_pointer = 0x10;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);
    assert_eq!(outcome, StepOutcome::Return);
    assert_eq!(cpu.exception, 2);
}

#[test]
fn clw_then_csw_round_trip_through_memory() {
    let mut cpu = CpuState::new();
    cpu.x[8] = 0x100; // rs1' = x8 maps to the 3-bit field value 0
    cpu.x[9] = 0x1234_5678; // rs2' = x9
    cpu.instruction_pointer = 0x0;
    let mut bus = FlatMemory::new(0x10000);

    // c.sw x9, 0(x8): rs2'=001(x9), rs1'=000(x8), uimm=0.
    let sw = decode(0xc004, 0x0).expect("c.sw decodes");
    assert_eq!(sw.mnemonic, "csw");
    exec_codeset(&sw.code, &mut cpu, &mut bus);

    // c.lw x10, 0(x8): rd'=010(x10), rs1'=000(x8), uimm=0.
    let lw = decode(0x4008, 0x2).expect("c.lw decodes");
    assert_eq!(lw.mnemonic, "clw");
    exec_codeset(&lw.code, &mut cpu, &mut bus);

    assert_eq!(cpu.read_reg(10), 0x1234_5678);
}

#[test]
fn cbeqz_taken_branch_diverts_pc_and_returns() {
    // c.beqz x8, +0 (rs1'=000(x8), offset fields all zero).
    let instr = decode(0xc001, 0x1000).expect("c.beqz decodes");
    assert_eq!(instr.mnemonic, "cbeqz");

    let mut cpu = CpuState::new();
    cpu.instruction_pointer = 0x1000;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);

    assert_eq!(outcome, StepOutcome::Return);
    assert_eq!(cpu.instruction_pointer, 0x1000);
}

#[test]
fn cbeqz_not_taken_falls_through_without_returning() {
    let instr = decode(0xc001, 0x1000).expect("c.beqz decodes");

    let mut cpu = CpuState::new();
    cpu.x[8] = 1; // rs1' = x8, nonzero so the branch is not taken
    cpu.instruction_pointer = 0x1000;
    let mut bus = FlatMemory::new(0x10000);
    let outcome = exec_codeset(&instr.code, &mut cpu, &mut bus);

    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(cpu.instruction_pointer, 0x1002);
}
