//! The GDB server state machine and packet dispatch (spec §4.F, §4.G).

use gdb_rsp::Event;
use iss_core::{CpuState, DebugCore, Endianness, SystemBus};

use crate::breakpoints::{BreakpointDb, BreakpointFlags};
use crate::transport::Transport;

/// `execute_skip_count` the source defaults to: between-block polls happen
/// only once every this-many `execute()` calls.
pub const DEFAULT_EXECUTE_SKIP_COUNT: u32 = 25;
/// `minimal_pc_alignment` the source defaults to (RVC instructions are
/// 2-byte aligned).
pub const DEFAULT_MINIMAL_PC_ALIGNMENT: u32 = 2;

/// Sentinel `post_mem_access_callback` returns in place of an exception
/// cause when the debugger sent `k` mid-fault-handling. Distinct from every
/// real `ExceptionCause` code (which all fit in a handful of low values).
pub const CPU_TERMINATED: u32 = u32::MAX;

/// Errors surfaced while serving a packet, logged at the dispatch site and
/// reported to the debugger as `EFF`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("system bus rejected access at {addr:#x}: raw code {raw}")]
    BusFault { addr: u64, raw: u32 },
}

/// What the CPU executor should do after a guard-hook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunControl {
    /// Proceed with (or continue) execution normally.
    Continue,
    /// The debugger killed the target; the interpreter must unwind and exit.
    Terminated,
}

enum DispatchOutcome {
    Send(String),
    NoResponse,
}

/// Cooperative GDB RSP server: owns the breakpoint/watchpoint index and the
/// `Running`/`Paused`/`Killed` state, and is re-entered from the CPU
/// executor's callbacks rather than running on its own thread.
pub struct Server<C, T> {
    core: C,
    transport: T,
    reader: gdb_rsp::Reader,
    breakpoints: BreakpointDb,
    watchpoints: BreakpointDb,
    status_paused: bool,
    gdb_status_paused: bool,
    status_step: u32,
    status_pending_jump: bool,
    status_jumpaddr: u64,
    status_pending_kill: bool,
    execute_skip_count: u32,
    execute_skip_index: u32,
    minimal_pc_alignment: u32,
}

impl<C: DebugCore, T: Transport> Server<C, T> {
    /// Build a server. Enters `Paused` immediately, per the state machine's
    /// `init` transition.
    pub fn new(core: C, transport: T, execute_skip_count: u32, minimal_pc_alignment: u32) -> Self {
        Self {
            core,
            transport,
            reader: gdb_rsp::Reader::new(),
            breakpoints: BreakpointDb::new(),
            watchpoints: BreakpointDb::new(),
            status_paused: true,
            gdb_status_paused: true,
            status_step: 0,
            status_pending_jump: false,
            status_jumpaddr: 0,
            status_pending_kill: false,
            execute_skip_count,
            execute_skip_index: 0,
            minimal_pc_alignment,
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.status_paused
    }

    #[must_use]
    pub fn breakpoints(&self) -> &BreakpointDb {
        &self.breakpoints
    }

    #[must_use]
    pub fn watchpoints(&self) -> &BreakpointDb {
        &self.watchpoints
    }

    /// Runs before every instruction. Checks the instruction-breakpoint
    /// index, applies a pending single-step, and spins on `handle_packet`
    /// while paused.
    pub fn pre_instruction_callback(&mut self, cpu: &mut CpuState, bus: &mut dyn SystemBus) -> RunControl {
        if !self.breakpoints.is_empty() {
            let pc = self.core.instruction_pointer(cpu) >> self.minimal_pc_alignment;
            let bp = self.breakpoints.get(pc);
            if bp & (BreakpointFlags::BREAK_HW | BreakpointFlags::BREAK_MEM) != 0 {
                self.status_paused = true;
            }
        }
        if self.status_step > 0 {
            self.status_paused = true;
            self.status_step -= 1;
        }
        if self.status_pending_kill {
            return RunControl::Terminated;
        }
        if self.status_paused {
            self.notify_paused_once();
            while self.status_paused {
                self.handle_packet(true, cpu, bus);
                if self.status_pending_kill {
                    return RunControl::Terminated;
                }
                if self.status_pending_jump {
                    cpu.instruction_pointer = self.status_jumpaddr;
                    self.status_pending_jump = false;
                }
            }
        }
        RunControl::Continue
    }

    /// Runs between compiled blocks. Polls the transport only every
    /// `execute_skip_count` calls, since socket probes are comparatively
    /// expensive.
    pub fn execute(&mut self, cpu: &mut CpuState, bus: &mut dyn SystemBus) -> RunControl {
        if self.status_pending_kill {
            return RunControl::Terminated;
        }
        let should_poll = self.execute_skip_index > self.execute_skip_count;
        self.execute_skip_index += 1;
        if should_poll {
            self.execute_skip_index = 0;
            self.handle_packet(false, cpu, bus);
        }
        if self.status_pending_kill {
            return RunControl::Terminated;
        }
        RunControl::Continue
    }

    /// Runs after a memory access. `exception != 0` forces a pause; while
    /// paused, a debugger-requested jump clears the exception (the
    /// instruction is considered handled).
    pub fn post_mem_access_callback(
        &mut self,
        mut exception: u32,
        cpu: &mut CpuState,
        bus: &mut dyn SystemBus,
    ) -> u32 {
        if exception != 0 {
            self.status_paused = true;
        }
        if self.status_paused {
            self.notify_paused_once();
            while self.status_paused {
                self.handle_packet(true, cpu, bus);
                if self.status_pending_kill {
                    return CPU_TERMINATED;
                }
                if self.status_pending_jump {
                    cpu.instruction_pointer = self.status_jumpaddr;
                    self.status_pending_jump = false;
                    exception = 0;
                }
            }
        }
        exception
    }

    pub fn pre_d_read_callback(&mut self, addr: u64) {
        if !self.watchpoints.is_empty() && self.watchpoints.get(addr) & BreakpointFlags::WATCH_READ != 0 {
            self.status_paused = true;
        }
    }

    pub fn pre_d_write_callback(&mut self, addr: u64) {
        if !self.watchpoints.is_empty() && self.watchpoints.get(addr) & BreakpointFlags::WATCH_WRITE != 0 {
            self.status_paused = true;
        }
    }

    fn notify_paused_once(&mut self) {
        if !self.gdb_status_paused {
            self.transport.write(&gdb_rsp::encode_packet(&format!("T{}", gdb_rsp::hex::from_byte(5))));
            self.gdb_status_paused = true;
        }
        self.status_paused = true;
    }

    fn poll_event(&mut self, block: bool) -> Option<Event> {
        if let Some(event) = self.reader.next_event() {
            return Some(event);
        }
        let bytes = self.transport.try_read(block)?;
        self.reader.feed(&bytes);
        self.reader.next_event()
    }

    /// Pop and act on at most one buffered RSP event. `block` mirrors the
    /// source's `con_.available(block)`: the pre-instruction/post-mem-access
    /// paths block until something arrives, the between-block path does not.
    pub fn handle_packet(&mut self, block: bool, cpu: &mut CpuState, bus: &mut dyn SystemBus) {
        let Some(event) = self.poll_event(block) else {
            return;
        };
        match event {
            Event::Ack | Event::Nack | Event::Notification(_) => {}
            Event::ChecksumError(err) => {
                tracing::debug!(%err, "nacking malformed packet");
                self.transport.write(&gdb_rsp::encode_nack());
            }
            Event::Interrupt => self.notify_paused_once(),
            Event::Packet(command) => {
                if command.is_empty() {
                    return;
                }
                if !self.status_paused {
                    self.notify_paused_once();
                }
                self.transport.write(&gdb_rsp::encode_ack());
                match self.dispatch(&command, cpu, bus) {
                    DispatchOutcome::Send(answer) => {
                        self.transport.write(&gdb_rsp::encode_packet(&answer));
                    }
                    DispatchOutcome::NoResponse => {}
                }
            }
        }
    }

    fn dispatch(&mut self, command: &str, cpu: &mut CpuState, bus: &mut dyn SystemBus) -> DispatchOutcome {
        let endianness = self.core.endianness();
        let bytes = command.as_bytes();
        match bytes[0] {
            b'g' => {
                let mut answer = String::new();
                for i in 0..self.core.mapped_register_count() {
                    let (Some(width), Some(value)) =
                        (self.core.register_width(i), self.core.read_mapped_register(cpu, i))
                    else {
                        return DispatchOutcome::Send("EFF".to_string());
                    };
                    answer.push_str(&encode_reg(value, width, endianness));
                }
                DispatchOutcome::Send(answer)
            }
            b'G' => {
                let total_bytes: usize =
                    (0..self.core.mapped_register_count()).filter_map(|i| self.core.register_width(i)).sum();
                if command.len() != total_bytes * 2 + 1 {
                    return DispatchOutcome::Send("E11".to_string());
                }
                let mut off = 1;
                for i in 0..self.core.mapped_register_count() {
                    let Some(width) = self.core.register_width(i) else {
                        return DispatchOutcome::Send("EFF".to_string());
                    };
                    let Some(value) = decode_reg(&command[off..off + width * 2], endianness) else {
                        return DispatchOutcome::Send("EFF".to_string());
                    };
                    self.core.write_mapped_register(cpu, i, value);
                    off += width * 2;
                }
                DispatchOutcome::Send("OK".to_string())
            }
            b'P' => {
                let mut reg_index: usize = 0;
                let mut value_to_write: Option<&str> = None;
                for (i, c) in command.char_indices().skip(1) {
                    if c == '=' && command.len() > i + 1 {
                        value_to_write = Some(&command[i + 1..]);
                        break;
                    }
                    let Some(digit) = gdb_rsp::hex::from_hex(c as u8) else { break };
                    reg_index = (reg_index << 4) | digit as usize;
                }
                let Some(val) = value_to_write else {
                    return DispatchOutcome::Send(String::new());
                };
                if self.core.register_width(reg_index).is_none() {
                    let err = iss_core::IssError::UnmappedRegister { index: reg_index };
                    tracing::warn!(%err, "P packet targets an unmapped register");
                    return DispatchOutcome::Send("EFF".to_string());
                }
                let Some(value) = decode_reg(val, endianness) else {
                    return DispatchOutcome::Send("EFF".to_string());
                };
                self.core.write_mapped_register(cpu, reg_index, value);
                DispatchOutcome::Send("OK".to_string())
            }
            b'p' => {
                let mut reg_index: usize = 0;
                for c in command.chars().skip(1) {
                    let Some(digit) = gdb_rsp::hex::from_hex(c as u8) else { break };
                    reg_index = (reg_index << 4) | digit as usize;
                }
                let (Some(width), Some(value)) =
                    (self.core.register_width(reg_index), self.core.read_mapped_register(cpu, reg_index))
                else {
                    let err = iss_core::IssError::UnmappedRegister { index: reg_index };
                    tracing::warn!(%err, "p packet targets an unmapped register");
                    return DispatchOutcome::Send("EFF".to_string());
                };
                DispatchOutcome::Send(encode_reg(value, width, endianness))
            }
            b'm' => {
                let Some((addr, len)) = parse_addr_len(&command[1..]) else {
                    return DispatchOutcome::Send("EFF".to_string());
                };
                let mut buf = vec![0u8; len as usize];
                match bus.debug_read(addr, &mut buf) {
                    Ok(()) => DispatchOutcome::Send(gdb_rsp::hex::encode_bytes(&buf)),
                    Err(raw) => {
                        let err = ServerError::BusFault { addr, raw };
                        tracing::warn!(%err, "m packet");
                        DispatchOutcome::Send("EFF".to_string())
                    }
                }
            }
            b'M' => {
                let Some((head, payload)) = command[1..].split_once(':') else {
                    return DispatchOutcome::Send("EFF".to_string());
                };
                let Some((addr, len)) = parse_addr_len(head) else {
                    return DispatchOutcome::Send("EFF".to_string());
                };
                let Some(write_bytes) = gdb_rsp::hex::decode_bytes(payload) else {
                    return DispatchOutcome::Send("EFF".to_string());
                };
                if write_bytes.len() != len as usize {
                    return DispatchOutcome::Send("EFF".to_string());
                }
                match bus.debug_write(addr, &write_bytes) {
                    Ok(()) => DispatchOutcome::Send("OK".to_string()),
                    Err(raw) => {
                        let err = ServerError::BusFault { addr, raw };
                        tracing::warn!(%err, "M packet");
                        DispatchOutcome::Send("EFF".to_string())
                    }
                }
            }
            b'c' => {
                if command.len() > 1 {
                    if let Some(addr) = gdb_rsp::hex::decode_u64(&command[1..]) {
                        self.status_jumpaddr = addr;
                        self.status_pending_jump = true;
                    }
                }
                self.status_paused = false;
                self.gdb_status_paused = false;
                self.status_step = 0;
                DispatchOutcome::NoResponse
            }
            b's' => {
                if command.len() > 1 {
                    if let Some(addr) = gdb_rsp::hex::decode_u64(&command[1..]) {
                        self.status_jumpaddr = addr;
                        self.status_pending_jump = true;
                    }
                }
                self.status_paused = false;
                self.gdb_status_paused = false;
                self.status_step = 1;
                DispatchOutcome::NoResponse
            }
            b'?' => DispatchOutcome::Send(format!("T{}", gdb_rsp::hex::from_byte(5))),
            b'v' => DispatchOutcome::Send(String::new()),
            b'W' => {
                self.status_paused = true;
                DispatchOutcome::NoResponse
            }
            b'Z' => self.insert_breakpoint(command),
            b'z' => self.remove_breakpoint(command),
            b'q' => self.query(command),
            b'k' => {
                self.status_pending_kill = true;
                DispatchOutcome::NoResponse
            }
            b'H' => {
                if bytes.len() > 1 && matches!(bytes[1], b'c' | b'g') {
                    DispatchOutcome::Send("OK".to_string())
                } else {
                    DispatchOutcome::Send(String::new())
                }
            }
            _ => DispatchOutcome::Send(String::new()),
        }
    }

    fn insert_breakpoint(&mut self, command: &str) -> DispatchOutcome {
        let bytes = command.as_bytes();
        if command.len() <= 2 || bytes[2] != b',' {
            return DispatchOutcome::Send(String::new());
        }
        let Some((db, requested_flags, is_breakpoint)) = self.select_breakpoint_db(bytes[1]) else {
            return DispatchOutcome::Send(String::new());
        };
        let addr_str = leading_hex_run(&command[3..]);
        if addr_str.is_empty() {
            return DispatchOutcome::Send("EFF".to_string());
        }
        let Some(mut addr) = gdb_rsp::hex::decode_u64(addr_str) else {
            return DispatchOutcome::Send("EFF".to_string());
        };
        if is_breakpoint {
            addr >>= self.minimal_pc_alignment;
        }
        let existing = db.get(addr);
        if existing & requested_flags != requested_flags {
            db.set(addr, existing | requested_flags);
        }
        DispatchOutcome::Send("OK".to_string())
    }

    fn remove_breakpoint(&mut self, command: &str) -> DispatchOutcome {
        let bytes = command.as_bytes();
        if command.len() <= 2 || bytes[2] != b',' {
            return DispatchOutcome::Send(String::new());
        }
        let Some((db, flags_to_delete, _is_breakpoint)) = self.select_breakpoint_db(bytes[1]) else {
            return DispatchOutcome::Send(String::new());
        };
        let addr_str = leading_hex_run(&command[3..]);
        if addr_str.is_empty() {
            return DispatchOutcome::Send("EFF".to_string());
        }
        let Some(raw_addr) = gdb_rsp::hex::decode_u64(addr_str) else {
            return DispatchOutcome::Send("EFF".to_string());
        };
        // Source bug, preserved: unlike `Z`, the shift here is unconditional,
        // so removing a watchpoint shifts an address that was never shifted
        // when it was installed.
        let addr = raw_addr >> self.minimal_pc_alignment;
        let existing = db.get(addr);
        if existing & flags_to_delete != 0 {
            db.set(addr, existing & !flags_to_delete);
        }
        DispatchOutcome::Send("OK".to_string())
    }

    fn select_breakpoint_db(&self, type_char: u8) -> Option<(&BreakpointDb, u32, bool)> {
        match type_char {
            b'0' => Some((&self.breakpoints, BreakpointFlags::BREAK_MEM, true)),
            b'1' => Some((&self.breakpoints, BreakpointFlags::BREAK_HW, true)),
            b'2' => Some((&self.watchpoints, BreakpointFlags::WATCH_WRITE, false)),
            b'3' => Some((&self.watchpoints, BreakpointFlags::WATCH_READ, false)),
            b'4' => Some((&self.watchpoints, BreakpointFlags::WATCH_READ | BreakpointFlags::WATCH_WRITE, false)),
            _ => None,
        }
    }

    fn query(&self, command: &str) -> DispatchOutcome {
        let rest = &command[1..];
        if rest.starts_with("Supported") {
            DispatchOutcome::Send("PacketSize=8000;qXfer:features:read+;".to_string())
        } else if rest.starts_with("Attached") {
            DispatchOutcome::Send("0".to_string())
        } else if rest.starts_with("Symbol::") {
            DispatchOutcome::Send("OK".to_string())
        } else if rest.starts_with('C') {
            DispatchOutcome::Send("0".to_string())
        } else if rest.starts_with("TStatus") {
            DispatchOutcome::Send("T0;tnotrun:0".to_string())
        } else if rest.starts_with("fThreadInfo") {
            DispatchOutcome::Send("m1".to_string())
        } else if rest.starts_with("sThreadInfo") {
            DispatchOutcome::Send("l".to_string())
        } else if rest.starts_with("Xfer") {
            match parse_qxfer_target_xml(command) {
                Some((off, len)) => DispatchOutcome::Send(crate::target_xml::qxfer_chunk(off, len)),
                None => DispatchOutcome::Send(String::new()),
            }
        } else {
            DispatchOutcome::Send(String::new())
        }
    }
}

fn leading_hex_run(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(s.len());
    &s[..end]
}

fn parse_addr_len(s: &str) -> Option<(u64, u32)> {
    let (addr_s, len_s) = s.split_once(',')?;
    let addr = gdb_rsp::hex::decode_u64(addr_s)?;
    let len = gdb_rsp::hex::decode_u64(len_s)?;
    Some((addr, len as u32))
}

fn parse_qxfer_target_xml(command: &str) -> Option<(usize, usize)> {
    let params = command.rsplit(':').next()?;
    let (off, len) = params.split_once(',')?;
    let off = usize::from_str_radix(off, 16).ok()?;
    let len = usize::from_str_radix(len, 16).ok()?;
    Some((off, len))
}

fn encode_reg(value: u64, width: usize, endianness: Endianness) -> String {
    let mut bytes = value.to_le_bytes()[..width].to_vec();
    if endianness == Endianness::Big {
        bytes.reverse();
    }
    gdb_rsp::hex::encode_bytes(&bytes)
}

fn decode_reg(hex: &str, endianness: Endianness) -> Option<u64> {
    let mut bytes = gdb_rsp::hex::decode_bytes(hex)?;
    if endianness == Endianness::Big {
        bytes.reverse();
    }
    bytes.resize(8, 0);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback::Loopback;
    use iss_core::Rv64DebugCore;

    struct FlatMemory(Vec<u8>);
    impl SystemBus for FlatMemory {
        fn read(&mut self, addr: u64, buf: &mut [u8]) -> iss_core::MemResult {
            buf.copy_from_slice(&self.0[addr as usize..addr as usize + buf.len()]);
            Ok(())
        }
        fn write(&mut self, addr: u64, buf: &[u8]) -> iss_core::MemResult {
            self.0[addr as usize..addr as usize + buf.len()].copy_from_slice(buf);
            Ok(())
        }
    }

    fn new_server() -> (Server<Rv64DebugCore, Loopback>, Loopback) {
        let transport = Loopback::new();
        let server = Server::new(Rv64DebugCore, transport.clone(), DEFAULT_EXECUTE_SKIP_COUNT, DEFAULT_MINIMAL_PC_ALIGNMENT);
        (server, transport)
    }

    #[test]
    fn starts_paused() {
        let (server, _t) = new_server();
        assert!(server.is_paused());
    }

    #[test]
    fn question_mark_reports_last_stop_reason() {
        let (mut server, transport) = new_server();
        let mut cpu = CpuState::new();
        let mut bus = FlatMemory(vec![0; 0x100]);
        transport.push_incoming(&gdb_rsp::encode_packet("?"));
        server.handle_packet(false, &mut cpu, &mut bus);
        let sent = transport.sent_bytes();
        let sent = String::from_utf8_lossy(&sent);
        assert!(sent.contains("$T05#"));
    }

    #[test]
    fn continue_clears_paused_state() {
        let (mut server, transport) = new_server();
        let mut cpu = CpuState::new();
        let mut bus = FlatMemory(vec![0; 0x100]);
        transport.push_incoming(&gdb_rsp::encode_packet("c"));
        server.handle_packet(false, &mut cpu, &mut bus);
        assert!(!server.is_paused());
    }

    #[test]
    fn set_breakpoint_then_remove_round_trips() {
        let (mut server, transport) = new_server();
        let mut cpu = CpuState::new();
        let mut bus = FlatMemory(vec![0; 0x100]);
        transport.push_incoming(&gdb_rsp::encode_packet("Z0,1000,2"));
        server.handle_packet(false, &mut cpu, &mut bus);
        assert_eq!(server.breakpoints().get(0x1000 >> DEFAULT_MINIMAL_PC_ALIGNMENT), BreakpointFlags::BREAK_MEM);

        transport.push_incoming(&gdb_rsp::encode_packet("z0,1000,2"));
        server.handle_packet(false, &mut cpu, &mut bus);
        assert_eq!(server.breakpoints().get(0x1000 >> DEFAULT_MINIMAL_PC_ALIGNMENT), 0);
        assert!(server.breakpoints().is_empty());
    }

    #[test]
    fn read_all_registers_reports_x10_at_its_mapped_offset() {
        let (mut server, transport) = new_server();
        let mut cpu = CpuState::new();
        cpu.x[10] = 0x2a;
        let mut bus = FlatMemory(vec![0; 0x100]);
        transport.push_incoming(&gdb_rsp::encode_packet("g"));
        server.handle_packet(false, &mut cpu, &mut bus);
        let sent = transport.sent_bytes();
        let sent = String::from_utf8_lossy(&sent);
        assert!(sent.starts_with("+$"));
        let reg10_offset = 10 * 16; // 8 bytes/register, 2 hex digits/byte
        let answer_start = sent.find('$').unwrap() + 1;
        let reg10_hex = &sent[answer_start + reg10_offset..answer_start + reg10_offset + 16];
        assert_eq!(reg10_hex, "2a00000000000000");
    }

    #[test]
    fn t05_is_sent_only_once_across_a_run_pause_transition() {
        let (mut server, transport) = new_server();
        let mut cpu = CpuState::new();
        let mut bus = FlatMemory(vec![0; 0x100]);
        transport.push_incoming(&gdb_rsp::encode_packet("c"));
        server.handle_packet(false, &mut cpu, &mut bus);
        assert!(!server.is_paused());

        server.pre_d_write_callback(0);
        server.status_paused = true;
        server.notify_paused_once();
        server.notify_paused_once();
        let sent = transport.sent_bytes();
        let count = String::from_utf8_lossy(&sent).matches("T05").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn watchpoint_write_hit_pauses_the_cpu() {
        let (mut server, transport) = new_server();
        transport.push_incoming(&gdb_rsp::encode_packet("Z2,40,1"));
        let mut cpu = CpuState::new();
        let mut bus = FlatMemory(vec![0; 0x100]);
        server.handle_packet(false, &mut cpu, &mut bus);
        transport.push_incoming(&gdb_rsp::encode_packet("c"));
        server.handle_packet(false, &mut cpu, &mut bus);
        assert!(!server.is_paused());

        server.pre_d_write_callback(0x40);
        assert!(server.is_paused());
    }
}
