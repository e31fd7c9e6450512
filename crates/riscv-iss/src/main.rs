//! Standalone RVC interpreter with an attached GDB remote-debug stub.
//!
//! Wires [`rvc_decode`]'s decoder and [`gdb_server`]'s `Server` around a flat
//! memory image: fetch, decode, run the pre-instruction guard, execute, run
//! the post-memory-access callback, repeat.

mod bus;
mod tcp_transport;

use std::net::TcpListener;
use std::path::PathBuf;

use clap::Parser;
use gdb_server::{RunControl, Server, Transport, CPU_TERMINATED, DEFAULT_EXECUTE_SKIP_COUNT, DEFAULT_MINIMAL_PC_ALIGNMENT};
use iss_core::{CpuState, ExceptionCause, Rv64DebugCore, SystemBus};

use bus::FlatMemory;
use tcp_transport::TcpTransport;

#[derive(Parser)]
#[command(about = "RVC instruction-set simulator with a GDB remote-debug stub")]
struct Cli {
    /// TCP port the GDB stub listens on.
    #[arg(long, default_value_t = 2222)]
    port: u16,

    /// Between-block packet polls happen every this-many `execute()` calls.
    #[arg(long = "skip-count", default_value_t = DEFAULT_EXECUTE_SKIP_COUNT)]
    skip_count: u32,

    /// Right-shift applied to breakpoint addresses (RVC is 2-byte aligned).
    #[arg(long = "min-pc-align", default_value_t = DEFAULT_MINIMAL_PC_ALIGNMENT)]
    min_pc_align: u32,

    /// Flat binary image of RVC instructions, loaded at address 0.
    #[arg(long)]
    program: PathBuf,

    /// Size in bytes of the simulated address space.
    #[arg(long = "memory-size", default_value_t = 0x1_0000)]
    memory_size: usize,
}

/// Wraps the real memory bus so that every load/store also runs the
/// watchpoint hooks (spec §4.G, §5: the pre-instruction guard and the
/// post-memory-access callback are the CPU thread's only suspension points).
struct DebugBus<'a, T: Transport> {
    inner: &'a mut FlatMemory,
    server: &'a mut Server<Rv64DebugCore, T>,
}

impl<T: Transport> SystemBus for DebugBus<'_, T> {
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> iss_core::MemResult {
        self.server.pre_d_read_callback(addr);
        self.inner.read(addr, buf)
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> iss_core::MemResult {
        self.server.pre_d_write_callback(addr);
        self.inner.write(addr, buf)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let program = std::fs::read(&cli.program)?;
    let mut bus = FlatMemory::new(cli.memory_size);
    bus.load(0, &program)?;

    let listener = TcpListener::bind(("0.0.0.0", cli.port))?;
    tracing::info!(port = cli.port, "waiting for gdb to connect");
    let (stream, peer) = listener.accept()?;
    tracing::info!(%peer, "gdb connected");
    let transport = TcpTransport::new(stream)?;

    let mut server = Server::new(Rv64DebugCore, transport, cli.skip_count, cli.min_pc_align);
    let mut cpu = CpuState::new();

    loop {
        if server.pre_instruction_callback(&mut cpu, &mut bus) == RunControl::Terminated {
            tracing::info!("target killed by debugger");
            break;
        }

        let mut word_bytes = [0u8; 2];
        if bus.read(cpu.instruction_pointer, &mut word_bytes).is_err() {
            cpu.exception = bus.translate_exc_code(1);
            cpu.instruction_pointer = cpu.instruction_pointer.wrapping_add(2);
            continue;
        }

        let word = u16::from_le_bytes(word_bytes);
        // The opcode table's `dii`/reserved entries cover every 16-bit
        // pattern (see rvc_decode's `every_word_decodes_to_something`), so
        // this is unreachable in practice; fail safe rather than panic.
        let Some(instr) = rvc_decode::decode(word, cpu.instruction_pointer) else {
            cpu.exception = ExceptionCause::IllegalInstruction.code();
            cpu.instruction_pointer = cpu.instruction_pointer.wrapping_add(2);
            continue;
        };

        {
            let mut debug_bus = DebugBus { inner: &mut bus, server: &mut server };
            rvc_decode::exec_codeset(&instr.code, &mut cpu, &mut debug_bus);
        }

        let exception = cpu.exception;
        cpu.exception = server.post_mem_access_callback(exception, &mut cpu, &mut bus);
        if cpu.exception == CPU_TERMINATED {
            tracing::info!("target killed by debugger");
            break;
        }

        if server.execute(&mut cpu, &mut bus) == RunControl::Terminated {
            tracing::info!("target killed by debugger");
            break;
        }
    }

    Ok(())
}
