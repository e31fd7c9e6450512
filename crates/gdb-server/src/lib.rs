//! GDB Remote Serial Protocol debug stub (spec §4.D, §4.F, §4.G): the
//! breakpoint/watchpoint index, the fixed target-description document, and
//! the server state machine that dispatches decoded RSP packets against a
//! core through [`iss_core::DebugCore`] and [`iss_core::SystemBus`].

pub mod breakpoints;
pub mod server;
pub mod target_xml;
pub mod transport;

pub use breakpoints::{BreakpointDb, BreakpointFlags};
pub use server::{RunControl, Server, ServerError, CPU_TERMINATED, DEFAULT_EXECUTE_SKIP_COUNT, DEFAULT_MINIMAL_PC_ALIGNMENT};
pub use target_xml::{qxfer_chunk, TARGET_XML};
pub use transport::Transport;
