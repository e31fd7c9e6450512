//! Shared types for the RVC decoder and GDB remote-debug stub.
//!
//! This crate holds the "core-agnostic" abstraction the rest of the
//! workspace is built on: the CPU register-file data model, the debug
//! interface a concrete core exposes to the GDB stub, and the system
//! callback table used for memory access and exception translation.

mod cpu;
mod debug_core;
mod error;
mod exception;
mod system;

pub use cpu::{CpuState, NUM_REGS};
pub use debug_core::{DebugCore, Endianness, Rv64DebugCore};
pub use error::IssError;
pub use exception::ExceptionCause;
pub use system::{MemResult, SystemBus};
