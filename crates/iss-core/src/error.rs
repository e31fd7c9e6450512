//! Shared error type for cross-crate fallible operations.

/// Errors that can surface from CPU/system-level operations shared across
/// the decoder and the GDB stub.
#[derive(Debug, thiserror::Error)]
pub enum IssError {
    #[error("memory access fault at {addr:#x}: raw code {raw}")]
    MemoryFault { addr: u64, raw: u32 },

    #[error("mapped register {index} is not implemented by this debug core")]
    UnmappedRegister { index: usize },
}
