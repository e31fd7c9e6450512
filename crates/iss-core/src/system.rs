//! The system callback table (spec §2): memory I/O and exception translation.

/// Result of a memory access requested through [`SystemBus`].
///
/// `Ok(())` mirrors ETISS's `RETURNCODE::NOERROR == 0`; any error variant
/// corresponds to a non-zero return from `dread`/`dwrite`/`dbg_read`/`dbg_write`.
pub type MemResult = Result<(), u32>;

/// Memory and debug-memory access, as seen by emitted RVC fragments and by
/// the GDB server's `m`/`M` packet handlers.
///
/// This is the host-provided callback table referenced throughout spec §4 —
/// `system->dread`/`dwrite` for instruction-driven accesses and
/// `system->dbg_read`/`dbg_write` for GDB's out-of-band `m`/`M` packets.
pub trait SystemBus {
    /// Load `buf.len()` bytes from `addr`, as executed by a load instruction.
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> MemResult;

    /// Store `buf` to `addr`, as executed by a store instruction.
    fn write(&mut self, addr: u64, buf: &[u8]) -> MemResult;

    /// Debugger-initiated read (GDB `m` packet). Defaults to [`SystemBus::read`].
    fn debug_read(&mut self, addr: u64, buf: &mut [u8]) -> MemResult {
        self.read(addr, buf)
    }

    /// Debugger-initiated write (GDB `M` packet). Defaults to [`SystemBus::write`].
    fn debug_write(&mut self, addr: u64, buf: &[u8]) -> MemResult {
        self.write(addr, buf)
    }

    /// Translate a raw bus error code into the CPU's exception-cause space.
    ///
    /// The default simply raises a generic illegal-instruction-class fault;
    /// concrete systems may map bus error codes onto more specific causes.
    fn translate_exc_code(&self, _raw: u32) -> u32 {
        crate::ExceptionCause::IllegalInstruction.code()
    }
}
