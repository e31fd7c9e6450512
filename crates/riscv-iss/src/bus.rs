//! A flat byte-addressable memory backing [`iss_core::SystemBus`] for the
//! standalone interpreter (spec §6: the system callback table is whatever
//! the embedding tool provides; this is the simplest one that satisfies it).

use iss_core::{MemResult, SystemBus};

pub struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { bytes: vec![0; size] }
    }

    pub fn load(&mut self, addr: u64, data: &[u8]) -> anyhow::Result<()> {
        let start = addr as usize;
        let end = start.checked_add(data.len()).ok_or_else(|| anyhow::anyhow!("program overflows address space"))?;
        anyhow::ensure!(end <= self.bytes.len(), "program does not fit in {} bytes of memory", self.bytes.len());
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }
}

impl SystemBus for FlatMemory {
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> MemResult {
        let start = addr as usize;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.bytes.len()).ok_or(1u32)?;
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> MemResult {
        let start = addr as usize;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.bytes.len()).ok_or(1u32)?;
        self.bytes[start..end].copy_from_slice(buf);
        Ok(())
    }
}
