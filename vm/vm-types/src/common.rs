/// 32-bit sandbox addresses
pub type MemAddress = u32;

/// 64-bit register values
pub type RegValue = u64;

/// Register index into the VM register file
pub type RegIndex = usize;
