//! VM-specific constants
use crate::common::MemAddress;

/// The number of VM registers (`r0`..`r10`).
pub const REGISTERS_COUNT: usize = 11;

/// Length of a single instruction in octets. All instructions are fixed-width.
pub const INSTRUCTION_SIZE: usize = 8;

/// Size limit for one bytecode image in octets.
pub const MAX_PROGRAM_SIZE: usize = 2048;

/// Size of the execution stack in octets. The stack buffer is owned by the
/// engine and re-zeroed before every run.
pub const STACK_SIZE: usize = 512;

/// Sandbox address of the lowest stack byte. `r10` starts one past the top.
pub const STACK_BASE: MemAddress = 0x1000_0000;

/// Sandbox address where the caller context blob is mapped, read-only.
pub const CONTEXT_BASE: MemAddress = 0x2000_0000;

/// Size limit for the caller context blob in octets.
pub const CONTEXT_CAPACITY: usize = 64;

/// Sandbox address of region slot 0. Slot `i` is mapped at
/// `REGION_SPACE_BASE + i * REGION_WINDOW_SIZE`.
pub const REGION_SPACE_BASE: MemAddress = 0x4000_0000;

/// Virtual window reserved per region slot. A region longer than its window
/// would run into the next slot's window and is rejected at prepare time.
pub const REGION_WINDOW_SIZE: MemAddress = 0x0100_0000;

/// Maximum number of caller-supplied memory regions per execution.
pub const MAX_REGIONS: usize = 4;

/// Default number of control-flow instructions a program may execute.
pub const DEFAULT_BRANCH_BUDGET: u32 = 100;

/// Sandbox base address of a numbered region slot.
#[inline(always)]
pub fn region_slot_base(slot: usize) -> MemAddress {
    REGION_SPACE_BASE + (slot as MemAddress) * REGION_WINDOW_SIZE
}
