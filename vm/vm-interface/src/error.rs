use bg_vm_core::error::ProgramError;
use bg_vm_types::constants::{CONTEXT_CAPACITY, MAX_REGIONS};
use thiserror::Error;

/// Rejections raised before the VM is ever invoked. `prepare` fails closed:
/// any of these means the execution context never reaches the interpreter.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("ProgramError: {0}")]
    ProgramError(#[from] ProgramError),
    #[error("too many regions: {0} (limit {MAX_REGIONS})")]
    TooManyRegions(usize),
    #[error("region slot {0} is empty")]
    EmptyRegion(usize),
    #[error("region slot {slot} of {len} octets overruns its virtual window")]
    RegionTooLarge { slot: usize, len: usize },
    #[error("caller context blob of {0} octets exceeds the capacity of {CONTEXT_CAPACITY}")]
    CallerBlobTooLarge(usize),
}
