use bg_vm_types::constants::MAX_PROGRAM_SIZE;
use thiserror::Error;

/// Structural defects in a bytecode image, caught before execution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("bytecode image is empty")]
    Empty,
    #[error("bytecode length {0} is not a multiple of the instruction size")]
    Misaligned(usize),
    #[error("bytecode length {0} exceeds the image size limit of {MAX_PROGRAM_SIZE}")]
    TooLarge(usize),
}
