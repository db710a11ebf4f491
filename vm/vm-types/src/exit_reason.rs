use crate::common::MemAddress;

/// Why an interpreter run stopped. Every run terminates with exactly one of
/// these; there is no partial-result state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The program executed `exit`; `result` is the value left in `r0`.
    Halted { result: i64 },
    /// The branch budget ran dry before the program terminated.
    OutOfBudget,
    /// The program violated the sandbox contract.
    Faulted(FaultReason),
}

/// Sandbox contract violations that stop a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultReason {
    /// Opcode byte not part of the instruction set.
    InvalidOpcode(u8),
    /// Register index outside the register file.
    InvalidRegister(u8),
    /// Program counter left the code area.
    PcOutOfBounds,
    /// Load or store outside every declared region.
    AccessViolation { address: MemAddress, write: bool },
    /// Division or modulo by zero.
    DivisionByZero,
}

impl core::fmt::Display for FaultReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FaultReason::InvalidOpcode(op) => write!(f, "invalid opcode {op:#04x}"),
            FaultReason::InvalidRegister(r) => write!(f, "invalid register r{r}"),
            FaultReason::PcOutOfBounds => write!(f, "program counter out of bounds"),
            FaultReason::AccessViolation { address, write } => {
                let kind = if *write { "write" } else { "read" };
                write!(f, "{kind} access violation at {address:#010x}")
            }
            FaultReason::DivisionByZero => write!(f, "division by zero"),
        }
    }
}
