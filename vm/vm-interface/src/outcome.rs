use bg_vm_types::exit_reason::{ExitReason, FaultReason};

/// The outcome of one execution attempt, produced exactly once per run.
///
/// `BudgetExhausted` and `Fault` are regular outcomes, not engine errors:
/// the program ran and was stopped at the sandbox boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Regular halt with the program's return value.
    Completed(i64),
    /// Stopped after exhausting the branch budget.
    BudgetExhausted,
    /// Stopped on a sandbox contract violation.
    Fault(FaultReason),
}

impl From<ExitReason> for ExecutionOutcome {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::Halted { result } => ExecutionOutcome::Completed(result),
            ExitReason::OutOfBudget => ExecutionOutcome::BudgetExhausted,
            ExitReason::Faulted(fault) => ExecutionOutcome::Fault(fault),
        }
    }
}
