use crate::{error::PrepareError, outcome::ExecutionOutcome};
use bg_vm_core::{
    budget::BranchBudget,
    interpreter::Interpreter,
    program::Program,
    region::{RegionTable, SandboxMemory},
    state::VmState,
};
use bg_vm_types::constants::{
    CONTEXT_BASE, CONTEXT_CAPACITY, MAX_REGIONS, REGION_WINDOW_SIZE, STACK_SIZE,
};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

/// Everything the engine needs for one run. Constructed per request,
/// consumed by one `prepare` + `run`, and never reused: the regions borrow
/// packet memory that is only valid for the request's duration.
pub struct ExecutionContext<'req> {
    pub bytecode: &'req [u8],
    pub regions: RegionTable<'req>,
    pub branch_budget: u32,
}

/// The stack and context buffers reused across runs. Exclusive access is
/// what the engine mutex serializes.
struct EngineCore {
    stack: Box<[u8; STACK_SIZE]>,
    context: [u8; CONTEXT_CAPACITY],
}

/// Process-wide execution engine. The VM stack buffer is a singleton, so at
/// most one execution is in flight at a time: the mutex is acquired by
/// `prepare` and held by the returned [`ReadyExecution`] until `run`
/// finishes. A second concurrent request blocks in `prepare`.
pub struct ExecutionEngine {
    core: Mutex<EngineCore>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            core: Mutex::new(EngineCore {
                stack: Box::new([0u8; STACK_SIZE]),
                context: [0u8; CONTEXT_CAPACITY],
            }),
        }
    }

    /// Validates an execution context, fail closed. On success the stack
    /// buffer has been re-zeroed and the engine lock is held by the
    /// returned handle.
    pub async fn prepare<'eng, 'req>(
        &'eng self,
        ctx: ExecutionContext<'req>,
    ) -> Result<ReadyExecution<'eng, 'req>, PrepareError> {
        let program = Program::parse(ctx.bytecode)?;

        if ctx.regions.len() > MAX_REGIONS {
            return Err(PrepareError::TooManyRegions(ctx.regions.len()));
        }
        for (slot, region) in ctx.regions.iter().enumerate() {
            if region.is_empty() {
                return Err(PrepareError::EmptyRegion(slot));
            }
            if region.len() > REGION_WINDOW_SIZE as usize {
                return Err(PrepareError::RegionTooLarge {
                    slot,
                    len: region.len(),
                });
            }
        }

        let mut guard = self.core.lock().await;
        // No run observes a predecessor's stack contents.
        guard.stack.fill(0);

        Ok(ReadyExecution {
            guard,
            program,
            regions: ctx.regions,
            budget: BranchBudget::new(ctx.branch_budget),
        })
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, exclusive execution slot. Dropping it without running
/// releases the engine.
pub struct ReadyExecution<'eng, 'req> {
    guard: MutexGuard<'eng, EngineCore>,
    program: Program<'req>,
    regions: RegionTable<'req>,
    budget: BranchBudget,
}

impl<'eng, 'req> ReadyExecution<'eng, 'req> {
    /// Runs the program to completion, with `caller_blob` copied into the
    /// sandbox's read-only context window beforehand. Elapsed time brackets
    /// the interpreter call on a monotonic clock and is informational only.
    pub fn run(
        self,
        caller_blob: &[u8],
    ) -> Result<(ExecutionOutcome, Duration), PrepareError> {
        if caller_blob.len() > CONTEXT_CAPACITY {
            return Err(PrepareError::CallerBlobTooLarge(caller_blob.len()));
        }

        let ReadyExecution {
            mut guard,
            program,
            mut regions,
            budget,
        } = self;

        let EngineCore { stack, context } = &mut *guard;
        context[..caller_blob.len()].copy_from_slice(caller_blob);

        let mut state = VmState::new(budget, CONTEXT_BASE as u64, caller_blob.len());
        let mut memory = SandboxMemory::new(
            stack.as_mut_slice(),
            &context[..caller_blob.len()],
            &mut regions,
        );

        let started = Instant::now();
        let reason = Interpreter::run(&mut state, &program, &mut memory);
        let elapsed = started.elapsed();

        tracing::debug!(
            ?reason,
            branches = state.budget.consumed(),
            elapsed_us = elapsed.as_micros() as u64,
            "execution finished"
        );
        Ok((reason.into(), elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_vm_core::{
        program::asm,
        region::{MemoryRegion, RegionTable},
    };
    use bg_vm_types::{
        constants::{region_slot_base, DEFAULT_BRANCH_BUDGET},
        exit_reason::FaultReason,
    };

    fn ctx<'req>(bytecode: &'req [u8], regions: RegionTable<'req>) -> ExecutionContext<'req> {
        ExecutionContext {
            bytecode,
            regions,
            branch_budget: DEFAULT_BRANCH_BUDGET,
        }
    }

    #[tokio::test]
    async fn completes_with_declared_result() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::mov_imm(0, 42), asm::exit()]);
        let ready = engine.prepare(ctx(&code, RegionTable::new())).await.unwrap();
        let (outcome, elapsed) = ready.run(&[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(42));
        assert!(elapsed >= Duration::ZERO);
    }

    #[tokio::test]
    async fn prepare_rejects_empty_bytecode() {
        let engine = ExecutionEngine::new();
        let result = engine.prepare(ctx(&[], RegionTable::new())).await;
        assert!(matches!(result, Err(PrepareError::ProgramError(_))));
    }

    #[tokio::test]
    async fn prepare_rejects_empty_region() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::exit()]);
        let mut backing = [0u8; 0];
        let mut regions = RegionTable::new();
        regions.push(MemoryRegion::read_write(&mut backing));
        let result = engine.prepare(ctx(&code, regions)).await;
        assert!(matches!(result, Err(PrepareError::EmptyRegion(0))));
    }

    #[tokio::test]
    async fn prepare_rejects_excess_regions() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::exit()]);
        let mut backings = [[0u8; 4]; MAX_REGIONS + 1];
        let mut regions = RegionTable::new();
        for backing in backings.iter_mut() {
            regions.push(MemoryRegion::read_write(backing));
        }
        let result = engine.prepare(ctx(&code, regions)).await;
        assert!(matches!(result, Err(PrepareError::TooManyRegions(_))));
    }

    #[tokio::test]
    async fn run_rejects_oversized_caller_blob() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::exit()]);
        let ready = engine.prepare(ctx(&code, RegionTable::new())).await.unwrap();
        let blob = [0u8; CONTEXT_CAPACITY + 1];
        assert!(matches!(
            ready.run(&blob),
            Err(PrepareError::CallerBlobTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn budget_exhaustion_is_an_outcome_not_an_error() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::ja(-1)]);
        let ready = engine.prepare(ctx(&code, RegionTable::new())).await.unwrap();
        let (outcome, _) = ready.run(&[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::BudgetExhausted);
    }

    #[tokio::test]
    async fn sequential_runs_never_observe_prior_stack_contents() {
        let engine = ExecutionEngine::new();

        // First run scribbles on the stack.
        let write = asm::assemble(&[asm::st_dw(10, -8, 0x5a5a), asm::exit()]);
        let ready = engine.prepare(ctx(&write, RegionTable::new())).await.unwrap();
        let (outcome, _) = ready.run(&[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(0));

        // Second run reads the same slot; it must see zeroes.
        let read = asm::assemble(&[asm::ldx_dw(0, 10, -8), asm::exit()]);
        let ready = engine.prepare(ctx(&read, RegionTable::new())).await.unwrap();
        let (outcome, _) = ready.run(&[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(0));
    }

    #[tokio::test]
    async fn region_shrunk_below_its_object_faults() {
        let engine = ExecutionEngine::new();
        // The program expects 16 octets in slot 0 but only 8 are declared.
        let mut backing = [0u8; 8];
        let mut regions = RegionTable::new();
        regions.push(MemoryRegion::read_write(&mut backing));
        let base = region_slot_base(0) as i32;
        let code = asm::assemble(&[
            asm::mov_imm(1, base),
            asm::ldx_dw(0, 1, 8),
            asm::exit(),
        ]);
        let ready = engine.prepare(ctx(&code, regions)).await.unwrap();
        let (outcome, _) = ready.run(&[]).unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Fault(FaultReason::AccessViolation { .. })
        ));
    }

    #[tokio::test]
    async fn engine_serializes_executions() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::mov_imm(0, 1), asm::exit()]);

        // While one prepared execution holds the engine, a second prepare
        // must not complete.
        let ready = engine.prepare(ctx(&code, RegionTable::new())).await.unwrap();
        let second = engine.prepare(ctx(&code, RegionTable::new()));
        tokio::pin!(second);
        assert!(futures_poll_once(second.as_mut()).await.is_none());

        let (outcome, _) = ready.run(&[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(1));

        // Released: the second request now goes through.
        assert!(second.await.is_ok());
    }

    /// Polls a future exactly once, returning its output if ready.
    async fn futures_poll_once<F: std::future::Future + Unpin>(f: F) -> Option<F::Output> {
        use std::task::Poll;
        let mut f = f;
        std::future::poll_fn(|cx| {
            Poll::Ready(match std::pin::Pin::new(&mut f).poll(cx) {
                Poll::Ready(out) => Some(out),
                Poll::Pending => None,
            })
        })
        .await
    }

    #[tokio::test]
    async fn reads_its_caller_context() {
        let engine = ExecutionEngine::new();
        let code = asm::assemble(&[asm::ldx_w(0, 1, 0), asm::exit()]);
        let ready = engine.prepare(ctx(&code, RegionTable::new())).await.unwrap();
        let blob = 7u32.to_le_bytes();
        let (outcome, _) = ready.run(&blob).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(7));
    }
}
