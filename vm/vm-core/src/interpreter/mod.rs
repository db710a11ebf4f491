use crate::{
    program::{opcode::Opcode as OP, Instruction, Program},
    region::{SandboxMemory, Width},
    state::VmState,
};
use bg_vm_types::{
    common::{MemAddress, RegValue},
    exit_reason::{ExitReason, FaultReason},
};

enum Flow {
    Next,
    Jump(i64),
    Halt(i64),
}

pub struct Interpreter;
impl Interpreter {
    /// Drives a program to completion against the given sandbox memory.
    ///
    /// Total over all inputs: every run ends in exactly one [`ExitReason`],
    /// after at most `budget` control-flow instructions.
    pub fn run(
        state: &mut VmState,
        program: &Program<'_>,
        memory: &mut SandboxMemory<'_, '_>,
    ) -> ExitReason {
        loop {
            let Some(blob) = program.instruction(state.pc) else {
                return ExitReason::Faulted(FaultReason::PcOutOfBounds);
            };
            let ins = match Instruction::decode(blob) {
                Ok(ins) => ins,
                Err(fault) => return ExitReason::Faulted(fault),
            };

            // Budget is charged before the branch takes effect, taken or not.
            if ins.op.is_branch() && !state.budget.try_consume() {
                return ExitReason::OutOfBudget;
            }

            match Self::step(state, &ins, memory) {
                Ok(Flow::Next) => state.pc += 1,
                Ok(Flow::Jump(target)) => {
                    if target < 0 {
                        return ExitReason::Faulted(FaultReason::PcOutOfBounds);
                    }
                    // Forward overrun is caught by the next fetch.
                    state.pc = target as usize;
                }
                Ok(Flow::Halt(result)) => return ExitReason::Halted { result },
                Err(fault) => return ExitReason::Faulted(fault),
            }
        }
    }

    fn step(
        state: &mut VmState,
        ins: &Instruction,
        memory: &mut SandboxMemory<'_, '_>,
    ) -> Result<Flow, FaultReason> {
        let imm = Self::sext(ins.imm);
        let dst = state.read_reg(ins.dst);
        let src = state.read_reg(ins.src);

        let flow = match ins.op {
            // --- ALU64, immediate
            OP::AddImm => Self::write(state, ins, dst.wrapping_add(imm)),
            OP::SubImm => Self::write(state, ins, dst.wrapping_sub(imm)),
            OP::MulImm => Self::write(state, ins, dst.wrapping_mul(imm)),
            OP::DivImm => Self::write(state, ins, Self::div(dst, imm)?),
            OP::OrImm => Self::write(state, ins, dst | imm),
            OP::AndImm => Self::write(state, ins, dst & imm),
            OP::LshImm => Self::write(state, ins, dst.wrapping_shl(ins.imm as u32)),
            OP::RshImm => Self::write(state, ins, dst.wrapping_shr(ins.imm as u32)),
            OP::Neg => Self::write(state, ins, dst.wrapping_neg()),
            OP::XorImm => Self::write(state, ins, dst ^ imm),
            OP::MovImm => Self::write(state, ins, imm),

            // --- ALU64, register
            OP::AddReg => Self::write(state, ins, dst.wrapping_add(src)),
            OP::SubReg => Self::write(state, ins, dst.wrapping_sub(src)),
            OP::MulReg => Self::write(state, ins, dst.wrapping_mul(src)),
            OP::DivReg => Self::write(state, ins, Self::div(dst, src)?),
            OP::OrReg => Self::write(state, ins, dst | src),
            OP::AndReg => Self::write(state, ins, dst & src),
            OP::LshReg => Self::write(state, ins, dst.wrapping_shl(src as u32)),
            OP::RshReg => Self::write(state, ins, dst.wrapping_shr(src as u32)),
            OP::XorReg => Self::write(state, ins, dst ^ src),
            OP::MovReg => Self::write(state, ins, src),

            // --- Loads: dst = *(src + offset)
            OP::LdxB => Self::load(state, ins, memory, src, Width::B)?,
            OP::LdxH => Self::load(state, ins, memory, src, Width::H)?,
            OP::LdxW => Self::load(state, ins, memory, src, Width::W)?,
            OP::LdxDw => Self::load(state, ins, memory, src, Width::D)?,

            // --- Stores: *(dst + offset) = src | imm
            OP::StxB => Self::store(ins, memory, dst, src, Width::B)?,
            OP::StxH => Self::store(ins, memory, dst, src, Width::H)?,
            OP::StxW => Self::store(ins, memory, dst, src, Width::W)?,
            OP::StxDw => Self::store(ins, memory, dst, src, Width::D)?,
            OP::StB => Self::store(ins, memory, dst, imm, Width::B)?,
            OP::StH => Self::store(ins, memory, dst, imm, Width::H)?,
            OP::StW => Self::store(ins, memory, dst, imm, Width::W)?,
            OP::StDw => Self::store(ins, memory, dst, imm, Width::D)?,

            // --- Control flow
            OP::Ja => Self::branch(state, ins, true),
            OP::JeqImm => Self::branch(state, ins, dst == imm),
            OP::JeqReg => Self::branch(state, ins, dst == src),
            OP::JgtImm => Self::branch(state, ins, dst > imm),
            OP::JgtReg => Self::branch(state, ins, dst > src),
            OP::JgeImm => Self::branch(state, ins, dst >= imm),
            OP::JgeReg => Self::branch(state, ins, dst >= src),
            OP::JltImm => Self::branch(state, ins, dst < imm),
            OP::JltReg => Self::branch(state, ins, dst < src),
            OP::JleImm => Self::branch(state, ins, dst <= imm),
            OP::JleReg => Self::branch(state, ins, dst <= src),
            OP::JneImm => Self::branch(state, ins, dst != imm),
            OP::JneReg => Self::branch(state, ins, dst != src),
            OP::JsgtImm => Self::branch(state, ins, (dst as i64) > (imm as i64)),
            OP::JsltImm => Self::branch(state, ins, (dst as i64) < (imm as i64)),

            OP::Exit => Flow::Halt(state.read_reg(0) as i64),
        };
        Ok(flow)
    }

    /// Immediates are sign-extended to 64 bits.
    #[inline(always)]
    fn sext(imm: i32) -> RegValue {
        imm as i64 as RegValue
    }

    #[inline(always)]
    fn write(state: &mut VmState, ins: &Instruction, value: RegValue) -> Flow {
        state.write_reg(ins.dst, value);
        Flow::Next
    }

    #[inline(always)]
    fn div(lhs: RegValue, rhs: RegValue) -> Result<RegValue, FaultReason> {
        if rhs == 0 {
            return Err(FaultReason::DivisionByZero);
        }
        Ok(lhs / rhs)
    }

    #[inline(always)]
    fn branch(state: &VmState, ins: &Instruction, taken: bool) -> Flow {
        if taken {
            Flow::Jump(state.pc as i64 + 1 + ins.offset as i64)
        } else {
            Flow::Next
        }
    }

    fn load(
        state: &mut VmState,
        ins: &Instruction,
        memory: &SandboxMemory<'_, '_>,
        base: RegValue,
        width: Width,
    ) -> Result<Flow, FaultReason> {
        let address = Self::effective_address(base, ins.offset, false)?;
        let value = memory.load(address, width)?;
        state.write_reg(ins.dst, value);
        Ok(Flow::Next)
    }

    fn store(
        ins: &Instruction,
        memory: &mut SandboxMemory<'_, '_>,
        base: RegValue,
        value: RegValue,
        width: Width,
    ) -> Result<Flow, FaultReason> {
        let address = Self::effective_address(base, ins.offset, true)?;
        memory.store(address, width, value)?;
        Ok(Flow::Next)
    }

    /// Register-plus-offset addressing; anything that does not land in the
    /// 32-bit sandbox address space is an access violation.
    fn effective_address(
        base: RegValue,
        offset: i16,
        write: bool,
    ) -> Result<MemAddress, FaultReason> {
        let address = (base as i64).wrapping_add(offset as i64);
        MemAddress::try_from(address).map_err(|_| FaultReason::AccessViolation {
            address: address as MemAddress,
            write,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        budget::BranchBudget,
        program::asm,
        region::{MemoryRegion, RegionTable},
    };
    use bg_vm_types::constants::{
        region_slot_base, CONTEXT_BASE, DEFAULT_BRANCH_BUDGET, STACK_SIZE,
    };

    fn run_program(
        code: &[u8],
        budget: u32,
        regions: &mut RegionTable<'_>,
        context: &[u8],
    ) -> (ExitReason, u32) {
        let mut stack = [0u8; STACK_SIZE];
        let program = Program::parse(code).unwrap();
        let mut state = VmState::new(
            BranchBudget::new(budget),
            CONTEXT_BASE as u64,
            context.len(),
        );
        let mut memory = SandboxMemory::new(&mut stack, context, regions);
        let reason = Interpreter::run(&mut state, &program, &mut memory);
        (reason, state.budget.consumed())
    }

    #[test]
    fn arithmetic_program_halts_with_result() {
        // r0 = 6 * 7
        let code = asm::assemble(&[
            asm::mov_imm(0, 6),
            asm::mul_imm(0, 7),
            asm::exit(),
        ]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Halted { result: 42 });
    }

    #[test]
    fn negative_results_are_preserved() {
        let code = asm::assemble(&[asm::mov_imm(0, -5), asm::exit()]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Halted { result: -5 });
    }

    #[test]
    fn unconditional_loop_exhausts_exact_budget() {
        // jump-to-self, forever
        let code = asm::assemble(&[asm::ja(-1)]);
        let mut regions = RegionTable::new();
        let (reason, consumed) = run_program(&code, 100, &mut regions, &[]);
        assert_eq!(reason, ExitReason::OutOfBudget);
        assert_eq!(consumed, 100);
    }

    #[test]
    fn counted_loop_terminates_within_budget() {
        // for r1 in 0..10 {}; r0 = r1
        let code = asm::assemble(&[
            asm::mov_imm(1, 0),
            asm::add_imm(1, 1),
            asm::jlt_imm(1, 10, -2),
            asm::mov_reg(0, 1),
            asm::exit(),
        ]);
        let mut regions = RegionTable::new();
        let (reason, consumed) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Halted { result: 10 });
        assert_eq!(consumed, 10);
    }

    #[test]
    fn store_and_load_through_region_slot() {
        let mut backing = [0u8; 64];
        let mut regions = RegionTable::new();
        regions.push(MemoryRegion::read_write(&mut backing));
        let base = region_slot_base(0) as i32;
        // *(u32*)(r1 + 4) = 99; r0 = *(u32*)(r1 + 4)
        let code = asm::assemble(&[
            asm::mov_imm(1, base),
            asm::st_w(1, 4, 99),
            asm::ldx_w(0, 1, 4),
            asm::exit(),
        ]);
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Halted { result: 99 });
        assert_eq!(backing[4], 99);
    }

    #[test]
    fn access_outside_declared_regions_faults() {
        let mut backing = [0u8; 8];
        let mut regions = RegionTable::new();
        regions.push(MemoryRegion::read_write(&mut backing));
        let base = region_slot_base(0) as i32;
        // read one word past the end of the 8-byte region
        let code = asm::assemble(&[
            asm::mov_imm(1, base),
            asm::ldx_w(0, 1, 8),
            asm::exit(),
        ]);
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert!(matches!(
            reason,
            ExitReason::Faulted(FaultReason::AccessViolation { write: false, .. })
        ));
    }

    #[test]
    fn stack_is_usable_through_r10() {
        // push 7 below the stack top, read it back
        let code = asm::assemble(&[
            asm::st_dw(10, -8, 7),
            asm::ldx_dw(0, 10, -8),
            asm::exit(),
        ]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Halted { result: 7 });
    }

    #[test]
    fn context_blob_is_readable_not_writable() {
        let context = 42u64.to_le_bytes();
        let code = asm::assemble(&[asm::ldx_dw(0, 1, 0), asm::exit()]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &context);
        assert_eq!(reason, ExitReason::Halted { result: 42 });

        let write_code = asm::assemble(&[asm::st_w(1, 0, 1), asm::exit()]);
        let mut regions = RegionTable::new();
        let (reason, _) =
            run_program(&write_code, DEFAULT_BRANCH_BUDGET, &mut regions, &context);
        assert!(matches!(
            reason,
            ExitReason::Faulted(FaultReason::AccessViolation { write: true, .. })
        ));
    }

    #[test]
    fn division_by_zero_faults() {
        let code = asm::assemble(&[
            asm::mov_imm(0, 1),
            asm::mov_imm(1, 0),
            asm::div_reg(0, 1),
            asm::exit(),
        ]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Faulted(FaultReason::DivisionByZero));
    }

    #[test]
    fn running_off_the_code_end_faults() {
        let code = asm::assemble(&[asm::mov_imm(0, 1)]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Faulted(FaultReason::PcOutOfBounds));
    }

    #[test]
    fn backward_jump_before_entry_faults() {
        let code = asm::assemble(&[asm::ja(-2), asm::exit()]);
        let mut regions = RegionTable::new();
        let (reason, _) = run_program(&code, DEFAULT_BRANCH_BUDGET, &mut regions, &[]);
        assert_eq!(reason, ExitReason::Faulted(FaultReason::PcOutOfBounds));
    }
}
