pub mod asm;
pub mod opcode;

use crate::error::ProgramError;
use bg_vm_types::{
    constants::{INSTRUCTION_SIZE, MAX_PROGRAM_SIZE, REGISTERS_COUNT},
    exit_reason::FaultReason,
};
use opcode::Opcode;

/// A structurally validated bytecode image, borrowed from the active storage
/// slot for the duration of one execution.
#[derive(Clone, Copy, Debug)]
pub struct Program<'a> {
    code: &'a [u8],
}

impl<'a> Program<'a> {
    pub fn parse(code: &'a [u8]) -> Result<Self, ProgramError> {
        if code.is_empty() {
            return Err(ProgramError::Empty);
        }
        if code.len() % INSTRUCTION_SIZE != 0 {
            return Err(ProgramError::Misaligned(code.len()));
        }
        if code.len() > MAX_PROGRAM_SIZE {
            return Err(ProgramError::TooLarge(code.len()));
        }
        Ok(Self { code })
    }

    pub fn num_instructions(&self) -> usize {
        self.code.len() / INSTRUCTION_SIZE
    }

    /// The raw octets of the instruction at `index`, if within the code area.
    pub fn instruction(&self, index: usize) -> Option<&'a [u8]> {
        let start = index.checked_mul(INSTRUCTION_SIZE)?;
        self.code.get(start..start + INSTRUCTION_SIZE)
    }
}

/// A single decoded instruction.
///
/// Register indices are validated during decoding, so downstream register
/// file accesses can index directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub dst: usize,
    pub src: usize,
    pub offset: i16,
    pub imm: i32,
}

impl Instruction {
    /// Decodes one fixed-width instruction blob:
    /// `[opcode][src:4|dst:4][offset i16 LE][imm i32 LE]`.
    pub fn decode(blob: &[u8]) -> Result<Self, FaultReason> {
        debug_assert_eq!(blob.len(), INSTRUCTION_SIZE);
        let op = Opcode::from_u8(blob[0])?;
        let dst = (blob[1] & 0x0f) as usize;
        let src = (blob[1] >> 4) as usize;
        if dst >= REGISTERS_COUNT {
            return Err(FaultReason::InvalidRegister(dst as u8));
        }
        if src >= REGISTERS_COUNT {
            return Err(FaultReason::InvalidRegister(src as u8));
        }
        let offset = i16::from_le_bytes([blob[2], blob[3]]);
        let imm = i32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
        Ok(Self {
            op,
            dst,
            src,
            offset,
            imm,
        })
    }
}
