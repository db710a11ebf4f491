//! Instruction constructors for building programs in code.
//!
//! Used by tests and provisioning tooling; the wire encoding matches
//! [`super::Instruction::decode`].

use super::opcode::Opcode;
use bg_vm_types::constants::INSTRUCTION_SIZE;

pub type InstBlob = [u8; INSTRUCTION_SIZE];

fn encode(op: Opcode, dst: usize, src: usize, offset: i16, imm: i32) -> InstBlob {
    debug_assert!(dst < 16 && src < 16);
    let mut blob = [0u8; INSTRUCTION_SIZE];
    blob[0] = op as u8;
    blob[1] = ((src as u8) << 4) | (dst as u8 & 0x0f);
    blob[2..4].copy_from_slice(&offset.to_le_bytes());
    blob[4..8].copy_from_slice(&imm.to_le_bytes());
    blob
}

pub fn assemble(instructions: &[InstBlob]) -> Vec<u8> {
    instructions.concat()
}

pub fn mov_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::MovImm, dst, 0, 0, imm)
}

pub fn mov_reg(dst: usize, src: usize) -> InstBlob {
    encode(Opcode::MovReg, dst, src, 0, 0)
}

pub fn add_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::AddImm, dst, 0, 0, imm)
}

pub fn add_reg(dst: usize, src: usize) -> InstBlob {
    encode(Opcode::AddReg, dst, src, 0, 0)
}

pub fn sub_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::SubImm, dst, 0, 0, imm)
}

pub fn mul_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::MulImm, dst, 0, 0, imm)
}

pub fn div_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::DivImm, dst, 0, 0, imm)
}

pub fn div_reg(dst: usize, src: usize) -> InstBlob {
    encode(Opcode::DivReg, dst, src, 0, 0)
}

pub fn lsh_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::LshImm, dst, 0, 0, imm)
}

pub fn rsh_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::RshImm, dst, 0, 0, imm)
}

pub fn and_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::AndImm, dst, 0, 0, imm)
}

pub fn or_imm(dst: usize, imm: i32) -> InstBlob {
    encode(Opcode::OrImm, dst, 0, 0, imm)
}

pub fn xor_reg(dst: usize, src: usize) -> InstBlob {
    encode(Opcode::XorReg, dst, src, 0, 0)
}

pub fn neg(dst: usize) -> InstBlob {
    encode(Opcode::Neg, dst, 0, 0, 0)
}

pub fn ldx_b(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::LdxB, dst, src, offset, 0)
}

pub fn ldx_h(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::LdxH, dst, src, offset, 0)
}

pub fn ldx_w(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::LdxW, dst, src, offset, 0)
}

pub fn ldx_dw(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::LdxDw, dst, src, offset, 0)
}

pub fn stx_b(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::StxB, dst, src, offset, 0)
}

pub fn stx_w(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::StxW, dst, src, offset, 0)
}

pub fn stx_dw(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::StxDw, dst, src, offset, 0)
}

pub fn st_w(dst: usize, offset: i16, imm: i32) -> InstBlob {
    encode(Opcode::StW, dst, 0, offset, imm)
}

pub fn st_dw(dst: usize, offset: i16, imm: i32) -> InstBlob {
    encode(Opcode::StDw, dst, 0, offset, imm)
}

pub fn ja(offset: i16) -> InstBlob {
    encode(Opcode::Ja, 0, 0, offset, 0)
}

pub fn jeq_imm(dst: usize, imm: i32, offset: i16) -> InstBlob {
    encode(Opcode::JeqImm, dst, 0, offset, imm)
}

pub fn jne_imm(dst: usize, imm: i32, offset: i16) -> InstBlob {
    encode(Opcode::JneImm, dst, 0, offset, imm)
}

pub fn jgt_imm(dst: usize, imm: i32, offset: i16) -> InstBlob {
    encode(Opcode::JgtImm, dst, 0, offset, imm)
}

pub fn jge_reg(dst: usize, src: usize, offset: i16) -> InstBlob {
    encode(Opcode::JgeReg, dst, src, offset, 0)
}

pub fn jlt_imm(dst: usize, imm: i32, offset: i16) -> InstBlob {
    encode(Opcode::JltImm, dst, 0, offset, imm)
}

pub fn jslt_imm(dst: usize, imm: i32, offset: i16) -> InstBlob {
    encode(Opcode::JsltImm, dst, 0, offset, imm)
}

pub fn exit() -> InstBlob {
    encode(Opcode::Exit, 0, 0, 0, 0)
}
