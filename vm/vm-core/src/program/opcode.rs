use bg_vm_types::exit_reason::FaultReason;

/// The instruction set, a fixed-width subset of the eBPF encoding. The
/// discriminant is the opcode byte as it appears on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    // ALU64, immediate operand
    AddImm = 0x07,
    SubImm = 0x17,
    MulImm = 0x27,
    DivImm = 0x37,
    OrImm = 0x47,
    AndImm = 0x57,
    LshImm = 0x67,
    RshImm = 0x77,
    Neg = 0x87,
    XorImm = 0xa7,
    MovImm = 0xb7,

    // ALU64, register operand
    AddReg = 0x0f,
    SubReg = 0x1f,
    MulReg = 0x2f,
    DivReg = 0x3f,
    OrReg = 0x4f,
    AndReg = 0x5f,
    LshReg = 0x6f,
    RshReg = 0x7f,
    XorReg = 0xaf,
    MovReg = 0xbf,

    // Memory loads: dst = *(src + offset)
    LdxB = 0x71,
    LdxH = 0x69,
    LdxW = 0x61,
    LdxDw = 0x79,

    // Memory stores from register: *(dst + offset) = src
    StxB = 0x73,
    StxH = 0x6b,
    StxW = 0x63,
    StxDw = 0x7b,

    // Memory stores from immediate: *(dst + offset) = imm
    StB = 0x72,
    StH = 0x6a,
    StW = 0x62,
    StDw = 0x7a,

    // Control flow; each executed instruction of this group consumes one
    // unit of branch budget
    Ja = 0x05,
    JeqImm = 0x15,
    JeqReg = 0x1d,
    JgtImm = 0x25,
    JgtReg = 0x2d,
    JgeImm = 0x35,
    JgeReg = 0x3d,
    JltImm = 0xa5,
    JltReg = 0xad,
    JleImm = 0xb5,
    JleReg = 0xbd,
    JneImm = 0x55,
    JneReg = 0x5d,
    JsgtImm = 0x65,
    JsltImm = 0xc5,

    Exit = 0x95,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Result<Self, FaultReason> {
        use Opcode::*;
        let op = match byte {
            0x07 => AddImm,
            0x17 => SubImm,
            0x27 => MulImm,
            0x37 => DivImm,
            0x47 => OrImm,
            0x57 => AndImm,
            0x67 => LshImm,
            0x77 => RshImm,
            0x87 => Neg,
            0xa7 => XorImm,
            0xb7 => MovImm,
            0x0f => AddReg,
            0x1f => SubReg,
            0x2f => MulReg,
            0x3f => DivReg,
            0x4f => OrReg,
            0x5f => AndReg,
            0x6f => LshReg,
            0x7f => RshReg,
            0xaf => XorReg,
            0xbf => MovReg,
            0x71 => LdxB,
            0x69 => LdxH,
            0x61 => LdxW,
            0x79 => LdxDw,
            0x73 => StxB,
            0x6b => StxH,
            0x63 => StxW,
            0x7b => StxDw,
            0x72 => StB,
            0x6a => StH,
            0x62 => StW,
            0x7a => StDw,
            0x05 => Ja,
            0x15 => JeqImm,
            0x1d => JeqReg,
            0x25 => JgtImm,
            0x2d => JgtReg,
            0x35 => JgeImm,
            0x3d => JgeReg,
            0xa5 => JltImm,
            0xad => JltReg,
            0xb5 => JleImm,
            0xbd => JleReg,
            0x55 => JneImm,
            0x5d => JneReg,
            0x65 => JsgtImm,
            0xc5 => JsltImm,
            0x95 => Exit,
            other => return Err(FaultReason::InvalidOpcode(other)),
        };
        Ok(op)
    }

    /// Whether executing this instruction consumes branch budget.
    pub fn is_branch(&self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Ja | JeqImm
                | JeqReg
                | JgtImm
                | JgtReg
                | JgeImm
                | JgeReg
                | JltImm
                | JltReg
                | JleImm
                | JleReg
                | JneImm
                | JneReg
                | JsgtImm
                | JsltImm
        )
    }
}
