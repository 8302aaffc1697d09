//! Instruction descriptors for the documented 6502 instruction set.
//!
//! [`OPCODES`] holds one entry per official opcode (151 in total) and `None`
//! everywhere else. The table is built at compile time and never changes, so
//! any number of CPUs can share it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    #[rustfmt::skip]
    pub fn name(self) -> &'static str {
        use self::Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA",
        }
    }

    pub fn is_branch(self) -> bool {
        use self::Mnemonic::*;
        match self {
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => true,
            _ => false,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    pub cycles: u8,
    /// Add a cycle when indexing crosses a page (for branches: when a taken branch does).
    pub page_penalty: bool,
}

impl Opcode {
    /// Total encoded length including the opcode byte.
    pub fn size(&self) -> u16 {
        1 + self.mode.operand_len()
    }
}

const fn op(
    mnemonic: Mnemonic,
    mode: AddressingMode,
    cycles: u8,
    page_penalty: bool,
) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty,
    })
}

pub fn decode(opcode: u8) -> Option<&'static Opcode> {
    OPCODES[opcode as usize].as_ref()
}

/// The undocumented NOP family (`DOP`/`TOP` and the one-byte variants).
///
/// They read their operand and do nothing else, so they are the only illegal
/// opcodes with a safe skip behaviour.
pub fn decode_illegal_nop(opcode: u8) -> Option<&'static Opcode> {
    ILLEGAL_NOPS[opcode as usize].as_ref()
}

pub static OPCODES: [Option<Opcode>; 256] = {
    use self::AddressingMode::*;
    use self::Mnemonic::*;

    let mut t: [Option<Opcode>; 256] = [None; 256];
    t[0x69] = op(Adc, Immediate, 2, false);
    t[0x65] = op(Adc, ZeroPage, 3, false);
    t[0x75] = op(Adc, ZeroPageX, 4, false);
    t[0x6D] = op(Adc, Absolute, 4, false);
    t[0x7D] = op(Adc, AbsoluteX, 4, true);
    t[0x79] = op(Adc, AbsoluteY, 4, true);
    t[0x61] = op(Adc, IndirectX, 6, false);
    t[0x71] = op(Adc, IndirectY, 5, true);
    t[0x29] = op(And, Immediate, 2, false);
    t[0x25] = op(And, ZeroPage, 3, false);
    t[0x35] = op(And, ZeroPageX, 4, false);
    t[0x2D] = op(And, Absolute, 4, false);
    t[0x3D] = op(And, AbsoluteX, 4, true);
    t[0x39] = op(And, AbsoluteY, 4, true);
    t[0x21] = op(And, IndirectX, 6, false);
    t[0x31] = op(And, IndirectY, 5, true);
    t[0x0A] = op(Asl, Accumulator, 2, false);
    t[0x06] = op(Asl, ZeroPage, 5, false);
    t[0x16] = op(Asl, ZeroPageX, 6, false);
    t[0x0E] = op(Asl, Absolute, 6, false);
    t[0x1E] = op(Asl, AbsoluteX, 7, false);
    t[0x90] = op(Bcc, Relative, 2, true);
    t[0xB0] = op(Bcs, Relative, 2, true);
    t[0xF0] = op(Beq, Relative, 2, true);
    t[0x24] = op(Bit, ZeroPage, 3, false);
    t[0x2C] = op(Bit, Absolute, 4, false);
    t[0x30] = op(Bmi, Relative, 2, true);
    t[0xD0] = op(Bne, Relative, 2, true);
    t[0x10] = op(Bpl, Relative, 2, true);
    t[0x00] = op(Brk, Implied, 7, false);
    t[0x50] = op(Bvc, Relative, 2, true);
    t[0x70] = op(Bvs, Relative, 2, true);
    t[0x18] = op(Clc, Implied, 2, false);
    t[0xD8] = op(Cld, Implied, 2, false);
    t[0x58] = op(Cli, Implied, 2, false);
    t[0xB8] = op(Clv, Implied, 2, false);
    t[0xC9] = op(Cmp, Immediate, 2, false);
    t[0xC5] = op(Cmp, ZeroPage, 3, false);
    t[0xD5] = op(Cmp, ZeroPageX, 4, false);
    t[0xCD] = op(Cmp, Absolute, 4, false);
    t[0xDD] = op(Cmp, AbsoluteX, 4, true);
    t[0xD9] = op(Cmp, AbsoluteY, 4, true);
    t[0xC1] = op(Cmp, IndirectX, 6, false);
    t[0xD1] = op(Cmp, IndirectY, 5, true);
    t[0xE0] = op(Cpx, Immediate, 2, false);
    t[0xE4] = op(Cpx, ZeroPage, 3, false);
    t[0xEC] = op(Cpx, Absolute, 4, false);
    t[0xC0] = op(Cpy, Immediate, 2, false);
    t[0xC4] = op(Cpy, ZeroPage, 3, false);
    t[0xCC] = op(Cpy, Absolute, 4, false);
    t[0xC6] = op(Dec, ZeroPage, 5, false);
    t[0xD6] = op(Dec, ZeroPageX, 6, false);
    t[0xCE] = op(Dec, Absolute, 6, false);
    t[0xDE] = op(Dec, AbsoluteX, 7, false);
    t[0xCA] = op(Dex, Implied, 2, false);
    t[0x88] = op(Dey, Implied, 2, false);
    t[0x49] = op(Eor, Immediate, 2, false);
    t[0x45] = op(Eor, ZeroPage, 3, false);
    t[0x55] = op(Eor, ZeroPageX, 4, false);
    t[0x4D] = op(Eor, Absolute, 4, false);
    t[0x5D] = op(Eor, AbsoluteX, 4, true);
    t[0x59] = op(Eor, AbsoluteY, 4, true);
    t[0x41] = op(Eor, IndirectX, 6, false);
    t[0x51] = op(Eor, IndirectY, 5, true);
    t[0xE6] = op(Inc, ZeroPage, 5, false);
    t[0xF6] = op(Inc, ZeroPageX, 6, false);
    t[0xEE] = op(Inc, Absolute, 6, false);
    t[0xFE] = op(Inc, AbsoluteX, 7, false);
    t[0xE8] = op(Inx, Implied, 2, false);
    t[0xC8] = op(Iny, Implied, 2, false);
    t[0x4C] = op(Jmp, Absolute, 3, false);
    t[0x6C] = op(Jmp, Indirect, 5, false);
    t[0x20] = op(Jsr, Absolute, 6, false);
    t[0xA9] = op(Lda, Immediate, 2, false);
    t[0xA5] = op(Lda, ZeroPage, 3, false);
    t[0xB5] = op(Lda, ZeroPageX, 4, false);
    t[0xAD] = op(Lda, Absolute, 4, false);
    t[0xBD] = op(Lda, AbsoluteX, 4, true);
    t[0xB9] = op(Lda, AbsoluteY, 4, true);
    t[0xA1] = op(Lda, IndirectX, 6, false);
    t[0xB1] = op(Lda, IndirectY, 5, true);
    t[0xA2] = op(Ldx, Immediate, 2, false);
    t[0xA6] = op(Ldx, ZeroPage, 3, false);
    t[0xB6] = op(Ldx, ZeroPageY, 4, false);
    t[0xAE] = op(Ldx, Absolute, 4, false);
    t[0xBE] = op(Ldx, AbsoluteY, 4, true);
    t[0xA0] = op(Ldy, Immediate, 2, false);
    t[0xA4] = op(Ldy, ZeroPage, 3, false);
    t[0xB4] = op(Ldy, ZeroPageX, 4, false);
    t[0xAC] = op(Ldy, Absolute, 4, false);
    t[0xBC] = op(Ldy, AbsoluteX, 4, true);
    t[0x4A] = op(Lsr, Accumulator, 2, false);
    t[0x46] = op(Lsr, ZeroPage, 5, false);
    t[0x56] = op(Lsr, ZeroPageX, 6, false);
    t[0x4E] = op(Lsr, Absolute, 6, false);
    t[0x5E] = op(Lsr, AbsoluteX, 7, false);
    t[0xEA] = op(Nop, Implied, 2, false);
    t[0x09] = op(Ora, Immediate, 2, false);
    t[0x05] = op(Ora, ZeroPage, 3, false);
    t[0x15] = op(Ora, ZeroPageX, 4, false);
    t[0x0D] = op(Ora, Absolute, 4, false);
    t[0x1D] = op(Ora, AbsoluteX, 4, true);
    t[0x19] = op(Ora, AbsoluteY, 4, true);
    t[0x01] = op(Ora, IndirectX, 6, false);
    t[0x11] = op(Ora, IndirectY, 5, true);
    t[0x48] = op(Pha, Implied, 3, false);
    t[0x08] = op(Php, Implied, 3, false);
    t[0x68] = op(Pla, Implied, 4, false);
    t[0x28] = op(Plp, Implied, 4, false);
    t[0x2A] = op(Rol, Accumulator, 2, false);
    t[0x26] = op(Rol, ZeroPage, 5, false);
    t[0x36] = op(Rol, ZeroPageX, 6, false);
    t[0x2E] = op(Rol, Absolute, 6, false);
    t[0x3E] = op(Rol, AbsoluteX, 7, false);
    t[0x6A] = op(Ror, Accumulator, 2, false);
    t[0x66] = op(Ror, ZeroPage, 5, false);
    t[0x76] = op(Ror, ZeroPageX, 6, false);
    t[0x6E] = op(Ror, Absolute, 6, false);
    t[0x7E] = op(Ror, AbsoluteX, 7, false);
    t[0x40] = op(Rti, Implied, 6, false);
    t[0x60] = op(Rts, Implied, 6, false);
    t[0xE9] = op(Sbc, Immediate, 2, false);
    t[0xE5] = op(Sbc, ZeroPage, 3, false);
    t[0xF5] = op(Sbc, ZeroPageX, 4, false);
    t[0xED] = op(Sbc, Absolute, 4, false);
    t[0xFD] = op(Sbc, AbsoluteX, 4, true);
    t[0xF9] = op(Sbc, AbsoluteY, 4, true);
    t[0xE1] = op(Sbc, IndirectX, 6, false);
    t[0xF1] = op(Sbc, IndirectY, 5, true);
    t[0x38] = op(Sec, Implied, 2, false);
    t[0xF8] = op(Sed, Implied, 2, false);
    t[0x78] = op(Sei, Implied, 2, false);
    t[0x85] = op(Sta, ZeroPage, 3, false);
    t[0x95] = op(Sta, ZeroPageX, 4, false);
    t[0x8D] = op(Sta, Absolute, 4, false);
    t[0x9D] = op(Sta, AbsoluteX, 5, false);
    t[0x99] = op(Sta, AbsoluteY, 5, false);
    t[0x81] = op(Sta, IndirectX, 6, false);
    t[0x91] = op(Sta, IndirectY, 6, false);
    t[0x86] = op(Stx, ZeroPage, 3, false);
    t[0x96] = op(Stx, ZeroPageY, 4, false);
    t[0x8E] = op(Stx, Absolute, 4, false);
    t[0x84] = op(Sty, ZeroPage, 3, false);
    t[0x94] = op(Sty, ZeroPageX, 4, false);
    t[0x8C] = op(Sty, Absolute, 4, false);
    t[0xAA] = op(Tax, Implied, 2, false);
    t[0xA8] = op(Tay, Implied, 2, false);
    t[0xBA] = op(Tsx, Implied, 2, false);
    t[0x8A] = op(Txa, Implied, 2, false);
    t[0x9A] = op(Txs, Implied, 2, false);
    t[0x98] = op(Tya, Implied, 2, false);
    t
};

static ILLEGAL_NOPS: [Option<Opcode>; 256] = {
    use self::AddressingMode::*;
    use self::Mnemonic::*;

    let mut t: [Option<Opcode>; 256] = [None; 256];
    t[0x1A] = op(Nop, Implied, 2, false);
    t[0x3A] = op(Nop, Implied, 2, false);
    t[0x5A] = op(Nop, Implied, 2, false);
    t[0x7A] = op(Nop, Implied, 2, false);
    t[0xDA] = op(Nop, Implied, 2, false);
    t[0xFA] = op(Nop, Implied, 2, false);
    t[0x80] = op(Nop, Immediate, 2, false);
    t[0x82] = op(Nop, Immediate, 2, false);
    t[0x89] = op(Nop, Immediate, 2, false);
    t[0xC2] = op(Nop, Immediate, 2, false);
    t[0xE2] = op(Nop, Immediate, 2, false);
    t[0x04] = op(Nop, ZeroPage, 3, false);
    t[0x44] = op(Nop, ZeroPage, 3, false);
    t[0x64] = op(Nop, ZeroPage, 3, false);
    t[0x14] = op(Nop, ZeroPageX, 4, false);
    t[0x34] = op(Nop, ZeroPageX, 4, false);
    t[0x54] = op(Nop, ZeroPageX, 4, false);
    t[0x74] = op(Nop, ZeroPageX, 4, false);
    t[0xD4] = op(Nop, ZeroPageX, 4, false);
    t[0xF4] = op(Nop, ZeroPageX, 4, false);
    t[0x0C] = op(Nop, Absolute, 4, false);
    t[0x1C] = op(Nop, AbsoluteX, 4, true);
    t[0x3C] = op(Nop, AbsoluteX, 4, true);
    t[0x5C] = op(Nop, AbsoluteX, 4, true);
    t[0x7C] = op(Nop, AbsoluteX, 4, true);
    t[0xDC] = op(Nop, AbsoluteX, 4, true);
    t[0xFC] = op(Nop, AbsoluteX, 4, true);
    t
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_set_has_151_entries() {
        assert_eq!(OPCODES.iter().filter(|op| op.is_some()).count(), 151);
    }

    #[test]
    fn illegal_nops_do_not_overlap_documented_set() {
        for code in 0..=255u8 {
            if decode_illegal_nop(code).is_some() {
                assert!(decode(code).is_none(), "{:#04X} is documented", code);
            }
        }
        assert_eq!(ILLEGAL_NOPS.iter().filter(|op| op.is_some()).count(), 27);
    }

    #[test]
    fn lookups() {
        let lda = decode(0xA9).unwrap();
        assert_eq!(lda.mnemonic, Mnemonic::Lda);
        assert_eq!(lda.mode, AddressingMode::Immediate);
        assert_eq!(lda.cycles, 2);
        assert_eq!(lda.size(), 2);

        let jmp = decode(0x6C).unwrap();
        assert_eq!(
            (jmp.mnemonic.name(), jmp.mode, jmp.size()),
            ("JMP", AddressingMode::Indirect, 3)
        );

        assert!(decode(0x02).is_none());
        assert!(decode(0xFF).is_none());
    }

    #[test]
    fn stores_never_pay_page_penalty() {
        for op in OPCODES.iter().flatten() {
            match op.mnemonic {
                Mnemonic::Sta | Mnemonic::Stx | Mnemonic::Sty => assert!(!op.page_penalty),
                Mnemonic::Asl | Mnemonic::Lsr | Mnemonic::Rol | Mnemonic::Ror => {
                    assert!(!op.page_penalty)
                }
                Mnemonic::Inc | Mnemonic::Dec => assert!(!op.page_penalty),
                m if m.is_branch() => assert!(op.page_penalty),
                _ => {}
            }
        }
    }

    #[test]
    fn cycle_range() {
        for op in OPCODES.iter().flatten() {
            assert!((2..=7).contains(&op.cycles), "{} {:?}", op.mnemonic, op.mode);
        }
    }
}
