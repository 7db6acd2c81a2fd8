//! Instruction decoder for the LC-3.
//!
//! Every instruction is one word. The top four bits select the opcode and
//! the remaining twelve are opcode-specific fields:
//!
//! ```text
//!  15  12 11  9 8   6 5 4     0
//! | op   | DR  | SR1 |i| imm5  |   ADD/AND
//! | op   | DR  |  PCoffset9    |   LD/LDI/LEA/ST/STI, BR (DR = nzp)
//! | op   | DR  |BaseR| offset6 |   LDR/STR
//! | op   |1| PCoffset11        |   JSR
//! | op   | 0000    | trapvect8 |   TRAP
//! ```

use serde::{Deserialize, Serialize};

use super::registers::sign_extend;

/// Second source operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// SR2, bits 2-0 (bit 5 clear)
    Reg(u8),
    /// imm5, bits 4-0 (bit 5 set), sign-extended
    Imm(i16),
}

/// Decoded LC-3 instruction.
///
/// Offsets are stored already sign-extended. Register selectors are 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + SR2/imm5
    Add { dr: u8, sr1: u8, src2: Operand },

    /// DR := SR1 & SR2/imm5
    And { dr: u8, sr1: u8, src2: Operand },

    /// DR := !SR
    Not { dr: u8, sr: u8 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset9]
    Ld { dr: u8, offset: i16 },

    /// DR := mem[mem[PC + offset9]]
    Ldi { dr: u8, offset: i16 },

    /// DR := mem[BaseR + offset6]
    Ldr { dr: u8, base: u8, offset: i16 },

    /// DR := PC + offset9
    Lea { dr: u8, offset: i16 },

    /// mem[PC + offset9] := SR
    St { sr: u8, offset: i16 },

    /// mem[mem[PC + offset9]] := SR
    Sti { sr: u8, offset: i16 },

    /// mem[BaseR + offset6] := SR
    Str { sr: u8, base: u8, offset: i16 },

    // ==================== Control ====================

    /// If (nzp & COND) != 0 then PC := PC + offset9.
    /// `mask` holds n in bit 2, z in bit 1, p in bit 0.
    Br { mask: u8, offset: i16 },

    /// PC := BaseR. `JMP R7` is RET.
    Jmp { base: u8 },

    /// R7 := PC; PC := PC + offset11
    Jsr { offset: i16 },

    /// R7 := PC; PC := BaseR
    Jsrr { base: u8 },

    /// R7 := PC; run trap routine `vector`
    Trap { vector: u8 },

    // ==================== Reserved ====================

    /// Return from interrupt. Not supported; the raw word is kept.
    Rti { raw: u16 },

    /// Reserved opcode 1101. The raw word is kept.
    Res { raw: u16 },
}

/// Opcode values (bits 15-12).
pub struct Opcode;

impl Opcode {
    pub const BR: u16 = 0x0;
    pub const ADD: u16 = 0x1;
    pub const LD: u16 = 0x2;
    pub const ST: u16 = 0x3;
    pub const JSR: u16 = 0x4;
    pub const AND: u16 = 0x5;
    pub const LDR: u16 = 0x6;
    pub const STR: u16 = 0x7;
    pub const RTI: u16 = 0x8;
    pub const NOT: u16 = 0x9;
    pub const LDI: u16 = 0xA;
    pub const STI: u16 = 0xB;
    pub const JMP: u16 = 0xC;
    pub const RES: u16 = 0xD;
    pub const LEA: u16 = 0xE;
    pub const TRAP: u16 = 0xF;
}

// Field extractors
#[inline]
fn dr(word: u16) -> u8 {
    ((word >> 9) & 0x7) as u8
}

#[inline]
fn sr1(word: u16) -> u8 {
    ((word >> 6) & 0x7) as u8
}

#[inline]
fn sr2(word: u16) -> u8 {
    (word & 0x7) as u8
}

#[inline]
fn offset(word: u16, bits: u32) -> i16 {
    sign_extend(word, bits) as i16
}

#[inline]
fn src2(word: u16) -> Operand {
    if (word >> 5) & 0x1 == 1 {
        Operand::Imm(offset(word, 5))
    } else {
        Operand::Reg(sr2(word))
    }
}

/// Decode one instruction word.
///
/// Every bit pattern decodes to something; the two unused opcodes come back
/// as [`Instruction::Rti`] and [`Instruction::Res`].
pub fn decode(word: u16) -> Instruction {
    match word >> 12 {
        Opcode::BR => Instruction::Br { mask: dr(word), offset: offset(word, 9) },
        Opcode::ADD => Instruction::Add { dr: dr(word), sr1: sr1(word), src2: src2(word) },
        Opcode::LD => Instruction::Ld { dr: dr(word), offset: offset(word, 9) },
        Opcode::ST => Instruction::St { sr: dr(word), offset: offset(word, 9) },
        Opcode::JSR => {
            if (word >> 11) & 0x1 == 1 {
                Instruction::Jsr { offset: offset(word, 11) }
            } else {
                Instruction::Jsrr { base: sr1(word) }
            }
        }
        Opcode::AND => Instruction::And { dr: dr(word), sr1: sr1(word), src2: src2(word) },
        Opcode::LDR => Instruction::Ldr { dr: dr(word), base: sr1(word), offset: offset(word, 6) },
        Opcode::STR => Instruction::Str { sr: dr(word), base: sr1(word), offset: offset(word, 6) },
        Opcode::RTI => Instruction::Rti { raw: word },
        Opcode::NOT => Instruction::Not { dr: dr(word), sr: sr1(word) },
        Opcode::LDI => Instruction::Ldi { dr: dr(word), offset: offset(word, 9) },
        Opcode::STI => Instruction::Sti { sr: dr(word), offset: offset(word, 9) },
        Opcode::JMP => Instruction::Jmp { base: sr1(word) },
        Opcode::RES => Instruction::Res { raw: word },
        Opcode::LEA => Instruction::Lea { dr: dr(word), offset: offset(word, 9) },
        Opcode::TRAP => Instruction::Trap { vector: (word & 0xFF) as u8 },
        _ => unreachable!("a 4-bit opcode has only 16 values"),
    }
}

/// Encode an instruction back to its canonical word.
///
/// Fields are truncated to their width, so out-of-range offsets wrap.
pub fn encode(instr: &Instruction) -> u16 {
    fn op(code: u16) -> u16 {
        code << 12
    }
    fn reg_hi(r: u8) -> u16 {
        ((r & 0x7) as u16) << 9
    }
    fn reg_mid(r: u8) -> u16 {
        ((r & 0x7) as u16) << 6
    }
    fn field(value: i16, bits: u32) -> u16 {
        (value as u16) & ((1 << bits) - 1)
    }
    fn operand(src2: Operand) -> u16 {
        match src2 {
            Operand::Reg(r) => (r & 0x7) as u16,
            Operand::Imm(imm) => 1 << 5 | field(imm, 5),
        }
    }

    match *instr {
        Instruction::Br { mask, offset } => {
            op(Opcode::BR) | reg_hi(mask) | field(offset, 9)
        }
        Instruction::Add { dr, sr1, src2 } => {
            op(Opcode::ADD) | reg_hi(dr) | reg_mid(sr1) | operand(src2)
        }
        Instruction::Ld { dr, offset } => op(Opcode::LD) | reg_hi(dr) | field(offset, 9),
        Instruction::St { sr, offset } => op(Opcode::ST) | reg_hi(sr) | field(offset, 9),
        Instruction::Jsr { offset } => op(Opcode::JSR) | 1 << 11 | field(offset, 11),
        Instruction::Jsrr { base } => op(Opcode::JSR) | reg_mid(base),
        Instruction::And { dr, sr1, src2 } => {
            op(Opcode::AND) | reg_hi(dr) | reg_mid(sr1) | operand(src2)
        }
        Instruction::Ldr { dr, base, offset } => {
            op(Opcode::LDR) | reg_hi(dr) | reg_mid(base) | field(offset, 6)
        }
        Instruction::Str { sr, base, offset } => {
            op(Opcode::STR) | reg_hi(sr) | reg_mid(base) | field(offset, 6)
        }
        Instruction::Rti { raw } | Instruction::Res { raw } => raw,
        Instruction::Not { dr, sr } => op(Opcode::NOT) | reg_hi(dr) | reg_mid(sr) | 0x3F,
        Instruction::Ldi { dr, offset } => op(Opcode::LDI) | reg_hi(dr) | field(offset, 9),
        Instruction::Sti { sr, offset } => op(Opcode::STI) | reg_hi(sr) | field(offset, 9),
        Instruction::Jmp { base } => op(Opcode::JMP) | reg_mid(base),
        Instruction::Lea { dr, offset } => op(Opcode::LEA) | reg_hi(dr) | field(offset, 9),
        Instruction::Trap { vector } => op(Opcode::TRAP) | vector as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_add_immediate() {
        // ADD R0, R0, #5
        assert_eq!(
            decode(0x1025),
            Instruction::Add { dr: 0, sr1: 0, src2: Operand::Imm(5) }
        );
        // ADD R1, R2, #-1
        assert_eq!(
            decode(0x12BF),
            Instruction::Add { dr: 1, sr1: 2, src2: Operand::Imm(-1) }
        );
    }

    #[test]
    fn test_decode_add_register() {
        // ADD R3, R4, R5
        assert_eq!(
            decode(0x1705),
            Instruction::Add { dr: 3, sr1: 4, src2: Operand::Reg(5) }
        );
    }

    #[test]
    fn test_decode_branch() {
        // BRnzp #-1
        assert_eq!(decode(0x0FFF), Instruction::Br { mask: 0b111, offset: -1 });
        // BRz #3
        assert_eq!(decode(0x0403), Instruction::Br { mask: 0b010, offset: 3 });
    }

    #[test]
    fn test_decode_jsr_forms() {
        assert_eq!(decode(0x4FFF), Instruction::Jsr { offset: -1 });
        assert_eq!(decode(0x4C00), Instruction::Jsr { offset: -1024 });
        assert_eq!(decode(0x4080), Instruction::Jsrr { base: 2 });
        // Bits 10-9 are unused by JSRR.
        assert_eq!(decode(0x4280), Instruction::Jsrr { base: 2 });
    }

    #[test]
    fn test_decode_memory_forms() {
        assert_eq!(decode(0x6283), Instruction::Ldr { dr: 1, base: 2, offset: 3 });
        assert_eq!(decode(0x7FBF), Instruction::Str { sr: 7, base: 6, offset: -1 });
        assert_eq!(decode(0xA402), Instruction::Ldi { dr: 2, offset: 2 });
        assert_eq!(decode(0xE1FE), Instruction::Lea { dr: 0, offset: -2 });
    }

    #[test]
    fn test_decode_trap_and_reserved() {
        assert_eq!(decode(0xF025), Instruction::Trap { vector: 0x25 });
        assert_eq!(decode(0x8000), Instruction::Rti { raw: 0x8000 });
        assert_eq!(decode(0xD123), Instruction::Res { raw: 0xD123 });
    }

    #[test]
    fn test_decode_is_total() {
        for word in 0..=u16::MAX {
            let _ = decode(word);
        }
    }

    #[test]
    fn test_encode_canonical_words() {
        let words = [
            0x1025, 0x12BF, 0x1705, 0x0FFF, 0x0403, 0x4FFF, 0x4080, 0x6283, 0x7FBF, 0xA402,
            0xE1FE, 0xF025, 0x907F, 0xC1C0, 0x2A10, 0x3A10, 0xBA10, 0x5020, 0x8000, 0xD123,
        ];
        for word in words {
            assert_eq!(encode(&decode(word)), word, "word {:#06x}", word);
        }
    }
}
