//! LC-3 register file.
//!
//! - R0-R7: general purpose; R7 receives return addresses
//! - PC: program counter, word addressed
//! - COND: one of POSITIVE, ZERO, NEGATIVE

use serde::{Deserialize, Serialize};

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 8;

/// Register that receives the return address on JSR, JSRR and TRAP.
pub const R7: u8 = 7;

/// Condition flag. Exactly one is set at any time.
///
/// The discriminants are the bits tested by the BR condition mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CondFlag {
    Pos = 1 << 0,
    Zero = 1 << 1,
    Neg = 1 << 2,
}

impl CondFlag {
    /// Classify a word by its two's-complement sign.
    pub fn from_value(value: u16) -> Self {
        if value == 0 {
            CondFlag::Zero
        } else if value & 0x8000 != 0 {
            CondFlag::Neg
        } else {
            CondFlag::Pos
        }
    }

    /// The flag's bit in a BR condition mask.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// Sign-extend the low `bit_count` bits of `value` to 16 bits.
///
/// Bits above the field are ignored, so the result depends only on the
/// field itself.
#[inline]
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    debug_assert!((1..=16).contains(&bit_count));
    if bit_count >= 16 {
        return value;
    }
    let field = value & ((1 << bit_count) - 1);
    if (field >> (bit_count - 1)) & 1 != 0 {
        field | (0xFFFF << bit_count)
    } else {
        field
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    pub gpr: [u16; GPR_COUNT],

    /// Address of the next instruction to fetch.
    pub pc: u16,

    /// Condition flag from the last register-writing instruction.
    pub cond: CondFlag,
}

impl Registers {
    /// Create a register file with all values zeroed and the ZERO flag set.
    pub fn new() -> Self {
        Self {
            gpr: [0; GPR_COUNT],
            pc: 0,
            cond: CondFlag::Zero,
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register. Only the low 3 bits of `r` are used.
    #[inline]
    pub fn get(&self, r: u8) -> u16 {
        self.gpr[(r & 0x7) as usize]
    }

    /// Write a general-purpose register without touching the flags.
    #[inline]
    pub fn set(&mut self, r: u8, value: u16) {
        self.gpr[(r & 0x7) as usize] = value;
    }

    /// Set COND from the current value of register `r`.
    pub fn update_flags(&mut self, r: u8) {
        self.cond = CondFlag::from_value(self.get(r));
    }

    /// Write a register and update COND from it.
    pub fn set_with_flags(&mut self, r: u8, value: u16) {
        self.set(r, value);
        self.update_flags(r);
    }

    /// Increment the program counter by one word, wrapping.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// PC plus a signed offset, wrapping.
    pub fn pc_relative(&self, offset: i16) -> u16 {
        self.pc.wrapping_add_signed(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b00101, 5), 5);
        assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
        assert_eq!(sign_extend(0b10000, 5), 0xFFF0);
        assert_eq!(sign_extend(0x1FF, 9), 0xFFFF);
        assert_eq!(sign_extend(0x0FF, 9), 0x00FF);
        assert_eq!(sign_extend(0x400, 11), 0xFC00);
        assert_eq!(sign_extend(0x20, 6), 0xFFE0);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        assert_eq!(sign_extend(0x1025, 5), 5);
    }

    #[test]
    fn test_flags_from_value() {
        let mut regs = Registers::new();

        regs.set_with_flags(3, 100);
        assert_eq!(regs.cond, CondFlag::Pos);

        regs.set_with_flags(3, 0x8000);
        assert_eq!(regs.cond, CondFlag::Neg);

        regs.set_with_flags(3, 0);
        assert_eq!(regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_set_leaves_flags_alone() {
        let mut regs = Registers::new();
        regs.set(1, 0xFFFF);
        assert_eq!(regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_pc_relative() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;
        assert_eq!(regs.pc_relative(-1), 0x3000);
        assert_eq!(regs.pc_relative(255), 0x3100);
    }

    proptest! {
        #[test]
        fn prop_flags_match_sign(r in 0u8..8, v in any::<u16>()) {
            let mut regs = Registers::new();
            regs.set(r, v);
            regs.update_flags(r);

            let expected = if v == 0 {
                CondFlag::Zero
            } else if (v as i16) < 0 {
                CondFlag::Neg
            } else {
                CondFlag::Pos
            };
            prop_assert_eq!(regs.cond, expected);
            prop_assert_eq!(regs.cond.bits().count_ones(), 1);
        }

        #[test]
        fn prop_sign_extend_idempotent(x in any::<u16>(), n in 1u32..=16) {
            let once = sign_extend(x, n);
            prop_assert_eq!(sign_extend(once, n), once);
        }

        #[test]
        fn prop_sign_extend_preserves_signed_value(x in any::<u16>(), n in 1u32..16) {
            let field = (x & ((1 << n) - 1)) as i32;
            let signed = if field >= 1 << (n - 1) { field - (1 << n) } else { field };
            prop_assert_eq!(sign_extend(x, n) as i16 as i32, signed);
        }
    }
}
