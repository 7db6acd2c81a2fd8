//! Disassembler for LC-3 programs.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, Instruction, Operand};
use crate::cpu::trap::TrapVector;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(word: u16) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a block of words loaded at `origin`.
pub fn disassemble(origin: u16, words: &[u16]) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str("; ----------------\n");
    output.push_str(&format!(".ORIG x{:04X}\n", origin));

    let mut addr = origin;
    for &word in words {
        let line = disassemble_instruction(word);
        output.push_str(&format!("x{:04X}: {:04X}  {}\n", addr, word, line));
        addr = addr.wrapping_add(1);
    }

    output.push_str(".END\n");
    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // Operate
        Instruction::Add { dr, sr1, src2 } => format!("ADD R{}, R{}, {}", dr, sr1, format_operand(src2)),
        Instruction::And { dr, sr1, src2 } => format!("AND R{}, R{}, {}", dr, sr1, format_operand(src2)),
        Instruction::Not { dr, sr } => format!("NOT R{}, R{}", dr, sr),

        // Data movement
        Instruction::Ld { dr, offset } => format!("LD R{}, #{}", dr, offset),
        Instruction::Ldi { dr, offset } => format!("LDI R{}, #{}", dr, offset),
        Instruction::Ldr { dr, base, offset } => format!("LDR R{}, R{}, #{}", dr, base, offset),
        Instruction::Lea { dr, offset } => format!("LEA R{}, #{}", dr, offset),
        Instruction::St { sr, offset } => format!("ST R{}, #{}", sr, offset),
        Instruction::Sti { sr, offset } => format!("STI R{}, #{}", sr, offset),
        Instruction::Str { sr, base, offset } => format!("STR R{}, R{}, #{}", sr, base, offset),

        // Control
        Instruction::Br { mask: 0, .. } => "NOP".to_string(),
        Instruction::Br { mask, offset } => format!("BR{} #{}", format_condition(mask), offset),
        Instruction::Jmp { base: 7 } => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP R{}", base),
        Instruction::Jsr { offset } => format!("JSR #{}", offset),
        Instruction::Jsrr { base } => format!("JSRR R{}", base),
        Instruction::Trap { vector } => match TrapVector::from_code(vector) {
            Some(trap) => trap.name().to_string(),
            None => format!("TRAP x{:02X}", vector),
        },

        // Reserved
        Instruction::Rti { raw } | Instruction::Res { raw } => format!(".FILL x{:04X}", raw),
    }
}

/// Format an ADD/AND second operand.
fn format_operand(src2: Operand) -> String {
    match src2 {
        Operand::Reg(r) => format!("R{}", r),
        Operand::Imm(imm) => format!("#{}", imm),
    }
}

/// Format a BR condition mask as its n/z/p suffix.
fn format_condition(mask: u8) -> String {
    let mut suffix = String::new();
    if mask & 0b100 != 0 {
        suffix.push('n');
    }
    if mask & 0b010 != 0 {
        suffix.push('z');
    }
    if mask & 0b001 != 0 {
        suffix.push('p');
    }
    suffix
}
