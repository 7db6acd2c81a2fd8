//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::console::{Console, ConsoleError};
use crate::cpu::decode::{self, Instruction, Operand};
use crate::cpu::memory::{Bus, Memory, MemoryError};
use crate::cpu::registers::{Registers, R7};
use crate::program::disasm::disassemble_instruction;
use crate::program::ProgramImage;

/// Conventional load and start address of user programs.
pub const PC_START: u16 = 0x3000;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// A HALT trap was executed.
    Halted,
    /// The console reported the interrupt key. The instruction in flight
    /// was abandoned, not completed.
    Interrupted,
    /// The console failed.
    Error,
}

/// Registers and run state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub cycles: u64,
    pub registers: Registers,
}

/// The LC-3 CPU, attached to a console.
pub struct Cpu<C> {
    /// CPU registers.
    pub regs: Registers,
    /// Memory and keyboard registers.
    pub bus: Bus<C>,
    /// Current execution state.
    pub state: CpuState,
    /// Completed fetch cycles.
    pub cycles: u64,
    start: u16,
    last_instr: Option<Instruction>,
}

impl<C: Console> Cpu<C> {
    /// Create a CPU that starts at [`PC_START`].
    pub fn new(console: C) -> Self {
        Self::with_start(console, PC_START)
    }

    /// Create a CPU that starts at `start`.
    pub fn with_start(console: C, start: u16) -> Self {
        let mut regs = Registers::new();
        regs.pc = start;
        Self {
            regs,
            bus: Bus::new(console),
            state: CpuState::Running,
            cycles: 0,
            start,
            last_instr: None,
        }
    }

    /// Reset registers and memory; the CPU is ready to run from its start
    /// address again.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.regs.pc = self.start;
        self.bus.memory_mut().clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Copy a program image into memory at its origin.
    pub fn load_image(&mut self, image: &ProgramImage) -> Result<(), MemoryError> {
        self.load_program(image.origin, &image.words)
    }

    /// Copy words into memory at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        self.bus.memory_mut().load_program(origin, program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. If the console reports the
    /// interrupt key the state becomes [`CpuState::Interrupted`] and
    /// [`CpuError::Interrupted`] is returned.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.advance_pc();
        let raw = self.bus.read(pc).map_err(|e| self.console_fault(e))?;

        // Decode
        let instr = decode::decode(raw);
        trace!("{:#06x}: {:#06x}  {}", pc, raw, disassemble_instruction(raw));

        // Execute
        self.execute(pc, instr).map_err(|e| self.console_fault(e))?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until the CPU stops.
    ///
    /// An interrupt is a normal way to stop and comes back as
    /// `Ok(CpuState::Interrupted)`.
    pub fn run(&mut self) -> Result<CpuState, CpuError> {
        while self.state == CpuState::Running {
            self.step_to_state()?;
        }
        Ok(self.state)
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// Returns [`CpuState::Running`] if the limit was reached first.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<CpuState, CpuError> {
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step_to_state()?;
        }

        Ok(self.state)
    }

    fn step_to_state(&mut self) -> Result<(), CpuError> {
        match self.step() {
            Ok(_) | Err(CpuError::Interrupted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Record a console failure in the run state.
    fn console_fault(&mut self, err: ConsoleError) -> CpuError {
        match err {
            ConsoleError::Interrupted => {
                warn!("interrupted at {:#06x}", self.regs.pc.wrapping_sub(1));
                self.state = CpuState::Interrupted;
                CpuError::Interrupted
            }
            other => {
                self.state = CpuState::Error;
                CpuError::Console(other)
            }
        }
    }

    /// Execute a decoded instruction fetched from `addr`.
    /// The PC already points past it.
    fn execute(&mut self, addr: u16, instr: Instruction) -> Result<(), ConsoleError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, src2 } => {
                let result = self.regs.get(sr1).wrapping_add(self.operand(src2));
                self.regs.set_with_flags(dr, result);
            }

            Instruction::And { dr, sr1, src2 } => {
                let result = self.regs.get(sr1) & self.operand(src2);
                self.regs.set_with_flags(dr, result);
            }

            Instruction::Not { dr, sr } => {
                let result = !self.regs.get(sr);
                self.regs.set_with_flags(dr, result);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let value = self.bus.read(self.regs.pc_relative(offset))?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.bus.read(self.regs.pc_relative(offset))?;
                let value = self.bus.read(pointer)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let address = self.base_offset(base, offset);
                let value = self.bus.read(address)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let address = self.regs.pc_relative(offset);
                self.regs.set_with_flags(dr, address);
            }

            Instruction::St { sr, offset } => {
                self.bus.write(self.regs.pc_relative(offset), self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let pointer = self.bus.read(self.regs.pc_relative(offset))?;
                self.bus.write(pointer, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let address = self.base_offset(base, offset);
                self.bus.write(address, self.regs.get(sr));
            }

            // ==================== Control ====================

            Instruction::Br { mask, offset } => {
                if mask as u16 & self.regs.cond.bits() != 0 {
                    self.regs.jump(self.regs.pc_relative(offset));
                }
            }

            Instruction::Jmp { base } => {
                self.regs.jump(self.regs.get(base));
            }

            Instruction::Jsr { offset } => {
                let target = self.regs.pc_relative(offset);
                self.regs.set(R7, self.regs.pc);
                self.regs.jump(target);
            }

            Instruction::Jsrr { base } => {
                // Read the base first so JSRR R7 still jumps to the old R7.
                let target = self.regs.get(base);
                self.regs.set(R7, self.regs.pc);
                self.regs.jump(target);
            }

            Instruction::Trap { vector } => {
                let saved = self.regs.get(R7);
                self.regs.set(R7, self.regs.pc);
                if let Err(e) = self.trap(vector) {
                    // An abandoned trap leaves no register writes behind.
                    self.regs.set(R7, saved);
                    return Err(e);
                }
            }

            // ==================== Reserved ====================

            Instruction::Rti { raw } | Instruction::Res { raw } => {
                warn!("invalid instruction {:#06x} at {:#06x}", raw, addr);
            }
        }

        Ok(())
    }

    fn operand(&self, src2: Operand) -> u16 {
        match src2 {
            Operand::Reg(r) => self.regs.get(r),
            Operand::Imm(imm) => imm as u16,
        }
    }

    fn base_offset(&self, base: u8, offset: i16) -> u16 {
        self.regs.get(base).wrapping_add_signed(offset)
    }

    /// Capture registers and run state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            cycles: self.cycles,
            registers: self.regs.clone(),
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Memory contents without keyboard side effects.
    pub fn memory(&self) -> &Memory {
        self.bus.memory()
    }

    pub fn console(&self) -> &C {
        self.bus.console()
    }

    pub fn console_mut(&mut self) -> &mut C {
        self.bus.console_mut()
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl<C> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("interrupted from the console")]
    Interrupted,

    #[error("console error: {0}")]
    Console(#[source] ConsoleError),
}
