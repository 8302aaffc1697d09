use bitflags::bitflags;
use slog::Logger;

use crate::bus::Memory;
use crate::error::CpuError;
use crate::opcodes::{self, AddressingMode, Mnemonic, Opcode};

pub const STACK_PAGE: u16 = 0x0100;
pub const STACK_RESET: u8 = 0xFD;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles spent entering an interrupt handler, and accounted for a reset.
pub const INTERRUPT_CYCLES: u32 = 7;

bitflags! {
    /// Processor status byte.
    ///
    /// `BREAK` and `UNUSED` have no storage in the register itself; they only
    /// appear in copies pushed to the stack.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY = 0b0000_0001;
        const ZERO = 0b0000_0010;
        const INTERRUPT_DISABLE = 0b0000_0100;
        const DECIMAL = 0b0000_1000;
        const BREAK = 0b0001_0000;
        const UNUSED = 0b0010_0000;
        const OVERFLOW = 0b0100_0000;
        const NEGATIVE = 0b1000_0000;
    }
}

impl Status {
    fn pushed(self, brk: bool) -> u8 {
        let mut p = self | Status::UNUSED;
        p.set(Status::BREAK, brk);
        p.bits()
    }

    fn pulled(value: u8) -> Status {
        Status::from_bits_truncate(value) - (Status::BREAK | Status::UNUSED)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub s: u8,
    pub p: Status,
    pub a: u8,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Irq,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CpuState {
    Running,
    Halted,
}

/// What to do with opcodes outside the documented instruction set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IllegalOpcodePolicy {
    /// Report `UnimplementedOpcode` and halt.
    Halt,
    /// Execute the undocumented NOP family as the hardware does; halt on anything else.
    Nop,
}

impl Default for IllegalOpcodePolicy {
    fn default() -> IllegalOpcodePolicy {
        IllegalOpcodePolicy::Halt
    }
}

pub struct CPU {
    regs: Registers,
    state: CpuState,
    nmi_pending: bool,
    irq_pending: bool,
    illegal_opcodes: IllegalOpcodePolicy,
    cycles: u64,
    log: Logger,
}

impl std::fmt::Debug for CPU {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CPU")
            .field("regs", &self.regs)
            .field("state", &self.state)
            .field("nmi_pending", &self.nmi_pending)
            .field("irq_pending", &self.irq_pending)
            .field("cycles", &self.cycles)
            .finish()
    }
}

/// Effective address and whether indexing moved it onto another page.
#[derive(Debug, Copy, Clone)]
struct Operand {
    addr: Option<u16>,
    page_crossed: bool,
}

impl Operand {
    fn none() -> Operand {
        Operand {
            addr: None,
            page_crossed: false,
        }
    }

    fn at(addr: u16) -> Operand {
        Operand {
            addr: Some(addr),
            page_crossed: false,
        }
    }

    fn indexed(base: u16, addr: u16) -> Operand {
        Operand {
            addr: Some(addr),
            page_crossed: !same_page(base, addr),
        }
    }
}

#[inline]
fn same_page(a: u16, b: u16) -> bool {
    (a & 0xFF00) == (b & 0xFF00)
}

impl CPU {
    pub fn new<L: Into<Option<Logger>>>(log: L, illegal_opcodes: IllegalOpcodePolicy) -> CPU {
        CPU {
            regs: Registers {
                pc: 0,
                s: STACK_RESET,
                p: Status::INTERRUPT_DISABLE,
                a: 0,
                x: 0,
                y: 0,
            },
            state: CpuState::Running,
            nmi_pending: false,
            irq_pending: false,
            illegal_opcodes,
            cycles: 0,
            log: log
                .into()
                .unwrap_or_else(|| Logger::root(slog::Discard, o!())),
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn get_pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Cycles consumed since the last reset, including the reset itself.
    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    /// Stop executing until the next reset.
    pub fn halt(&mut self) {
        self.state = CpuState::Halted;
    }

    pub fn reset<M: Memory>(&mut self, mem: &mut M) {
        self.regs.pc = mem.read_u16(RESET_VECTOR);
        self.regs.s = STACK_RESET;
        self.regs.p.insert(Status::INTERRUPT_DISABLE);
        self.regs.p.remove(Status::BREAK | Status::UNUSED);
        self.state = CpuState::Running;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.cycles = INTERRUPT_CYCLES as u64;
        info!(self.log, "reset"; "pc" => format!("{:#06X}", self.regs.pc));
    }

    /// Latch an interrupt request. It is taken at the start of the next `step`.
    pub fn request_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Nmi => self.nmi_pending = true,
            Interrupt::Irq => self.irq_pending = true,
        }
    }

    /// Run one instruction, or enter a pending interrupt handler, and return the cycles spent.
    ///
    /// A halted CPU does nothing and reports zero cycles.
    pub fn step<M: Memory>(&mut self, mem: &mut M) -> Result<u32, CpuError> {
        if self.is_halted() {
            return Ok(0);
        }

        if let Some(cycles) = self.poll_interrupts(mem) {
            self.cycles += cycles as u64;
            return Ok(cycles);
        }

        let pc = self.regs.pc;
        let opcode = self.fetch_byte(mem);
        let op = match self.decode(opcode) {
            Some(op) => op,
            None => {
                self.regs.pc = pc;
                self.state = CpuState::Halted;
                warn!(self.log, "halting on unimplemented opcode";
                      "opcode" => format!("{:#04X}", opcode),
                      "pc" => format!("{:#06X}", pc));
                return Err(CpuError::UnimplementedOpcode { opcode, pc });
            }
        };

        let cycles = self.execute(mem, op);
        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// nestest-style trace of the instruction at PC, read without bus side effects.
    pub fn trace_line<M: Memory>(&self, mem: &M) -> String {
        let pc = self.regs.pc;
        let opcode = mem.peek(pc);
        let (size, name) = match self.decode(opcode) {
            Some(op) => (op.size(), op.mnemonic.name()),
            None => (1, "???"),
        };

        let bytes: Vec<String> = (0..size)
            .map(|i| format!("{:02X}", mem.peek(pc.wrapping_add(i))))
            .collect();

        format!(
            "{:04X}  {:<8}  {:<4}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            bytes.join(" "),
            name,
            self.regs.a,
            self.regs.x,
            self.regs.y,
            (self.regs.p | Status::UNUSED).bits(),
            self.regs.s,
            self.cycles
        )
    }

    fn decode(&self, opcode: u8) -> Option<&'static Opcode> {
        opcodes::decode(opcode).or_else(|| match self.illegal_opcodes {
            IllegalOpcodePolicy::Nop => opcodes::decode_illegal_nop(opcode),
            IllegalOpcodePolicy::Halt => None,
        })
    }

    fn poll_interrupts<M: Memory>(&mut self, mem: &mut M) -> Option<u32> {
        if self.nmi_pending {
            self.nmi_pending = false;
            debug!(self.log, "entering NMI handler");
            return Some(self.interrupt(mem, NMI_VECTOR));
        }

        if self.irq_pending {
            self.irq_pending = false;
            if self.regs.p.contains(Status::INTERRUPT_DISABLE) {
                debug!(self.log, "IRQ ignored, interrupts disabled");
                return None;
            }
            debug!(self.log, "entering IRQ handler");
            return Some(self.interrupt(mem, IRQ_VECTOR));
        }

        None
    }

    fn interrupt<M: Memory>(&mut self, mem: &mut M, vector: u16) -> u32 {
        self.push_u16(mem, self.regs.pc);
        self.push(mem, self.regs.p.pushed(false));
        self.regs.p.insert(Status::INTERRUPT_DISABLE);
        self.regs.pc = mem.read_u16(vector);
        INTERRUPT_CYCLES
    }

    pub fn fetch_byte<M: Memory>(&mut self, mem: &mut M) -> u8 {
        let result = mem.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        result
    }

    fn fetch_word<M: Memory>(&mut self, mem: &mut M) -> u16 {
        let lo = self.fetch_byte(mem) as u16;
        let hi = self.fetch_byte(mem) as u16;
        (hi << 8) | lo
    }

    /// Pointer stored in the zero page; the high byte wraps to $00.
    fn read_zero_page_word<M: Memory>(mem: &mut M, ptr: u8) -> u16 {
        let lo = mem.read(ptr as u16) as u16;
        let hi = mem.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn push<M: Memory>(&mut self, mem: &mut M, value: u8) {
        mem.write(STACK_PAGE | self.regs.s as u16, value);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    fn pop<M: Memory>(&mut self, mem: &mut M) -> u8 {
        self.regs.s = self.regs.s.wrapping_add(1);
        mem.read(STACK_PAGE | self.regs.s as u16)
    }

    fn push_u16<M: Memory>(&mut self, mem: &mut M, value: u16) {
        self.push(mem, (value >> 8) as u8);
        self.push(mem, value as u8);
    }

    fn pop_u16<M: Memory>(&mut self, mem: &mut M) -> u16 {
        let lo = self.pop(mem) as u16;
        let hi = self.pop(mem) as u16;
        (hi << 8) | lo
    }

    fn resolve<M: Memory>(&mut self, mem: &mut M, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => Operand::none(),
            AddressingMode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Operand::at(addr)
            }
            AddressingMode::ZeroPage => Operand::at(self.fetch_byte(mem) as u16),
            AddressingMode::ZeroPageX => {
                Operand::at(self.fetch_byte(mem).wrapping_add(self.regs.x) as u16)
            }
            AddressingMode::ZeroPageY => {
                Operand::at(self.fetch_byte(mem).wrapping_add(self.regs.y) as u16)
            }
            AddressingMode::Absolute => Operand::at(self.fetch_word(mem)),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(mem);
                Operand::indexed(base, base.wrapping_add(self.regs.x as u16))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(mem);
                Operand::indexed(base, base.wrapping_add(self.regs.y as u16))
            }
            AddressingMode::Indirect => {
                // The pointer's high byte is fetched without carrying into the next page.
                let ptr = self.fetch_word(mem);
                let lo = mem.read(ptr) as u16;
                let hi = mem.read((ptr & 0xFF00) | (ptr as u8).wrapping_add(1) as u16) as u16;
                Operand::at((hi << 8) | lo)
            }
            AddressingMode::IndirectX => {
                let ptr = self.fetch_byte(mem).wrapping_add(self.regs.x);
                Operand::at(CPU::read_zero_page_word(mem, ptr))
            }
            AddressingMode::IndirectY => {
                let ptr = self.fetch_byte(mem);
                let base = CPU::read_zero_page_word(mem, ptr);
                Operand::indexed(base, base.wrapping_add(self.regs.y as u16))
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte(mem) as i8;
                let next = self.regs.pc;
                Operand::indexed(next, next.wrapping_add(offset as i16 as u16))
            }
        }
    }

    fn set_zn(&mut self, value: u8) {
        self.regs.p.set(Status::ZERO, value == 0);
        self.regs.p.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    fn load<M: Memory>(&mut self, mem: &mut M, operand: Operand) -> u8 {
        match operand.addr {
            Some(addr) => mem.read(addr),
            None => self.regs.a,
        }
    }

    /// Read-modify-write on memory or, with no address, on the accumulator.
    fn modify<M: Memory, F: FnOnce(&mut CPU, u8) -> u8>(
        &mut self,
        mem: &mut M,
        operand: Operand,
        f: F,
    ) {
        match operand.addr {
            Some(addr) => {
                let old = mem.read(addr);
                // the unmodified value is written back before the result
                mem.write(addr, old);
                let new = f(self, old);
                mem.write(addr, new);
            }
            None => {
                let old = self.regs.a;
                self.regs.a = f(self, old);
            }
        }
    }

    fn store<M: Memory>(mem: &mut M, operand: Operand, value: u8) {
        if let Some(addr) = operand.addr {
            mem.write(addr, value);
        }
    }

    fn add_with_carry(&mut self, value: u8) {
        let a = self.regs.a;
        let sum = a as u16 + value as u16 + self.regs.p.contains(Status::CARRY) as u16;
        let result = sum as u8;
        self.regs.p.set(Status::CARRY, sum > 0xFF);
        self.regs
            .p
            .set(Status::OVERFLOW, (!(a ^ value) & (a ^ result) & 0x80) != 0);
        self.regs.a = result;
        self.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.p.set(Status::CARRY, register >= value);
        self.set_zn(register.wrapping_sub(value));
    }

    fn shift_left(&mut self, value: u8, carry_in: bool) -> u8 {
        let result = (value << 1) | carry_in as u8;
        self.regs.p.set(Status::CARRY, value & 0x80 != 0);
        self.set_zn(result);
        result
    }

    fn shift_right(&mut self, value: u8, carry_in: bool) -> u8 {
        let result = (value >> 1) | ((carry_in as u8) << 7);
        self.regs.p.set(Status::CARRY, value & 0x01 != 0);
        self.set_zn(result);
        result
    }

    /// Taken branches cost one cycle, plus one more when the target is on another page.
    fn branch(&mut self, operand: Operand, condition: bool) -> u32 {
        match operand.addr {
            Some(target) if condition => {
                self.regs.pc = target;
                1 + operand.page_crossed as u32
            }
            _ => 0,
        }
    }

    /// Executes a decoded instruction and returns its total cycle count.
    fn execute<M: Memory>(&mut self, mem: &mut M, op: &Opcode) -> u32 {
        let operand = self.resolve(mem, op.mode);
        let mut cycles = op.cycles as u32;
        if op.page_penalty && operand.page_crossed && !op.mnemonic.is_branch() {
            cycles += 1;
        }

        let carry = self.regs.p.contains(Status::CARRY);

        match op.mnemonic {
            Mnemonic::Adc => {
                let value = self.load(mem, operand);
                self.add_with_carry(value);
            }
            Mnemonic::Sbc => {
                // decimal mode is tracked but arithmetic stays binary
                let value = self.load(mem, operand);
                self.add_with_carry(!value);
            }
            Mnemonic::And => {
                self.regs.a &= self.load(mem, operand);
                self.set_zn(self.regs.a);
            }
            Mnemonic::Ora => {
                self.regs.a |= self.load(mem, operand);
                self.set_zn(self.regs.a);
            }
            Mnemonic::Eor => {
                self.regs.a ^= self.load(mem, operand);
                self.set_zn(self.regs.a);
            }
            Mnemonic::Asl => self.modify(mem, operand, |cpu, v| cpu.shift_left(v, false)),
            Mnemonic::Rol => self.modify(mem, operand, |cpu, v| cpu.shift_left(v, carry)),
            Mnemonic::Lsr => self.modify(mem, operand, |cpu, v| cpu.shift_right(v, false)),
            Mnemonic::Ror => self.modify(mem, operand, |cpu, v| cpu.shift_right(v, carry)),
            Mnemonic::Inc => self.modify(mem, operand, |cpu, v| {
                let r = v.wrapping_add(1);
                cpu.set_zn(r);
                r
            }),
            Mnemonic::Dec => self.modify(mem, operand, |cpu, v| {
                let r = v.wrapping_sub(1);
                cpu.set_zn(r);
                r
            }),
            Mnemonic::Bit => {
                let value = self.load(mem, operand);
                self.regs.p.set(Status::ZERO, self.regs.a & value == 0);
                self.regs.p.set(Status::OVERFLOW, value & 0x40 != 0);
                self.regs.p.set(Status::NEGATIVE, value & 0x80 != 0);
            }
            Mnemonic::Cmp => {
                let value = self.load(mem, operand);
                self.compare(self.regs.a, value);
            }
            Mnemonic::Cpx => {
                let value = self.load(mem, operand);
                self.compare(self.regs.x, value);
            }
            Mnemonic::Cpy => {
                let value = self.load(mem, operand);
                self.compare(self.regs.y, value);
            }
            Mnemonic::Bcc => cycles += self.branch(operand, !carry),
            Mnemonic::Bcs => cycles += self.branch(operand, carry),
            Mnemonic::Beq => {
                let z = self.regs.p.contains(Status::ZERO);
                cycles += self.branch(operand, z)
            }
            Mnemonic::Bne => {
                let z = self.regs.p.contains(Status::ZERO);
                cycles += self.branch(operand, !z)
            }
            Mnemonic::Bmi => {
                let n = self.regs.p.contains(Status::NEGATIVE);
                cycles += self.branch(operand, n)
            }
            Mnemonic::Bpl => {
                let n = self.regs.p.contains(Status::NEGATIVE);
                cycles += self.branch(operand, !n)
            }
            Mnemonic::Bvc => {
                let v = self.regs.p.contains(Status::OVERFLOW);
                cycles += self.branch(operand, !v)
            }
            Mnemonic::Bvs => {
                let v = self.regs.p.contains(Status::OVERFLOW);
                cycles += self.branch(operand, v)
            }
            Mnemonic::Brk => {
                // BRK skips a padding byte
                let ret = self.regs.pc.wrapping_add(1);
                self.push_u16(mem, ret);
                self.push(mem, self.regs.p.pushed(true));
                self.regs.p.insert(Status::INTERRUPT_DISABLE);
                self.regs.pc = mem.read_u16(IRQ_VECTOR);
            }
            Mnemonic::Clc => self.regs.p.remove(Status::CARRY),
            Mnemonic::Cld => self.regs.p.remove(Status::DECIMAL),
            Mnemonic::Cli => self.regs.p.remove(Status::INTERRUPT_DISABLE),
            Mnemonic::Clv => self.regs.p.remove(Status::OVERFLOW),
            Mnemonic::Sec => self.regs.p.insert(Status::CARRY),
            Mnemonic::Sed => self.regs.p.insert(Status::DECIMAL),
            Mnemonic::Sei => self.regs.p.insert(Status::INTERRUPT_DISABLE),
            Mnemonic::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_zn(self.regs.x);
            }
            Mnemonic::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_zn(self.regs.y);
            }
            Mnemonic::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_zn(self.regs.x);
            }
            Mnemonic::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_zn(self.regs.y);
            }
            Mnemonic::Jmp => {
                if let Some(addr) = operand.addr {
                    self.regs.pc = addr;
                }
            }
            Mnemonic::Jsr => {
                let ret = self.regs.pc.wrapping_sub(1);
                self.push_u16(mem, ret);
                if let Some(addr) = operand.addr {
                    self.regs.pc = addr;
                }
            }
            Mnemonic::Rts => {
                self.regs.pc = self.pop_u16(mem).wrapping_add(1);
            }
            Mnemonic::Rti => {
                let p = self.pop(mem);
                self.regs.p = Status::pulled(p);
                self.regs.pc = self.pop_u16(mem);
            }
            Mnemonic::Lda => {
                self.regs.a = self.load(mem, operand);
                self.set_zn(self.regs.a);
            }
            Mnemonic::Ldx => {
                self.regs.x = self.load(mem, operand);
                self.set_zn(self.regs.x);
            }
            Mnemonic::Ldy => {
                self.regs.y = self.load(mem, operand);
                self.set_zn(self.regs.y);
            }
            Mnemonic::Sta => CPU::store(mem, operand, self.regs.a),
            Mnemonic::Stx => CPU::store(mem, operand, self.regs.x),
            Mnemonic::Sty => CPU::store(mem, operand, self.regs.y),
            Mnemonic::Nop => {
                // undocumented NOPs still perform their operand read
                if let Some(addr) = operand.addr {
                    mem.read(addr);
                }
            }
            Mnemonic::Pha => self.push(mem, self.regs.a),
            Mnemonic::Php => self.push(mem, self.regs.p.pushed(true)),
            Mnemonic::Pla => {
                self.regs.a = self.pop(mem);
                self.set_zn(self.regs.a);
            }
            Mnemonic::Plp => {
                let p = self.pop(mem);
                self.regs.p = Status::pulled(p);
            }
            Mnemonic::Tax => {
                self.regs.x = self.regs.a;
                self.set_zn(self.regs.x);
            }
            Mnemonic::Tay => {
                self.regs.y = self.regs.a;
                self.set_zn(self.regs.y);
            }
            Mnemonic::Tsx => {
                self.regs.x = self.regs.s;
                self.set_zn(self.regs.x);
            }
            Mnemonic::Txa => {
                self.regs.a = self.regs.x;
                self.set_zn(self.regs.a);
            }
            Mnemonic::Txs => self.regs.s = self.regs.x,
            Mnemonic::Tya => {
                self.regs.a = self.regs.y;
                self.set_zn(self.regs.a);
            }
        }

        cycles
    }
}
