//! The machine as a whole: one CPU driving one bus.

use slog::{Drain, Logger};

use crate::bus::{Bus, Memory};
use crate::cpu::{Interrupt, CPU};
use crate::error::{CpuError, LoadError};
use crate::ines::load_cartridge;

pub use crate::cpu::IllegalOpcodePolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub illegal_opcodes: IllegalOpcodePolicy,
}

pub struct System {
    bus: Bus,
    cpu: CPU,
    log: Logger,
}

impl System {
    pub fn new<L: Into<Option<Logger>>>(log: L, config: Config) -> System {
        let log = log
            .into()
            .unwrap_or_else(|| Logger::root(slog::Discard, o!()));

        System {
            bus: Bus::new(log.new(o!("component" => "bus"))),
            cpu: CPU::new(log.new(o!("component" => "cpu")), config.illegal_opcodes),
            log,
        }
    }

    /// Parse an iNES image and insert it. On failure the machine is left with no cartridge.
    pub fn load_cartridge(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        self.bus.eject_cartridge();
        let cartridge = load_cartridge(bytes)?;
        self.bus.insert_cartridge(cartridge)
    }

    pub fn reset(&mut self) {
        self.bus.reset_mapper();
        self.cpu.reset(&mut self.bus);
        info!(self.log, "system reset";
              "pc" => format!("{:#06X}", self.cpu.get_pc()),
              "cartridge" => self.bus.has_cartridge());
    }

    /// Execute one instruction (or interrupt entry) and return its cycle count.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        if !self.cpu.is_halted() && self.log.is_trace_enabled() {
            trace!(self.log, "{}", self.cpu.trace_line(&self.bus));
        }
        self.cpu.step(&mut self.bus)
    }

    /// Step until `budget` instructions have run or the CPU halts. Returns the cycles spent.
    pub fn run(&mut self, budget: u64) -> Result<u64, CpuError> {
        let mut cycles = 0;
        for _ in 0..budget {
            if self.cpu.is_halted() {
                break;
            }
            cycles += self.step()? as u64;
        }
        Ok(cycles)
    }

    pub fn request_interrupt(&mut self, kind: Interrupt) {
        self.cpu.request_interrupt(kind);
    }

    pub fn read_bus(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    pub fn write_bus(&mut self, addr: u16, value: u8) {
        self.bus.write(addr, value);
    }

    pub fn peek_bus(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    pub fn halt(&mut self) {
        warn!(self.log, "halt requested"; "pc" => format!("{:#06X}", self.cpu.get_pc()));
        self.cpu.halt();
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ines::{MAGIC, PRG_UNIT_SIZE};

    fn image(program: &[u8]) -> Vec<u8> {
        let mut rom = MAGIC.to_vec();
        rom.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut prg = vec![0xEA; PRG_UNIT_SIZE];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        rom.extend_from_slice(&prg);
        rom
    }

    #[test]
    fn run_stops_at_halt() {
        let mut system = System::new(None, Config::default());
        system.load_cartridge(&image(&[0xA9, 0x01, 0x02])).unwrap();
        system.reset();

        let result = system.run(10);
        assert!(matches!(
            result,
            Err(CpuError::UnimplementedOpcode { opcode: 0x02, pc: 0x8002 })
        ));
        assert!(system.is_halted());
        assert_eq!(system.run(10), Ok(0));
    }

    #[test]
    fn run_counts_cycles() {
        let mut system = System::new(None, Config::default());
        system.load_cartridge(&image(&[])).unwrap();
        system.reset();

        assert_eq!(system.run(5), Ok(10));
        assert_eq!(system.cpu().total_cycles(), 17);
    }

    #[test]
    fn failed_load_leaves_slot_empty() {
        let mut system = System::new(None, Config::default());
        system.load_cartridge(&image(&[])).unwrap();

        let mut bad = image(&[]);
        bad.truncate(100);
        assert!(system.load_cartridge(&bad).is_err());
        assert!(!system.bus().has_cartridge());
        assert_eq!(system.peek_bus(0x8000), 0xFF);
    }

    #[test]
    fn discarded_logger_skips_trace_formatting() {
        let mut system = System::new(None, Config::default());
        system.load_cartridge(&image(&[0xA9, 0x01])).unwrap();
        system.reset();
        assert!(!system.log.is_trace_enabled());
        assert_eq!(system.step(), Ok(2));
    }

    #[test]
    fn explicit_halt_and_reset() {
        let mut system = System::new(None, Config::default());
        system.load_cartridge(&image(&[])).unwrap();
        system.reset();
        system.halt();
        assert_eq!(system.step(), Ok(0));
        system.reset();
        assert!(!system.is_halted());
        assert_eq!(system.step(), Ok(2));
    }
}
