//! CPU address space.
//!
//! ```text
//! $0000-$1FFF  2 KiB internal RAM, mirrored every $0800
//! $2000-$3FFF  8 video registers, mirrored every 8 bytes
//! $4000-$401F  audio / input registers
//! $4020-$FFFF  cartridge space, translated by the mapper
//! ```
//!
//! Every access decodes the address from scratch.

use slog::Logger;

use crate::error::LoadError;
use crate::ines::Cartridge;
use crate::mapper::{create_mapper, Mapper};

pub const RAM_SIZE: usize = 0x0800;
pub const PPU_REGISTER_COUNT: usize = 8;
pub const APU_IO_REGISTER_COUNT: usize = 0x20;

/// Value seen on reads nothing drives.
pub const OPEN_BUS: u8 = 0xFF;

/// Anything the CPU can execute against.
pub trait Memory {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8);

    /// Read without triggering memory-mapped side effects.
    fn peek(&self, addr: u16) -> u8;

    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }
}

/// A register block owned by a subsystem outside this crate (video, audio, input).
///
/// The bus hands it the register index, already reduced by the window's mirroring.
pub trait IoPort {
    fn read_register(&mut self, reg: u16) -> u8;

    fn write_register(&mut self, reg: u16, value: u8);

    fn peek_register(&self, _reg: u16) -> u8 {
        OPEN_BUS
    }
}

/// Stand-in register block: reads return the last value written.
#[derive(Debug, Clone)]
pub struct RegisterLatch {
    regs: Vec<u8>,
}

impl RegisterLatch {
    pub fn new(count: usize) -> RegisterLatch {
        RegisterLatch {
            regs: vec![0; count],
        }
    }
}

impl IoPort for RegisterLatch {
    fn read_register(&mut self, reg: u16) -> u8 {
        self.peek_register(reg)
    }

    fn write_register(&mut self, reg: u16, value: u8) {
        if let Some(slot) = self.regs.get_mut(reg as usize) {
            *slot = value;
        }
    }

    fn peek_register(&self, reg: u16) -> u8 {
        self.regs.get(reg as usize).copied().unwrap_or(OPEN_BUS)
    }
}

struct CartridgeSlot {
    cartridge: Cartridge,
    mapper: Mapper,
}

pub struct Bus {
    ram: [u8; RAM_SIZE],
    ppu: Box<dyn IoPort>,
    apu_io: Box<dyn IoPort>,
    slot: Option<CartridgeSlot>,
    log: Logger,
}

impl Bus {
    pub fn new<L: Into<Option<Logger>>>(log: L) -> Bus {
        Bus {
            ram: [0; RAM_SIZE],
            ppu: Box::new(RegisterLatch::new(PPU_REGISTER_COUNT)),
            apu_io: Box::new(RegisterLatch::new(APU_IO_REGISTER_COUNT)),
            slot: None,
            log: log
                .into()
                .unwrap_or_else(|| Logger::root(slog::Discard, o!())),
        }
    }

    /// Bind a cartridge into $4020-$FFFF. On error the previous cartridge, if any, is removed.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) -> Result<(), LoadError> {
        self.slot = None;
        let mapper = create_mapper(&cartridge)?;
        info!(self.log, "cartridge inserted";
              "mapper" => mapper.name(),
              "prg_bytes" => cartridge.prg_rom().len(),
              "chr_bytes" => cartridge.chr_rom().len());
        self.slot = Some(CartridgeSlot { cartridge, mapper });
        Ok(())
    }

    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        self.slot.take().map(|slot| slot.cartridge)
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.slot.as_ref().map(|slot| &slot.cartridge)
    }

    pub fn mapper(&self) -> Option<&Mapper> {
        self.slot.as_ref().map(|slot| &slot.mapper)
    }

    pub fn has_cartridge(&self) -> bool {
        self.slot.is_some()
    }

    pub fn attach_ppu(&mut self, port: Box<dyn IoPort>) {
        self.ppu = port;
    }

    pub fn attach_apu_io(&mut self, port: Box<dyn IoPort>) {
        self.apu_io = port;
    }

    pub fn reset_mapper(&mut self) {
        if let Some(slot) = self.slot.as_mut() {
            slot.mapper.reset();
        }
    }

    /// Character data as seen at PPU $0000-$1FFF.
    pub fn read_character(&self, addr: u16) -> u8 {
        self.slot
            .as_ref()
            .and_then(|slot| {
                let offset = slot.mapper.translate_character_address(addr)?;
                slot.cartridge.chr_rom().get(offset).copied()
            })
            .unwrap_or(OPEN_BUS)
    }

    fn read_cartridge(&self, addr: u16) -> u8 {
        self.slot
            .as_ref()
            .and_then(|slot| {
                let offset = slot.mapper.translate_cpu_address(addr)?;
                slot.cartridge.prg_rom().get(offset).copied()
            })
            .unwrap_or(OPEN_BUS)
    }

    fn write_cartridge(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.slot.as_mut() {
            if slot.mapper.write_register(addr, value) {
                debug!(self.log, "mapper register write";
                       "mapper" => slot.mapper.name(),
                       "addr" => format!("{:#06X}", addr),
                       "value" => format!("{:#04X}", value));
            }
        }
    }
}

impl Memory for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[addr as usize % RAM_SIZE],
            0x2000..=0x3FFF => self.ppu.read_register(addr % PPU_REGISTER_COUNT as u16),
            0x4000..=0x401F => self.apu_io.read_register(addr - 0x4000),
            0x4020..=0xFFFF => self.read_cartridge(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[addr as usize % RAM_SIZE] = value,
            0x2000..=0x3FFF => self
                .ppu
                .write_register(addr % PPU_REGISTER_COUNT as u16, value),
            0x4000..=0x401F => self.apu_io.write_register(addr - 0x4000, value),
            0x4020..=0xFFFF => self.write_cartridge(addr, value),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[addr as usize % RAM_SIZE],
            0x2000..=0x3FFF => self.ppu.peek_register(addr % PPU_REGISTER_COUNT as u16),
            0x4000..=0x401F => self.apu_io.peek_register(addr - 0x4000),
            0x4020..=0xFFFF => self.read_cartridge(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ines::{load_cartridge, CHR_UNIT_SIZE, MAGIC, PRG_UNIT_SIZE};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cartridge(prg_units: u8, mapper: u8) -> Cartridge {
        let mut rom = MAGIC.to_vec();
        rom.extend_from_slice(&[prg_units, 1, mapper << 4, mapper & 0xF0]);
        rom.extend_from_slice(&[0u8; 8]);
        for unit in 0..prg_units {
            rom.extend(std::iter::repeat(0x10 + unit).take(PRG_UNIT_SIZE));
        }
        rom.extend(std::iter::repeat(0xC5).take(CHR_UNIT_SIZE));
        load_cartridge(&rom).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(u16, u8)>,
        reads: Vec<u16>,
    }

    struct SharedPort(Rc<RefCell<Recorder>>);

    impl IoPort for SharedPort {
        fn read_register(&mut self, reg: u16) -> u8 {
            self.0.borrow_mut().reads.push(reg);
            0x5A
        }

        fn write_register(&mut self, reg: u16, value: u8) {
            self.0.borrow_mut().writes.push((reg, value));
        }
    }

    #[test]
    fn ram_is_mirrored() {
        let mut bus = Bus::new(None);
        bus.write(0x0123, 0x42);
        for base in &[0x0000u16, 0x0800, 0x1000, 0x1800] {
            assert_eq!(bus.read(base + 0x0123), 0x42);
        }
        bus.write(0x1FFF, 0x99);
        assert_eq!(bus.read(0x07FF), 0x99);
    }

    #[test]
    fn register_window_is_routed_modulo_eight() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut bus = Bus::new(None);
        bus.attach_ppu(Box::new(SharedPort(recorder.clone())));

        bus.write(0x2000, 0x80);
        bus.write(0x3FFF, 0x01);
        assert_eq!(bus.read(0x2002), 0x5A);
        assert_eq!(bus.read(0x200A), 0x5A);

        let recorder = recorder.borrow();
        assert_eq!(recorder.writes, vec![(0, 0x80), (7, 0x01)]);
        assert_eq!(recorder.reads, vec![2, 2]);
        // routed writes never land in RAM
        assert_eq!(bus.peek(0x0000), 0);
    }

    #[test]
    fn apu_io_window_uses_offset() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut bus = Bus::new(None);
        bus.attach_apu_io(Box::new(SharedPort(recorder.clone())));

        bus.write(0x4014, 0x02);
        bus.read(0x4016);
        bus.write(0x401F, 0x03);

        let recorder = recorder.borrow();
        assert_eq!(recorder.writes, vec![(0x14, 0x02), (0x1F, 0x03)]);
        assert_eq!(recorder.reads, vec![0x16]);
    }

    #[test]
    fn default_latches_hold_last_write() {
        let mut bus = Bus::new(None);
        bus.write(0x2005, 0x33);
        assert_eq!(bus.read(0x2005), 0x33);
        assert_eq!(bus.peek(0x200D), 0x33);
        bus.write(0x4017, 0x40);
        assert_eq!(bus.read(0x4017), 0x40);
    }

    #[test]
    fn cartridge_space_without_cartridge_is_open_bus() {
        let mut bus = Bus::new(None);
        bus.write(0x8000, 0x12);
        assert_eq!(bus.read(0x8000), OPEN_BUS);
        assert_eq!(bus.read(0xFFFC), OPEN_BUS);
        assert_eq!(bus.read_character(0x0000), OPEN_BUS);
    }

    #[test]
    fn nrom_cartridge_space_is_read_only() {
        let mut bus = Bus::new(None);
        bus.insert_cartridge(cartridge(2, 0)).unwrap();
        assert_eq!(bus.read(0x8000), 0x10);
        assert_eq!(bus.read(0xC000), 0x11);
        bus.write(0x8000, 0xFF);
        assert_eq!(bus.read(0x8000), 0x10);
        assert_eq!(bus.read(0x5000), OPEN_BUS);
        assert_eq!(bus.read_character(0x1000), 0xC5);
    }

    #[test]
    fn nrom_128_mirrors_into_upper_half() {
        let mut bus = Bus::new(None);
        bus.insert_cartridge(cartridge(1, 0)).unwrap();
        assert_eq!(bus.read(0x8000), bus.read(0xC000));
        assert_eq!(bus.read(0xBFFF), bus.read(0xFFFF));
    }

    #[test]
    fn bank_select_reaches_mapper() {
        let mut bus = Bus::new(None);
        bus.insert_cartridge(cartridge(4, 2)).unwrap();
        assert_eq!(bus.mapper().map(|m| m.name()), Some("UxROM"));
        assert_eq!(bus.read(0x8000), 0x10);
        assert_eq!(bus.read(0xC000), 0x13);

        bus.write(0x8000, 2);
        assert_eq!(bus.read(0x8000), 0x12);

        bus.reset_mapper();
        assert_eq!(bus.read(0x8000), 0x10);
    }

    #[test]
    fn unsupported_mapper_leaves_bus_empty() {
        let mut bus = Bus::new(None);
        bus.insert_cartridge(cartridge(1, 0)).unwrap();
        let err = bus.insert_cartridge(cartridge(1, 9)).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedMapper(9)));
        assert!(!bus.has_cartridge());
        assert!(bus.mapper().is_none());
        assert_eq!(bus.read(0x8000), OPEN_BUS);
    }
}
