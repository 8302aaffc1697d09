//! Discrete-logic boards with a single bank-select latch at $8000-$FFFF.

use crate::ines::{Cartridge, CHR_UNIT_SIZE, PRG_UNIT_SIZE};
use crate::nrom_mapper::{direct_character_offset, Nrom};

/// UxROM (mapper 2): switchable 16 KiB program bank at $8000, last bank fixed at $C000.
#[derive(Debug, Clone)]
pub struct Uxrom {
    bank: usize,
    bank_count: usize,
    chr_len: usize,
}

impl Uxrom {
    pub fn new(cartridge: &Cartridge) -> Uxrom {
        Uxrom {
            bank: 0,
            bank_count: cartridge.prg_rom().len() / PRG_UNIT_SIZE,
            chr_len: cartridge.chr_rom().len(),
        }
    }

    pub fn bank(&self) -> usize {
        self.bank
    }

    pub fn translate_cpu_address(&self, addr: u16) -> Option<usize> {
        if addr < 0x8000 || self.bank_count == 0 {
            return None;
        }

        let bank = if addr < 0xC000 {
            self.bank
        } else {
            self.bank_count - 1
        };
        Some(bank * PRG_UNIT_SIZE + (addr as usize & 0x3FFF))
    }

    pub fn translate_character_address(&self, addr: u16) -> Option<usize> {
        direct_character_offset(self.chr_len, addr)
    }

    pub fn select_bank(&mut self, value: u8) {
        self.bank = value as usize % self.bank_count.max(1);
    }

    pub fn reset(&mut self) {
        self.bank = 0;
    }
}

/// CNROM (mapper 3): fixed program space, switchable 8 KiB character bank.
#[derive(Debug, Clone)]
pub struct Cnrom {
    prg: Nrom,
    chr_bank: usize,
    chr_bank_count: usize,
}

impl Cnrom {
    pub fn new(cartridge: &Cartridge) -> Cnrom {
        Cnrom {
            prg: Nrom::new(cartridge),
            chr_bank: 0,
            chr_bank_count: cartridge.chr_rom().len() / CHR_UNIT_SIZE,
        }
    }

    pub fn chr_bank(&self) -> usize {
        self.chr_bank
    }

    pub fn translate_cpu_address(&self, addr: u16) -> Option<usize> {
        self.prg.translate_cpu_address(addr)
    }

    pub fn translate_character_address(&self, addr: u16) -> Option<usize> {
        if addr >= 0x2000 || self.chr_bank_count == 0 {
            return None;
        }
        Some(self.chr_bank * CHR_UNIT_SIZE + addr as usize)
    }

    pub fn select_bank(&mut self, value: u8) {
        self.chr_bank = value as usize % self.chr_bank_count.max(1);
    }

    pub fn reset(&mut self) {
        self.chr_bank = 0;
    }
}
