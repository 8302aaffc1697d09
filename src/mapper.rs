//! Cartridge mapper dispatch.
//!
//! A [`Mapper`] never owns ROM data. It turns bus addresses into offsets into
//! the [`Cartridge`] buffers and keeps whatever bank registers its board has.
//! New boards are added as a variant here; the bus only sees the translate
//! operations and [`Mapper::write_register`].

use crate::banked_mapper::{Cnrom, Uxrom};
use crate::error::LoadError;
use crate::ines::Cartridge;
use crate::nrom_mapper::Nrom;

#[derive(Debug, Clone)]
pub enum Mapper {
    Nrom(Nrom),
    Uxrom(Uxrom),
    Cnrom(Cnrom),
}

/// Build the mapper matching the cartridge header.
pub fn create_mapper(cartridge: &Cartridge) -> Result<Mapper, LoadError> {
    match cartridge.mapper_number() {
        0 => Ok(Mapper::Nrom(Nrom::new(cartridge))),
        2 => Ok(Mapper::Uxrom(Uxrom::new(cartridge))),
        3 => Ok(Mapper::Cnrom(Cnrom::new(cartridge))),
        n => Err(LoadError::UnsupportedMapper(n)),
    }
}

impl Mapper {
    pub fn number(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
            Mapper::Uxrom(_) => 2,
            Mapper::Cnrom(_) => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mapper::Nrom(_) => "NROM",
            Mapper::Uxrom(_) => "UxROM",
            Mapper::Cnrom(_) => "CNROM",
        }
    }

    /// Offset into program data for a CPU address in $4020-$FFFF, if the board maps it.
    #[inline]
    pub fn translate_cpu_address(&self, addr: u16) -> Option<usize> {
        match self {
            Mapper::Nrom(m) => m.translate_cpu_address(addr),
            Mapper::Uxrom(m) => m.translate_cpu_address(addr),
            Mapper::Cnrom(m) => m.translate_cpu_address(addr),
        }
    }

    /// Offset into character data for a PPU address in $0000-$1FFF.
    #[inline]
    pub fn translate_character_address(&self, addr: u16) -> Option<usize> {
        match self {
            Mapper::Nrom(m) => m.translate_character_address(addr),
            Mapper::Uxrom(m) => m.translate_character_address(addr),
            Mapper::Cnrom(m) => m.translate_character_address(addr),
        }
    }

    /// CPU write into cartridge space. Returns false when the board ignores it.
    pub fn write_register(&mut self, addr: u16, value: u8) -> bool {
        match self {
            Mapper::Nrom(_) => false,
            Mapper::Uxrom(m) if addr >= 0x8000 => {
                m.select_bank(value);
                true
            }
            Mapper::Cnrom(m) if addr >= 0x8000 => {
                m.select_bank(value);
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        match self {
            Mapper::Nrom(_) => {}
            Mapper::Uxrom(m) => m.reset(),
            Mapper::Cnrom(m) => m.reset(),
        }
    }
}
