use crate::ines::{Cartridge, CHR_UNIT_SIZE, PRG_UNIT_SIZE};

/// NROM (mapper 0): no bank switching.
///
/// Program data sits at $8000-$FFFF, either one 16 KiB unit mirrored into both
/// halves (NROM-128) or two units laid out directly (NROM-256). Character data
/// is a single 8 KiB block at PPU $0000-$1FFF.
#[derive(Debug, Clone)]
pub struct Nrom {
    prg_len: usize,
    chr_len: usize,
}

impl Nrom {
    pub fn new(cartridge: &Cartridge) -> Nrom {
        Nrom {
            prg_len: cartridge.prg_rom().len(),
            chr_len: cartridge.chr_rom().len(),
        }
    }

    pub fn is_nrom_128(&self) -> bool {
        self.prg_len == PRG_UNIT_SIZE
    }

    pub fn translate_cpu_address(&self, addr: u16) -> Option<usize> {
        if addr < 0x8000 || self.prg_len == 0 {
            return None;
        }

        let offset = (addr - 0x8000) as usize;
        if self.is_nrom_128() {
            Some(offset % PRG_UNIT_SIZE)
        } else {
            Some(offset % self.prg_len)
        }
    }

    pub fn translate_character_address(&self, addr: u16) -> Option<usize> {
        direct_character_offset(self.chr_len, addr)
    }
}

/// Character offset for boards that expose one fixed 8 KiB window.
pub(crate) fn direct_character_offset(chr_len: usize, addr: u16) -> Option<usize> {
    if addr >= 0x2000 || chr_len == 0 {
        return None;
    }
    Some(addr as usize % chr_len.min(CHR_UNIT_SIZE))
}
