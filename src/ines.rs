use std::convert::TryInto;
use std::fs::read;
use std::path::Path;

use crate::error::LoadError;

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_UNIT_SIZE: usize = 16 * 1024;
pub const CHR_UNIT_SIZE: usize = 8 * 1024;
pub const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

/// Nametable arrangement declared by the header. Consumed by the video side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Immutable contents of an iNES image.
///
/// Owns the program and character data for the whole session; mappers only
/// compute offsets into these buffers.
#[derive(Debug)]
pub struct Cartridge {
    header: INesHeader,
    trainer: Option<Vec<u8>>,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
}

/// Parse an iNES image held in memory.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge, LoadError> {
    Cartridge::from_bytes(bytes)
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Cartridge, LoadError> {
        let contents = read(path)?;

        Cartridge::from_bytes(&contents)
    }

    pub fn from_bytes(contents: &[u8]) -> Result<Cartridge, LoadError> {
        let header = INesHeader::from_bytes(contents)?;
        let expected = header.image_size_bytes();
        if contents.len() < expected {
            return Err(LoadError::TruncatedData {
                expected,
                actual: contents.len(),
            });
        }

        let mut ptr = HEADER_SIZE;

        let trainer = if header.has_trainer() {
            let trainer = contents[ptr..ptr + TRAINER_SIZE].to_vec();
            ptr += TRAINER_SIZE;
            Some(trainer)
        } else {
            None
        };

        let prg_rom: Vec<u8> = contents[ptr..ptr + header.prg_rom_size_bytes()].to_vec();
        ptr += header.prg_rom_size_bytes();

        let chr_rom: Vec<u8> = contents[ptr..ptr + header.chr_rom_size_bytes()].to_vec();

        Ok(Cartridge {
            header,
            trainer,
            prg_rom,
            chr_rom,
        })
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    pub fn mapper_number(&self) -> u8 {
        self.header.mapper_number()
    }

    pub fn prg_rom_size_bytes(&self) -> usize {
        self.header.prg_rom_size_bytes()
    }

    pub fn chr_rom_size_bytes(&self) -> usize {
        self.header.chr_rom_size_bytes()
    }

    /// A cartridge without character ROM relies on console-provided character RAM.
    pub fn character_is_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring()
    }

    pub fn has_persistent_memory(&self) -> bool {
        self.header.has_persistent_memory()
    }

    pub fn is_ines_2(&self) -> bool {
        self.header.is_ines_2()
    }

    pub fn prg_ram_size_bytes(&self) -> usize {
        self.header.prg_ram_size_bytes()
    }

    pub fn ntsc(&self) -> bool {
        self.header.ntsc()
    }
}

#[derive(Debug, Clone)]
struct INesHeader {
    prg_size: u8,
    chr_size: u8,
    flags_6: u8,
    flags_7: u8,
    flags_8: u8,
    flags_9: u8,
}

impl INesHeader {
    fn from_bytes(input: &[u8]) -> Result<INesHeader, LoadError> {
        let tag_len = input.len().min(MAGIC.len());
        if input[..tag_len] != MAGIC[..tag_len] {
            return Err(LoadError::InvalidFormat);
        }
        if input.len() < HEADER_SIZE {
            return Err(LoadError::TruncatedData {
                expected: HEADER_SIZE,
                actual: input.len(),
            });
        }

        let header: &[u8; HEADER_SIZE] = input[..HEADER_SIZE]
            .try_into()
            .map_err(|_| LoadError::InvalidFormat)?;

        Ok(INesHeader {
            prg_size: header[4],
            chr_size: header[5],
            flags_6: header[6],
            flags_7: header[7],
            flags_8: header[8],
            flags_9: header[9],
        })
    }

    fn prg_rom_size_bytes(&self) -> usize {
        self.prg_size as usize * PRG_UNIT_SIZE
    }

    fn chr_rom_size_bytes(&self) -> usize {
        self.chr_size as usize * CHR_UNIT_SIZE
    }

    /// Header, optional trainer and both ROM blocks.
    fn image_size_bytes(&self) -> usize {
        let trainer = if self.has_trainer() { TRAINER_SIZE } else { 0 };
        HEADER_SIZE + trainer + self.prg_rom_size_bytes() + self.chr_rom_size_bytes()
    }

    fn mirroring(&self) -> Mirroring {
        if self.four_screen_vram() {
            Mirroring::FourScreen
        } else if (self.flags_6 & 1) != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    fn has_persistent_memory(&self) -> bool {
        (self.flags_6 & 2) != 0
    }

    fn has_trainer(&self) -> bool {
        (self.flags_6 & 4) != 0
    }

    fn four_screen_vram(&self) -> bool {
        (self.flags_6 & 8) != 0
    }

    fn is_ines_2(&self) -> bool {
        (self.flags_7 & 0xC) == 0x8
    }

    /// Low nibble from byte 6, high nibble from byte 7. Bytes 8..16 never take part.
    fn mapper_number(&self) -> u8 {
        (self.flags_6 >> 4) | (self.flags_7 & 0xF0)
    }

    fn prg_ram_size_bytes(&self) -> usize {
        if self.flags_8 == 0 {
            8 * 1024
        } else {
            self.flags_8 as usize * 8 * 1024
        }
    }

    // TODO support the iNES 2.0 timing byte (12) as well
    fn ntsc(&self) -> bool {
        (self.flags_9 & 1) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_units: u8, chr_units: u8, flags_6: u8, flags_7: u8) -> Vec<u8> {
        let mut rom = MAGIC.to_vec();
        rom.extend_from_slice(&[prg_units, chr_units, flags_6, flags_7]);
        rom.extend_from_slice(&[0u8; 8]);
        if flags_6 & 4 != 0 {
            rom.extend(std::iter::repeat(0xEE).take(TRAINER_SIZE));
        }
        rom.extend(std::iter::repeat(0xAA).take(prg_units as usize * PRG_UNIT_SIZE));
        rom.extend(std::iter::repeat(0xCC).take(chr_units as usize * CHR_UNIT_SIZE));
        rom
    }

    #[test]
    fn parses_sizes_and_data() {
        let cart = load_cartridge(&image(2, 1, 0, 0)).unwrap();
        assert_eq!(cart.prg_rom().len(), 2 * PRG_UNIT_SIZE);
        assert_eq!(cart.chr_rom().len(), CHR_UNIT_SIZE);
        assert!(cart.prg_rom().iter().all(|&b| b == 0xAA));
        assert!(cart.chr_rom().iter().all(|&b| b == 0xCC));
        assert_eq!(cart.mapper_number(), 0);
        assert!(!cart.character_is_ram());
    }

    #[test]
    fn zero_chr_units_means_character_ram() {
        let cart = load_cartridge(&image(1, 0, 0, 0)).unwrap();
        assert!(cart.chr_rom().is_empty());
        assert!(cart.character_is_ram());
    }

    #[test]
    fn bad_magic_is_invalid_format() {
        let mut rom = image(1, 1, 0, 0);
        rom[3] = 0x00;
        assert!(matches!(load_cartridge(&rom), Err(LoadError::InvalidFormat)));
        assert!(matches!(load_cartridge(b"ZIP"), Err(LoadError::InvalidFormat)));
    }

    #[test]
    fn short_header_is_truncated() {
        let err = load_cartridge(&MAGIC).unwrap_err();
        assert!(matches!(
            err,
            LoadError::TruncatedData {
                expected: HEADER_SIZE,
                actual: 4
            }
        ));
    }

    #[test]
    fn missing_bytes_are_truncated() {
        let mut rom = image(1, 1, 0, 0);
        rom.pop();
        match load_cartridge(&rom) {
            Err(LoadError::TruncatedData { expected, actual }) => {
                assert_eq!(expected, HEADER_SIZE + PRG_UNIT_SIZE + CHR_UNIT_SIZE);
                assert_eq!(actual, expected - 1);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn trainer_is_skipped_and_kept() {
        let rom = image(1, 1, 0b0000_0100, 0);
        let cart = load_cartridge(&rom).unwrap();
        assert_eq!(cart.trainer().map(|t| t.len()), Some(TRAINER_SIZE));
        assert_eq!(cart.prg_rom()[0], 0xAA);

        let mut short = rom;
        short.truncate(short.len() - CHR_UNIT_SIZE);
        assert!(matches!(
            load_cartridge(&short),
            Err(LoadError::TruncatedData { .. })
        ));
    }

    #[test]
    fn flag_bits() {
        let cart = load_cartridge(&image(1, 1, 0x31, 0x40)).unwrap();
        assert_eq!(cart.mapper_number(), 0x43);
        assert_eq!(cart.mirroring(), Mirroring::Vertical);
        assert!(!cart.has_persistent_memory());

        let cart = load_cartridge(&image(1, 1, 0x0A, 0x00)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::FourScreen);
        assert!(cart.has_persistent_memory());

        let cart = load_cartridge(&image(1, 1, 0x00, 0x08)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::Horizontal);
        assert!(cart.is_ines_2());
        assert_eq!(cart.prg_ram_size_bytes(), 8 * 1024);
    }

    #[test]
    fn padding_bytes_do_not_change_mapper_number() {
        let mut rom = image(1, 1, 0x20, 0x40);
        rom[11] = 1;
        rom[12] = b'D';
        rom[13] = b'k';
        let cart = load_cartridge(&rom).unwrap();
        assert_eq!(cart.mapper_number(), 0x42);

        let mut rom = image(1, 1, 0x00, 0x10);
        rom[11] = 1;
        rom[12] = 1;
        let cart = load_cartridge(&rom).unwrap();
        assert_eq!(cart.mapper_number(), 0x10);
    }
}
