use gumdrop::Options;
use red::bus::{Bus, Memory};
use red::ines::*;

#[derive(Debug, Options)]
struct RedOptions {
    #[options(help = "the name of the ROM to map")]
    #[options(free)]
    rom_path: String
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = RedOptions::parse_args_default_or_exit();

    println!("opening rom {}", opts.rom_path);

    let rom = Cartridge::from_file(&opts.rom_path)?;
    let mut bus = Bus::new(None);
    bus.insert_cartridge(rom)?;

    if let Some(mapper) = bus.mapper() {
        println!("mapper: {} ({})", mapper.name(), mapper.number());
    }

    println!("reset vector: {:#X}", bus.read_u16(0xFFFC));
    println!("nmi vector:   {:#X}", bus.read_u16(0xFFFA));
    println!("irq vector:   {:#X}", bus.read_u16(0xFFFE));
    Ok(())
}
