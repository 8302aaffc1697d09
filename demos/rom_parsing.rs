use gumdrop::Options;
use red::ines::*;

#[derive(Debug, Options)]
struct RedOptions {
    #[options(help = "the name of the ROM to inspect")]
    #[options(free)]
    rom_path: String
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = RedOptions::parse_args_default_or_exit();

    println!("opening rom {}", opts.rom_path);

    let rom = Cartridge::from_file(&opts.rom_path)?;

    println!("mapper:        {}", rom.mapper_number());
    println!("program rom:   {} bytes", rom.prg_rom_size_bytes());
    if rom.character_is_ram() {
        println!("character:     8192 bytes of RAM");
    } else {
        println!("character rom: {} bytes", rom.chr_rom_size_bytes());
    }
    println!("program ram:   {} bytes", rom.prg_ram_size_bytes());
    println!("mirroring:     {:?}", rom.mirroring());
    println!("battery:       {}", rom.has_persistent_memory());
    println!("trainer:       {}", rom.trainer().is_some());
    println!("iNES 2.0:      {}", rom.is_ines_2());
    println!("tv system:     {}", if rom.ntsc() { "NTSC" } else { "PAL" });
    Ok(())
}
