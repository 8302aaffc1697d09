use std::fs::read;
use std::process;

use gumdrop::Options;
use slog::{error, info, o, Drain, Level, Logger};

use red::ines::{HEADER_SIZE, PRG_UNIT_SIZE, TRAINER_SIZE};
use red::{Config, IllegalOpcodePolicy, System};

#[derive(Debug, Options)]
struct RedOptions {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, required, help = "the name of the ROM to execute")]
    rom_path: String,

    #[options(short = "n", help = "maximum number of instructions to run", default = "100000")]
    steps: u64,

    #[options(help = "log a trace line for every instruction")]
    trace: bool,

    #[options(no_short, help = "execute undocumented NOPs instead of halting")]
    illegal_nop: bool,

    #[options(
        no_short,
        help = "start address in hex, patched into the reset vector",
        parse(try_from_str = "parse_hex")
    )]
    start: Option<u16>,

    #[options(help = "log mapper and interrupt activity")]
    verbose: bool,
}

fn parse_hex(s: &str) -> Result<u16, std::num::ParseIntError> {
    let digits = s
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('$');
    u16::from_str_radix(digits, 16)
}

fn build_logger(opts: &RedOptions) -> Logger {
    let level = if opts.trace {
        Level::Trace
    } else if opts.verbose {
        Level::Debug
    } else {
        Level::Info
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level).fuse();
    Logger::root(drain, o!())
}

/// Overwrite the reset vector of the last program bank so execution starts at `start`.
fn patch_reset_vector(contents: &mut [u8], start: u16) {
    if contents.len() < HEADER_SIZE {
        return;
    }
    let prg_len = contents[4] as usize * PRG_UNIT_SIZE;
    let trainer = if contents[6] & 0x04 != 0 {
        TRAINER_SIZE
    } else {
        0
    };
    let vector = HEADER_SIZE + trainer + prg_len;
    if prg_len == 0 || vector > contents.len() {
        return;
    }
    contents[vector - 4] = start as u8;
    contents[vector - 3] = (start >> 8) as u8;
}

fn main() {
    let opts = RedOptions::parse_args_default_or_exit();
    let log = build_logger(&opts);

    let code = match run(&opts, &log) {
        Ok(()) => 0,
        Err(message) => {
            error!(log, "{}", message);
            1
        }
    };

    // the async drain flushes when the last logger handle goes away
    drop(log);
    process::exit(code);
}

fn run(opts: &RedOptions, log: &Logger) -> Result<(), String> {
    let mut contents =
        read(&opts.rom_path).map_err(|e| format!("could not read {}: {}", opts.rom_path, e))?;

    if let Some(start) = opts.start {
        patch_reset_vector(&mut contents, start);
    }

    let config = Config {
        illegal_opcodes: if opts.illegal_nop {
            IllegalOpcodePolicy::Nop
        } else {
            IllegalOpcodePolicy::Halt
        },
    };

    let mut system = System::new(log.clone(), config);
    system
        .load_cartridge(&contents)
        .map_err(|e| format!("could not load {}: {}", opts.rom_path, e))?;
    system.reset();

    let result = system.run(opts.steps);

    let regs = system.cpu().registers();
    info!(log, "finished";
          "cycles" => system.cpu().total_cycles(),
          "pc" => format!("{:#06X}", regs.pc),
          "a" => format!("{:#04X}", regs.a),
          "x" => format!("{:#04X}", regs.x),
          "y" => format!("{:#04X}", regs.y),
          "p" => format!("{:#04X}", regs.p.bits()),
          "s" => format!("{:#04X}", regs.s));

    result.map(|_| ()).map_err(|e| e.to_string())
}
