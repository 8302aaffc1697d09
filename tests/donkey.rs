extern crate red;

use red::cpu::Interrupt;
use red::ines::*;
use red::{Config, IllegalOpcodePolicy, System};

#[macro_use]
extern crate slog;
use slog::Drain;

fn test_logger() -> slog::Logger {
    let decorator = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!("test" => "donkey"))
}

/// NROM-128 image with `program` at $8000, `handler` at $9000 as the NMI target
/// and `irq` at $9800 for BRK/IRQ.
fn rom(program: &[u8], nmi: &[u8], irq: &[u8]) -> Vec<u8> {
    let mut contents = MAGIC.to_vec();
    contents.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    let mut prg = vec![0xEA; PRG_UNIT_SIZE];
    prg[..program.len()].copy_from_slice(program);
    prg[0x1000..0x1000 + nmi.len()].copy_from_slice(nmi);
    prg[0x1800..0x1800 + irq.len()].copy_from_slice(irq);
    prg[0x3FFA..].copy_from_slice(&[0x00, 0x90, 0x00, 0x80, 0x00, 0x98]);
    contents.extend_from_slice(&prg);
    contents.resize(contents.len() + CHR_UNIT_SIZE, 0);
    contents
}

#[test]
fn counting_loop_with_subroutine() {
    // $8000: LDX #$05
    // $8002: JSR $8010
    // $8005: DEX
    // $8006: BNE $8002
    // $8008: JMP $8008
    // $8010: INC $10 ; RTS
    let mut program = vec![0xEA; 0x20];
    program[..0x0B].copy_from_slice(&[
        0xA2, 0x05, 0x20, 0x10, 0x80, 0xCA, 0xD0, 0xFA, 0x4C, 0x08, 0x80,
    ]);
    program[0x10..0x13].copy_from_slice(&[0xE6, 0x10, 0x60]);

    let mut system = System::new(test_logger(), Config::default());
    system.load_cartridge(&rom(&program, &[0x40], &[0x40])).unwrap();
    system.reset();

    // LDX + 5 * (JSR, INC, RTS, DEX, BNE)
    let cycles = system.run(1 + 5 * 5).unwrap();
    assert_eq!(system.peek_bus(0x0010), 5);
    assert_eq!(system.cpu().registers().x, 0);
    assert_eq!(system.cpu().get_pc(), 0x8008);
    assert_eq!(system.cpu().registers().s, 0xFD);
    assert_eq!(cycles, 2 + 5 * 19 + 4 * 3 + 2);

    // the spin loop never leaves
    system.run(100).unwrap();
    assert_eq!(system.cpu().get_pc(), 0x8008);
    assert!(!system.is_halted());
}

#[test]
fn nmi_handler_runs_and_returns() {
    // main: JMP $8000 ; NMI: INC $20 ; RTI
    let mut system = System::new(test_logger(), Config::default());
    system
        .load_cartridge(&rom(&[0x4C, 0x00, 0x80], &[0xE6, 0x20, 0x40], &[0x40]))
        .unwrap();
    system.reset();

    system.run(3).unwrap();
    for _ in 0..3 {
        system.request_interrupt(Interrupt::Nmi);
        assert_eq!(system.step(), Ok(7));
        assert_eq!(system.cpu().get_pc(), 0x9000);
        system.run(2).unwrap();
        assert_eq!(system.cpu().get_pc(), 0x8000);
    }
    assert_eq!(system.peek_bus(0x0020), 3);
    assert_eq!(system.cpu().registers().s, 0xFD);
}

#[test]
fn brk_enters_irq_handler() {
    // CLI ; BRK ; (pad) ; LDA #$01 ; JMP here
    // IRQ: LDY #$44 ; RTI
    let mut system = System::new(test_logger(), Config::default());
    system
        .load_cartridge(&rom(
            &[0x58, 0x00, 0xEA, 0xA9, 0x01, 0x4C, 0x05, 0x80],
            &[0x40],
            &[0xA0, 0x44, 0x40],
        ))
        .unwrap();
    system.reset();

    system.run(2).unwrap();
    assert_eq!(system.cpu().get_pc(), 0x9800);
    system.run(3).unwrap();
    assert_eq!(system.cpu().registers().y, 0x44);
    assert_eq!(system.cpu().registers().a, 0x01);
    assert_eq!(system.cpu().get_pc(), 0x8005);
}

#[test]
fn undocumented_nops_need_opting_in() {
    let program = [0x04, 0x10, 0x1A, 0xA9, 0x07];

    let mut strict = System::new(test_logger(), Config::default());
    strict.load_cartridge(&rom(&program, &[0x40], &[0x40])).unwrap();
    strict.reset();
    assert!(strict.run(3).is_err());
    assert!(strict.is_halted());
    assert_eq!(strict.cpu().get_pc(), 0x8000);

    let mut lenient = System::new(
        test_logger(),
        Config {
            illegal_opcodes: IllegalOpcodePolicy::Nop,
        },
    );
    lenient.load_cartridge(&rom(&program, &[0x40], &[0x40])).unwrap();
    lenient.reset();
    assert_eq!(lenient.run(3), Ok(3 + 2 + 2));
    assert_eq!(lenient.cpu().registers().a, 0x07);
}
