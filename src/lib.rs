#[macro_use]
extern crate slog;

pub mod error;
pub mod ines;
pub mod mapper;
pub mod nrom_mapper;
pub mod banked_mapper;
pub mod bus;
pub mod opcodes;
pub mod cpu;
pub mod system;

pub use crate::bus::{Bus, IoPort, Memory};
pub use crate::cpu::{CpuState, Interrupt, Registers, Status, CPU};
pub use crate::error::{CpuError, LoadError};
pub use crate::ines::{load_cartridge, Cartridge, Mirroring};
pub use crate::mapper::{create_mapper, Mapper};
pub use crate::system::{Config, IllegalOpcodePolicy, System};
