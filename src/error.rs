use thiserror::Error;

/// Reasons a ROM image can be rejected by [`crate::ines::load_cartridge`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing iNES magic tag")]
    InvalidFormat,

    #[error("ROM image truncated: need {expected} bytes, have {actual}")]
    TruncatedData { expected: usize, actual: usize },

    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),

    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while executing instructions. Any of these leaves the CPU halted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unimplemented opcode {opcode:#04X} at {pc:#06X}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}
