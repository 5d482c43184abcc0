/// Broad category of a [`ScriptError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed hex, wrong operand length or truncated stream.
    Format,
    /// Byte is not an instruction of the VM.
    UnsupportedOpcode,
    /// Service code is unknown or not the one expected.
    UnknownService,
    /// Value exceeds the largest applicable push or length scheme.
    EncodingOverflow,
    /// Script does not follow the expected call layout.
    StructuralMismatch,
    /// Argument has a wrong shape or is missing a required value.
    InvalidArgument,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("unexpected end of script at offset {offset}: {expected} more bytes expected")]
    UnexpectedEnd { offset: usize, expected: u64 },
    #[error("operand of `{opcode}` must be exactly {expected} bytes, got {actual}")]
    InvalidOperandLength {
        opcode: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("`{0}` does not push an integer")]
    NotAnInteger(&'static str),
    #[error("unsupported opcode: 0x{0:02x}")]
    UnsupportedOpcode(u8),
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(Box<str>),
    #[error("unknown interop service: {0}")]
    UnknownService(Box<str>),
    #[error("storage item size is required to price `{0}`")]
    MissingServiceParam(&'static str),
    #[error("integer {0} does not fit into 32 bytes")]
    IntegerOverflow(Box<str>),
    #[error("data of {len} bytes does not fit `{opcode}`")]
    DataOverflow { opcode: &'static str, len: usize },
    #[error("structural mismatch: {0}")]
    StructuralMismatch(&'static str),
    #[error("unexpected instruction `{0}` in a contract call")]
    UnexpectedInstruction(&'static str),
    #[error("script is not a multisig verification script")]
    NotMultisig,
    #[error("expected {expected} bytes for {what}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid integer: {0}")]
    InvalidInteger(Box<str>),
    #[error("invalid argument: {0}")]
    InvalidArgument(Box<str>),
    #[error("unsupported argument type: {0}")]
    UnsupportedArgument(&'static str),
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHex(_)
            | Self::UnexpectedEnd { .. }
            | Self::InvalidOperandLength { .. }
            | Self::NotAnInteger(_) => ErrorKind::Format,
            Self::UnsupportedOpcode(_) | Self::UnknownMnemonic(_) => ErrorKind::UnsupportedOpcode,
            Self::UnknownService(_) | Self::MissingServiceParam(_) => ErrorKind::UnknownService,
            Self::IntegerOverflow(_) | Self::DataOverflow { .. } => ErrorKind::EncodingOverflow,
            Self::StructuralMismatch(_) | Self::UnexpectedInstruction(_) | Self::NotMultisig => {
                ErrorKind::StructuralMismatch
            }
            Self::InvalidLength { .. }
            | Self::InvalidInteger(_)
            | Self::InvalidArgument(_)
            | Self::UnsupportedArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}
