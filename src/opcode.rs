use std::sync::OnceLock;

use ahash::HashMap;

use crate::error::ScriptError;

/// Operand layout of an instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OperandSize {
    /// No operand bytes follow the opcode.
    None,
    /// Exactly `n` operand bytes follow the opcode.
    Fixed(u8),
    /// A little-endian length of `n` bytes follows the opcode, then that many bytes.
    Prefixed(u8),
}

impl OperandSize {
    pub const fn fixed_len(self) -> usize {
        match self {
            Self::Fixed(n) => n as usize,
            Self::None | Self::Prefixed(_) => 0,
        }
    }

    /// Largest payload that fits the length prefix.
    pub const fn max_prefixed_len(self) -> u64 {
        match self {
            Self::Prefixed(1) => u8::MAX as u64,
            Self::Prefixed(2) => u16::MAX as u64,
            Self::Prefixed(_) => u32::MAX as u64,
            Self::None | Self::Fixed(_) => 0,
        }
    }
}

macro_rules! define_opcodes {
    ($($name:ident = $code:literal, $price:literal $(, $kind:ident($n:literal))?;)+) => {
        /// Neo N3 VM instruction set.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        #[allow(non_camel_case_types)]
        pub enum OpCode {
            $($name = $code),+
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[$(OpCode::$name),+];

            pub const fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name)),+
                }
            }

            /// Base execution price of the instruction in datoshi.
            pub const fn price(self) -> u64 {
                match self {
                    $(Self::$name => $price),+
                }
            }

            pub const fn operand(self) -> OperandSize {
                match self {
                    $(Self::$name => define_opcodes!(@operand $($kind($n))?)),+
                }
            }
        }
    };
    (@operand) => { OperandSize::None };
    (@operand fixed($n:literal)) => { OperandSize::Fixed($n) };
    (@operand prefixed($n:literal)) => { OperandSize::Prefixed($n) };
}

define_opcodes! {
    // Constants
    PUSHINT8 = 0x00, 1, fixed(1);
    PUSHINT16 = 0x01, 1, fixed(2);
    PUSHINT32 = 0x02, 1, fixed(4);
    PUSHINT64 = 0x03, 1, fixed(8);
    PUSHINT128 = 0x04, 4, fixed(16);
    PUSHINT256 = 0x05, 4, fixed(32);
    PUSHT = 0x08, 1;
    PUSHF = 0x09, 1;
    PUSHA = 0x0a, 4, fixed(4);
    PUSHNULL = 0x0b, 1;
    PUSHDATA1 = 0x0c, 8, prefixed(1);
    PUSHDATA2 = 0x0d, 512, prefixed(2);
    PUSHDATA4 = 0x0e, 4096, prefixed(4);
    PUSHM1 = 0x0f, 1;
    PUSH0 = 0x10, 1;
    PUSH1 = 0x11, 1;
    PUSH2 = 0x12, 1;
    PUSH3 = 0x13, 1;
    PUSH4 = 0x14, 1;
    PUSH5 = 0x15, 1;
    PUSH6 = 0x16, 1;
    PUSH7 = 0x17, 1;
    PUSH8 = 0x18, 1;
    PUSH9 = 0x19, 1;
    PUSH10 = 0x1a, 1;
    PUSH11 = 0x1b, 1;
    PUSH12 = 0x1c, 1;
    PUSH13 = 0x1d, 1;
    PUSH14 = 0x1e, 1;
    PUSH15 = 0x1f, 1;
    PUSH16 = 0x20, 1;

    // Flow control
    NOP = 0x21, 1;
    JMP = 0x22, 2, fixed(1);
    JMP_L = 0x23, 2, fixed(4);
    JMPIF = 0x24, 2, fixed(1);
    JMPIF_L = 0x25, 2, fixed(4);
    JMPIFNOT = 0x26, 2, fixed(1);
    JMPIFNOT_L = 0x27, 2, fixed(4);
    JMPEQ = 0x28, 2, fixed(1);
    JMPEQ_L = 0x29, 2, fixed(4);
    JMPNE = 0x2a, 2, fixed(1);
    JMPNE_L = 0x2b, 2, fixed(4);
    JMPGT = 0x2c, 2, fixed(1);
    JMPGT_L = 0x2d, 2, fixed(4);
    JMPGE = 0x2e, 2, fixed(1);
    JMPGE_L = 0x2f, 2, fixed(4);
    JMPLT = 0x30, 2, fixed(1);
    JMPLT_L = 0x31, 2, fixed(4);
    JMPLE = 0x32, 2, fixed(1);
    JMPLE_L = 0x33, 2, fixed(4);
    CALL = 0x34, 512, fixed(1);
    CALL_L = 0x35, 512, fixed(4);
    CALLA = 0x36, 512;
    CALLT = 0x37, 32768, fixed(2);
    ABORT = 0x38, 0;
    ASSERT = 0x39, 1;
    THROW = 0x3a, 512;
    TRY = 0x3b, 4, fixed(2);
    TRY_L = 0x3c, 4, fixed(8);
    ENDTRY = 0x3d, 4, fixed(1);
    ENDTRY_L = 0x3e, 4, fixed(4);
    ENDFINALLY = 0x3f, 4;
    RET = 0x40, 0;
    SYSCALL = 0x41, 0, fixed(4);

    // Stack
    DEPTH = 0x43, 2;
    DROP = 0x45, 2;
    NIP = 0x46, 2;
    XDROP = 0x48, 16;
    CLEAR = 0x49, 16;
    DUP = 0x4a, 2;
    OVER = 0x4b, 2;
    PICK = 0x4d, 2;
    TUCK = 0x4e, 2;
    SWAP = 0x50, 2;
    ROT = 0x51, 2;
    ROLL = 0x52, 16;
    REVERSE3 = 0x53, 2;
    REVERSE4 = 0x54, 2;
    REVERSEN = 0x55, 16;

    // Slot
    INITSSLOT = 0x56, 16, fixed(1);
    INITSLOT = 0x57, 64, fixed(2);
    LDSFLD0 = 0x58, 2;
    LDSFLD1 = 0x59, 2;
    LDSFLD2 = 0x5a, 2;
    LDSFLD3 = 0x5b, 2;
    LDSFLD4 = 0x5c, 2;
    LDSFLD5 = 0x5d, 2;
    LDSFLD6 = 0x5e, 2;
    LDSFLD = 0x5f, 2, fixed(1);
    STSFLD0 = 0x60, 2;
    STSFLD1 = 0x61, 2;
    STSFLD2 = 0x62, 2;
    STSFLD3 = 0x63, 2;
    STSFLD4 = 0x64, 2;
    STSFLD5 = 0x65, 2;
    STSFLD6 = 0x66, 2;
    STSFLD = 0x67, 2, fixed(1);
    LDLOC0 = 0x68, 2;
    LDLOC1 = 0x69, 2;
    LDLOC2 = 0x6a, 2;
    LDLOC3 = 0x6b, 2;
    LDLOC4 = 0x6c, 2;
    LDLOC5 = 0x6d, 2;
    LDLOC6 = 0x6e, 2;
    LDLOC = 0x6f, 2, fixed(1);
    STLOC0 = 0x70, 2;
    STLOC1 = 0x71, 2;
    STLOC2 = 0x72, 2;
    STLOC3 = 0x73, 2;
    STLOC4 = 0x74, 2;
    STLOC5 = 0x75, 2;
    STLOC6 = 0x76, 2;
    STLOC = 0x77, 2, fixed(1);
    LDARG0 = 0x78, 2;
    LDARG1 = 0x79, 2;
    LDARG2 = 0x7a, 2;
    LDARG3 = 0x7b, 2;
    LDARG4 = 0x7c, 2;
    LDARG5 = 0x7d, 2;
    LDARG6 = 0x7e, 2;
    LDARG = 0x7f, 2, fixed(1);
    STARG0 = 0x80, 2;
    STARG1 = 0x81, 2;
    STARG2 = 0x82, 2;
    STARG3 = 0x83, 2;
    STARG4 = 0x84, 2;
    STARG5 = 0x85, 2;
    STARG6 = 0x86, 2;
    STARG = 0x87, 2, fixed(1);

    // Splice
    NEWBUFFER = 0x88, 256;
    MEMCPY = 0x89, 2048;
    CAT = 0x8b, 2048;
    SUBSTR = 0x8c, 2048;
    LEFT = 0x8d, 2048;
    RIGHT = 0x8e, 2048;

    // Bitwise logic
    INVERT = 0x90, 4;
    AND = 0x91, 8;
    OR = 0x92, 8;
    XOR = 0x93, 8;
    EQUAL = 0x97, 32;
    NOTEQUAL = 0x98, 32;

    // Arithmetic
    SIGN = 0x99, 4;
    ABS = 0x9a, 4;
    NEGATE = 0x9b, 4;
    INC = 0x9c, 4;
    DEC = 0x9d, 4;
    ADD = 0x9e, 8;
    SUB = 0x9f, 8;
    MUL = 0xa0, 8;
    DIV = 0xa1, 8;
    MOD = 0xa2, 8;
    POW = 0xa3, 64;
    SQRT = 0xa4, 64;
    MODMUL = 0xa5, 32;
    MODPOW = 0xa6, 2048;
    SHL = 0xa8, 8;
    SHR = 0xa9, 8;
    NOT = 0xaa, 4;
    BOOLAND = 0xab, 8;
    BOOLOR = 0xac, 8;
    NZ = 0xb1, 4;
    NUMEQUAL = 0xb3, 8;
    NUMNOTEQUAL = 0xb4, 8;
    LT = 0xb5, 8;
    LE = 0xb6, 8;
    GT = 0xb7, 8;
    GE = 0xb8, 8;
    MIN = 0xb9, 8;
    MAX = 0xba, 8;
    WITHIN = 0xbb, 8;

    // Compound types
    PACKMAP = 0xbe, 2048;
    PACKSTRUCT = 0xbf, 2048;
    PACK = 0xc0, 2048;
    UNPACK = 0xc1, 2048;
    NEWARRAY0 = 0xc2, 16;
    NEWARRAY = 0xc3, 512;
    NEWARRAY_T = 0xc4, 512, fixed(1);
    NEWSTRUCT0 = 0xc5, 16;
    NEWSTRUCT = 0xc6, 512;
    NEWMAP = 0xc8, 8;
    SIZE = 0xca, 4;
    HASKEY = 0xcb, 64;
    KEYS = 0xcc, 16;
    VALUES = 0xcd, 8192;
    PICKITEM = 0xce, 64;
    APPEND = 0xcf, 8192;
    SETITEM = 0xd0, 8192;
    REVERSEITEMS = 0xd1, 8192;
    REMOVE = 0xd2, 16;
    CLEARITEMS = 0xd3, 16;
    POPITEM = 0xd4, 16;

    // Types
    ISNULL = 0xd8, 2;
    ISTYPE = 0xd9, 2, fixed(1);
    CONVERT = 0xdb, 8192, fixed(1);

    // Extensions
    ABORTMSG = 0xe0, 0;
    ASSERTMSG = 0xe1, 1;
}

impl OpCode {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Resolves a raw byte, failing on bytes outside the instruction set.
    pub fn decode(byte: u8) -> Result<Self, ScriptError> {
        Self::from_u8(byte).ok_or(ScriptError::UnsupportedOpcode(byte))
    }

    /// Looks up an opcode by its mnemonic.
    pub fn from_name(name: &str) -> Option<Self> {
        static NAMES: OnceLock<HashMap<&'static str, OpCode>> = OnceLock::new();
        NAMES
            .get_or_init(|| Self::ALL.iter().map(|op| (op.name(), *op)).collect())
            .get(name)
            .copied()
    }

    /// Small integer value pushed by `PUSHM1` and `PUSH0..PUSH16`.
    pub const fn small_int(self) -> Option<i8> {
        let code = self as u8;
        if code >= OpCode::PUSHM1 as u8 && code <= OpCode::PUSH16 as u8 {
            Some((code as i16 - OpCode::PUSH0 as u8 as i16) as i8)
        } else {
            None
        }
    }

    /// Whether the fixed operand is a signed integer (pushes and jump offsets).
    pub const fn has_signed_operand(self) -> bool {
        matches!(
            self,
            Self::PUSHINT8
                | Self::PUSHINT16
                | Self::PUSHINT32
                | Self::PUSHINT64
                | Self::PUSHINT128
                | Self::PUSHINT256
                | Self::PUSHA
                | Self::CALL
                | Self::CALL_L
                | Self::TRY
                | Self::TRY_L
                | Self::ENDTRY
                | Self::ENDTRY_L
        ) || (self as u8 >= Self::JMP as u8 && self as u8 <= Self::JMPLE_L as u8)
    }

    /// Opcode which pushes the specified small integer, if any.
    pub const fn for_small_int(value: i64) -> Option<Self> {
        if value >= -1 && value <= 16 {
            Self::from_u8((OpCode::PUSH0 as u8 as i64 + value) as u8)
        } else {
            None
        }
    }
}

impl std::fmt::Display for OpCode {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ScriptError;

    #[inline]
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::decode(byte)
    }
}

impl From<OpCode> for u8 {
    #[inline]
    fn from(value: OpCode) -> Self {
        value as u8
    }
}

impl std::str::FromStr for OpCode {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ScriptError::UnknownMnemonic(s.into()))
    }
}
