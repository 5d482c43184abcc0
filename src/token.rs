use std::fmt;

use num_bigint::BigInt;

use crate::error::ScriptError;
use crate::opcode::{OpCode, OperandSize};
use crate::util::{decode_hex, encode_int};

/// Default mnemonic column width used by [`OpToken::pretty_print`].
pub const DEFAULT_PADDING: usize = 12;

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpToken {
    pub code: OpCode,
    /// Operand bytes without the length prefix.
    pub operand: Option<Vec<u8>>,
}

impl OpToken {
    pub fn new(code: OpCode, operand: Option<Vec<u8>>) -> Self {
        Self { code, operand }
    }

    pub fn simple(code: OpCode) -> Self {
        Self {
            code,
            operand: None,
        }
    }

    /// Splits a hex encoded script into instructions.
    pub fn from_hex(script: &str) -> Result<Vec<Self>, ScriptError> {
        Self::from_script(&decode_hex(script)?)
    }

    /// Splits a script into instructions.
    pub fn from_script(script: &[u8]) -> Result<Vec<Self>, ScriptError> {
        let mut reader = TokenReader::new(script);
        let mut tokens = Vec::new();
        while let Some(token) = reader.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Canonical push of an integer.
    pub fn for_integer<T: Into<BigInt>>(value: T) -> Result<Self, ScriptError> {
        let (code, operand) = encode_int(&value.into())?;
        Ok(Self { code, operand })
    }

    /// Integer pushed by this instruction.
    pub fn parse_int(&self) -> Result<BigInt, ScriptError> {
        if let Some(value) = self.code.small_int() {
            return Ok(BigInt::from(value));
        }

        match (self.code, &self.operand) {
            (
                OpCode::PUSHINT8
                | OpCode::PUSHINT16
                | OpCode::PUSHINT32
                | OpCode::PUSHINT64
                | OpCode::PUSHINT128
                | OpCode::PUSHINT256,
                Some(operand),
            ) => {
                self.check_fixed_operand(operand)?;
                Ok(BigInt::from_signed_bytes_le(operand))
            }
            _ => Err(ScriptError::NotAnInteger(self.code.name())),
        }
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        let operand_len = self.operand.as_ref().map(Vec::len).unwrap_or_default();
        match self.code.operand() {
            OperandSize::None => 1,
            OperandSize::Fixed(n) => 1 + n as usize,
            OperandSize::Prefixed(n) => 1 + n as usize + operand_len,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ScriptError> {
        let mut result = Vec::with_capacity(self.size());
        self.write_to(&mut result)?;
        Ok(result)
    }

    pub fn to_hex(&self) -> Result<String, ScriptError> {
        self.to_bytes().map(hex::encode)
    }

    /// Appends the serialized instruction, validating the operand first.
    pub fn write_to(&self, target: &mut Vec<u8>) -> Result<(), ScriptError> {
        let empty = Vec::new();
        let operand = self.operand.as_ref().unwrap_or(&empty);

        match self.code.operand() {
            OperandSize::None => {
                if !operand.is_empty() {
                    return Err(self.invalid_length(0, operand.len()));
                }
                target.push(self.code.to_u8());
            }
            OperandSize::Fixed(_) => {
                self.check_fixed_operand(operand)?;
                target.push(self.code.to_u8());
                target.extend_from_slice(operand);
            }
            size @ OperandSize::Prefixed(prefix) => {
                if operand.len() as u64 > size.max_prefixed_len() {
                    return Err(ScriptError::DataOverflow {
                        opcode: self.code.name(),
                        len: operand.len(),
                    });
                }
                target.push(self.code.to_u8());
                let len = (operand.len() as u32).to_le_bytes();
                target.extend_from_slice(&len[..prefix as usize]);
                target.extend_from_slice(operand);
            }
        }
        Ok(())
    }

    /// Renders the mnemonic and the operand in hex.
    pub fn pretty_print(&self, padding: usize) -> String {
        match &self.operand {
            Some(operand) => format!(
                "{:<padding$} {}",
                self.code.name(),
                hex::encode(operand),
                padding = padding
            ),
            None => self.code.name().to_owned(),
        }
    }

    fn check_fixed_operand(&self, operand: &[u8]) -> Result<(), ScriptError> {
        let expected = self.code.operand().fixed_len();
        if operand.len() != expected {
            return Err(self.invalid_length(expected, operand.len()));
        }
        Ok(())
    }

    fn invalid_length(&self, expected: usize, actual: usize) -> ScriptError {
        ScriptError::InvalidOperandLength {
            opcode: self.code.name(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for OpToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print(DEFAULT_PADDING))
    }
}

/// Serializes a sequence of instructions into a script.
pub fn tokens_to_script<'a, I>(tokens: I) -> Result<Vec<u8>, ScriptError>
where
    I: IntoIterator<Item = &'a OpToken>,
{
    let mut script = Vec::new();
    for token in tokens {
        token.write_to(&mut script)?;
    }
    Ok(script)
}

/// Cursor over a script which yields instructions with their offsets.
pub struct TokenReader<'a> {
    script: &'a [u8],
    offset: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self { script, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.script.len()
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn next_token(&mut self) -> Result<Option<OpToken>, ScriptError> {
        let Some(&byte) = self.script.get(self.offset) else {
            return Ok(None);
        };
        let code = OpCode::decode(byte)?;
        self.offset += 1;

        let operand = match code.operand() {
            OperandSize::None => None,
            OperandSize::Fixed(n) => Some(self.read(n as usize)?.to_vec()),
            OperandSize::Prefixed(n) => {
                let prefix = self.read(n as usize)?;
                let mut len = [0u8; 4];
                len[..prefix.len()].copy_from_slice(prefix);
                let len = u32::from_le_bytes(len) as usize;
                Some(self.read(len)?.to_vec())
            }
        };

        Ok(Some(OpToken { code, operand }))
    }

    fn read(&mut self, len: usize) -> Result<&'a [u8], ScriptError> {
        let script = self.script;
        let end = self.offset.checked_add(len);
        match end.and_then(|end| script.get(self.offset..end)) {
            Some(bytes) => {
                self.offset += len;
                Ok(bytes)
            }
            None => Err(ScriptError::UnexpectedEnd {
                offset: self.offset,
                expected: (len - (script.len() - self.offset)) as u64,
            }),
        }
    }
}

impl Iterator for TokenReader<'_> {
    type Item = Result<OpToken, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_flow_script() -> anyhow::Result<()> {
        let tokens = OpToken::from_hex("212203381140")?;
        assert_eq!(
            tokens,
            vec![
                OpToken::simple(OpCode::NOP),
                OpToken::new(OpCode::JMP, Some(vec![0x03])),
                OpToken::simple(OpCode::ABORT),
                OpToken::simple(OpCode::PUSH1),
                OpToken::simple(OpCode::RET),
            ]
        );
        Ok(())
    }

    #[test]
    fn tokenize_operands() -> anyhow::Result<()> {
        assert_eq!(
            OpToken::from_hex("4101020304")?,
            vec![OpToken::new(OpCode::SYSCALL, Some(vec![1, 2, 3, 4]))]
        );
        assert_eq!(
            OpToken::from_hex("12c421")?,
            vec![
                OpToken::simple(OpCode::PUSH2),
                OpToken::new(OpCode::NEWARRAY_T, Some(vec![0x21])),
            ]
        );
        assert_eq!(
            OpToken::from_hex("0d0300aabbcc")?,
            vec![OpToken::new(OpCode::PUSHDATA2, Some(vec![0xaa, 0xbb, 0xcc]))]
        );
        Ok(())
    }

    #[test]
    fn tokenize_errors() {
        assert!(matches!(
            OpToken::from_hex("41010203"),
            Err(ScriptError::UnexpectedEnd {
                offset: 1,
                expected: 1
            })
        ));
        assert!(matches!(
            OpToken::from_hex("0c05aabb"),
            Err(ScriptError::UnexpectedEnd { offset: 2, .. })
        ));
        assert!(matches!(
            OpToken::from_hex("0d01"),
            Err(ScriptError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            OpToken::from_hex("2106"),
            Err(ScriptError::UnsupportedOpcode(0x06))
        ));
        assert!(matches!(
            OpToken::from_hex("zz"),
            Err(ScriptError::InvalidHex(_))
        ));
    }

    #[test]
    fn serialize() -> anyhow::Result<()> {
        let token = OpToken::new(OpCode::PUSHDATA1, Some(vec![0x12, 0x34]));
        assert_eq!(token.to_hex()?, "0c021234");

        let token = OpToken::new(OpCode::SYSCALL, Some(hex::decode("627d5b52")?));
        assert_eq!(token.to_hex()?, "41627d5b52");

        let bad = OpToken::new(OpCode::SYSCALL, Some(vec![1, 2, 3]));
        assert!(matches!(
            bad.to_bytes(),
            Err(ScriptError::InvalidOperandLength {
                expected: 4,
                actual: 3,
                ..
            })
        ));

        let missing = OpToken::simple(OpCode::JMP);
        assert!(missing.to_bytes().is_err());

        let too_long = OpToken::new(OpCode::PUSHDATA1, Some(vec![0; 256]));
        assert!(matches!(
            too_long.to_bytes(),
            Err(ScriptError::DataOverflow { len: 256, .. })
        ));
        Ok(())
    }

    #[test]
    fn parse_ints() -> anyhow::Result<()> {
        let cases = [
            ("0f", -1),
            ("10", 0),
            ("20", 16),
            ("0001", 1),
            ("00ff", -1),
            ("01007f", 32512),
            ("01feff", -2),
            ("0200000080", i32::MIN as i64),
        ];
        for (script, expected) in cases {
            let tokens = OpToken::from_hex(script)?;
            assert_eq!(tokens[0].parse_int()?, BigInt::from(expected), "{script}");
        }

        assert!(matches!(
            OpToken::simple(OpCode::NOP).parse_int(),
            Err(ScriptError::NotAnInteger("NOP"))
        ));
        Ok(())
    }

    #[test]
    fn for_integer() -> anyhow::Result<()> {
        assert_eq!(OpToken::for_integer(5)?, OpToken::simple(OpCode::PUSH5));
        assert_eq!(
            OpToken::for_integer(1000)?,
            OpToken::new(OpCode::PUSHINT16, Some(vec![0xe8, 0x03]))
        );
        assert_eq!(OpToken::for_integer(1000)?.parse_int()?, BigInt::from(1000));
        Ok(())
    }

    #[test]
    fn pretty_print() {
        let syscall = OpToken::new(OpCode::SYSCALL, Some(vec![1, 2, 3, 4]));
        assert_eq!(syscall.pretty_print(DEFAULT_PADDING), "SYSCALL      01020304");
        assert_eq!(syscall.pretty_print(8), "SYSCALL  01020304");
        assert_eq!(syscall.to_string(), "SYSCALL      01020304");

        let data = OpToken::new(OpCode::PUSHDATA1, Some(vec![0, 0, 0, 0, 1]));
        assert_eq!(data.pretty_print(8), "PUSHDATA1 0000000001");

        assert_eq!(OpToken::simple(OpCode::PUSH1).pretty_print(8), "PUSH1");
    }

    #[test]
    fn reader_offsets() -> anyhow::Result<()> {
        let script = hex::decode("0c0201024140")?;
        let mut reader = TokenReader::new(&script);
        assert_eq!(reader.offset(), 0);
        reader.next_token()?;
        assert_eq!(reader.offset(), 4);
        assert!(reader.next_token().is_err());
        reader.reset();
        assert!(reader.collect::<Result<Vec<_>, _>>().is_err());
        Ok(())
    }
}
