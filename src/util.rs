use num_bigint::{BigInt, Sign};

use crate::error::ScriptError;
use crate::opcode::OpCode;

/// Widths of `PUSHINT8..PUSHINT256` operands.
pub const INT_WIDTHS: [usize; 6] = [1, 2, 4, 8, 16, 32];

pub fn bitsize(int: &BigInt, signed: bool) -> u64 {
    let mut bits = int.bits();
    if signed {
        match int.sign() {
            Sign::NoSign => bits,
            Sign::Plus => bits + 1,
            Sign::Minus => {
                // Check if `int` magnitude is not a power of 2
                let mut digits = int.iter_u64_digits().rev();
                if let Some(hi) = digits.next() {
                    if !hi.is_power_of_two() || !digits.all(|digit| digit == 0) {
                        bits += 1;
                    }
                }
                bits
            }
        }
    } else {
        bits
    }
}

/// Encodes `int` as a `width`-byte little-endian two's complement value.
pub fn int_to_le_bytes(int: &BigInt, width: usize) -> Option<Vec<u8>> {
    let required = (bitsize(int, true) as usize).div_ceil(8);
    if required > width {
        return None;
    }

    let mut bytes = int.to_signed_bytes_le();
    let prefix = bytes
        .last()
        .map(|last| (last >> 7) * 255)
        .unwrap_or_default();
    bytes.resize(width, prefix);
    Some(bytes)
}

/// Picks the canonical push instruction for an integer.
///
/// `-1..=16` map to the single byte opcodes, other values use the
/// smallest `PUSHINT*` width that holds them.
pub fn encode_int(int: &BigInt) -> Result<(OpCode, Option<Vec<u8>>), ScriptError> {
    if let Some(op) = small_int_op(int) {
        return Ok((op, None));
    }

    let required = (bitsize(int, true) as usize).div_ceil(8);
    for (i, width) in INT_WIDTHS.into_iter().enumerate() {
        if width < required {
            continue;
        }
        if let (Some(op), Some(bytes)) = (
            OpCode::from_u8(OpCode::PUSHINT8 as u8 + i as u8),
            int_to_le_bytes(int, width),
        ) {
            return Ok((op, Some(bytes)));
        }
    }

    Err(ScriptError::IntegerOverflow(int.to_string().into()))
}

fn small_int_op(int: &BigInt) -> Option<OpCode> {
    let value = i64::try_from(int).ok()?;
    OpCode::for_small_int(value)
}

/// Opcode of the smallest data push which holds `len` bytes.
pub fn data_push_op(len: usize) -> Result<OpCode, ScriptError> {
    Ok(match len {
        0..=0xff => OpCode::PUSHDATA1,
        0x100..=0xffff => OpCode::PUSHDATA2,
        _ if len as u64 <= u32::MAX as u64 => OpCode::PUSHDATA4,
        _ => {
            return Err(ScriptError::DataOverflow {
                opcode: OpCode::PUSHDATA4.name(),
                len,
            })
        }
    })
}

/// Returns a copy of `bytes` in the opposite order.
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    let mut bytes = bytes.to_vec();
    bytes.reverse();
    bytes
}

/// Decodes a hex string, optionally prefixed with `0x`.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ScriptError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Ok(hex::decode(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: i128) -> (OpCode, String) {
        let (op, operand) = encode_int(&BigInt::from(value)).unwrap();
        (op, hex::encode(operand.unwrap_or_default()))
    }

    #[test]
    fn signed_bitsize() {
        assert_eq!(bitsize(&BigInt::from(0), true), 0);
        assert_eq!(bitsize(&BigInt::from(127), true), 8);
        assert_eq!(bitsize(&BigInt::from(128), true), 9);
        assert_eq!(bitsize(&BigInt::from(-128), true), 8);
        assert_eq!(bitsize(&BigInt::from(-129), true), 9);
    }

    #[test]
    fn canonical_ints() {
        assert_eq!(encoded(-1), (OpCode::PUSHM1, String::new()));
        assert_eq!(encoded(0), (OpCode::PUSH0, String::new()));
        assert_eq!(encoded(16), (OpCode::PUSH16, String::new()));
        assert_eq!(encoded(17), (OpCode::PUSHINT8, "11".to_owned()));
        assert_eq!(encoded(-2), (OpCode::PUSHINT8, "fe".to_owned()));
        assert_eq!(encoded(127), (OpCode::PUSHINT8, "7f".to_owned()));
        assert_eq!(encoded(128), (OpCode::PUSHINT16, "8000".to_owned()));
        assert_eq!(encoded(-128), (OpCode::PUSHINT8, "80".to_owned()));
        assert_eq!(encoded(-129), (OpCode::PUSHINT16, "7fff".to_owned()));
        assert_eq!(encoded(65535), (OpCode::PUSHINT32, "ffff0000".to_owned()));
        assert_eq!(
            encoded(1 << 40),
            (OpCode::PUSHINT64, "0000000000010000".to_owned())
        );
        assert_eq!(
            encoded(i64::MAX as i128 + 1),
            (
                OpCode::PUSHINT128,
                "00000000000000800000000000000000".to_owned()
            )
        );
    }

    #[test]
    fn int_overflow() {
        let max = (BigInt::from(1) << 255) - 1;
        let (op, operand) = encode_int(&max).unwrap();
        assert_eq!(op, OpCode::PUSHINT256);
        assert_eq!(operand.map(|x| x.len()), Some(32));

        let min: BigInt = -(BigInt::from(1) << 255usize);
        assert_eq!(encode_int(&min).unwrap().0, OpCode::PUSHINT256);

        let too_big = BigInt::from(1) << 255;
        assert!(matches!(
            encode_int(&too_big),
            Err(ScriptError::IntegerOverflow(_))
        ));

        // bit length above u16::MAX
        let huge = (BigInt::from(1) << 65543usize) + 5;
        assert!(bitsize(&huge, true) > 65536);
        assert!(matches!(encode_int(&huge), Err(ScriptError::IntegerOverflow(_))));
        assert!(matches!(encode_int(&-huge.clone()), Err(ScriptError::IntegerOverflow(_))));
        assert_eq!(int_to_le_bytes(&huge, 32), None);
    }

    #[test]
    fn data_push_thresholds() {
        assert_eq!(data_push_op(0).unwrap(), OpCode::PUSHDATA1);
        assert_eq!(data_push_op(0xff).unwrap(), OpCode::PUSHDATA1);
        assert_eq!(data_push_op(0x100).unwrap(), OpCode::PUSHDATA2);
        assert_eq!(data_push_op(0xffff).unwrap(), OpCode::PUSHDATA2);
        assert_eq!(data_push_op(0x10000).unwrap(), OpCode::PUSHDATA4);
    }

    #[test]
    fn hex_helpers() -> anyhow::Result<()> {
        assert_eq!(decode_hex("0x0102")?, vec![1, 2]);
        assert_eq!(decode_hex(" abcd ")?, vec![0xab, 0xcd]);
        assert!(decode_hex("zz").is_err());
        assert_eq!(reversed(&[1, 2, 3]), vec![3, 2, 1]);
        Ok(())
    }
}
