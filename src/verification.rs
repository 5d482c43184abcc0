//! Canonical witness verification scripts.

use num_bigint::BigInt;

use crate::builder::ScriptBuilder;
use crate::error::ScriptError;
use crate::interop::ServiceCode;
use crate::opcode::OpCode;
use crate::primitives::PublicKey;

/// Largest number of keys in a multisig script.
pub const MAX_MULTISIG_KEYS: usize = 1024;

const SIGNATURE_SCRIPT_LEN: usize = 40;
const MIN_MULTISIG_SCRIPT_LEN: usize = 42;

/// Shape of a verification script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationScript {
    Signature(PublicKey),
    Multisig {
        threshold: usize,
        keys: Vec<PublicKey>,
    },
    Other,
}

impl VerificationScript {
    pub fn classify(script: &[u8]) -> Self {
        if is_signature_contract(script) {
            if let Ok(key) = PublicKey::from_slice(&script[2..35]) {
                return Self::Signature(key);
            }
        }
        match parse_multisig(script) {
            Some((threshold, keys)) => Self::Multisig { threshold, keys },
            None => Self::Other,
        }
    }
}

/// `PUSHDATA1 33 <key> SYSCALL System.Crypto.CheckSig`
pub fn is_signature_contract(script: &[u8]) -> bool {
    script.len() == SIGNATURE_SCRIPT_LEN
        && script[0] == OpCode::PUSHDATA1.to_u8()
        && script[1] as usize == PublicKey::LEN
        && script[35] == OpCode::SYSCALL.to_u8()
        && script[36..40] == ServiceCode::CHECK_SIG.0
}

/// `<m> (PUSHDATA1 33 <key>){n} <n> SYSCALL System.Crypto.CheckMultisig`
pub fn is_multisig_contract(script: &[u8]) -> bool {
    parse_multisig(script).is_some()
}

pub fn signature_verification_script(key: &PublicKey) -> Result<Vec<u8>, ScriptError> {
    let mut builder = ScriptBuilder::new();
    builder
        .emit_public_key(key)?
        .emit(OpCode::SYSCALL, Some(ServiceCode::CHECK_SIG.as_bytes()));
    Ok(builder.build())
}

/// Builds an `m`-of-`n` multisig script.
///
/// Keys are written in the specified order.
pub fn construct_multisig_verification_script(
    threshold: usize,
    keys: &[PublicKey],
) -> Result<Vec<u8>, ScriptError> {
    if threshold == 0 || threshold > keys.len() || keys.len() > MAX_MULTISIG_KEYS {
        return Err(ScriptError::InvalidArgument(
            format!(
                "invalid multisig threshold {threshold} for {} keys",
                keys.len()
            )
            .into(),
        ));
    }

    let mut builder = ScriptBuilder::new();
    builder.emit_number(&BigInt::from(threshold))?;
    for key in keys {
        builder.emit_public_key(key)?;
    }
    builder
        .emit_number(&BigInt::from(keys.len()))?
        .emit(OpCode::SYSCALL, Some(ServiceCode::CHECK_MULTISIG.as_bytes()));
    Ok(builder.build())
}

pub fn get_public_keys_from_verification_script(
    script: &[u8],
) -> Result<Vec<PublicKey>, ScriptError> {
    let (_, keys) = parse_multisig(script).ok_or(ScriptError::NotMultisig)?;
    Ok(keys)
}

pub fn get_signing_threshold_from_verification_script(
    script: &[u8],
) -> Result<usize, ScriptError> {
    let (threshold, _) = parse_multisig(script).ok_or(ScriptError::NotMultisig)?;
    Ok(threshold)
}

fn parse_multisig(script: &[u8]) -> Option<(usize, Vec<PublicKey>)> {
    if script.len() < MIN_MULTISIG_SCRIPT_LEN {
        return None;
    }

    let (threshold, mut offset) = read_count(script, 0)?;

    let mut keys = Vec::new();
    while script.get(offset) == Some(&OpCode::PUSHDATA1.to_u8()) {
        if script.get(offset + 1) != Some(&(PublicKey::LEN as u8)) {
            return None;
        }
        let key = script.get(offset + 2..offset + 2 + PublicKey::LEN)?;
        keys.push(PublicKey::from_slice(key).ok()?);
        offset += 2 + PublicKey::LEN;
    }
    if keys.len() < threshold || keys.len() > MAX_MULTISIG_KEYS {
        return None;
    }

    let (count, offset) = read_count(script, offset)?;
    if count != keys.len() || script.len() != offset + 5 {
        return None;
    }

    let is_check = script[offset] == OpCode::SYSCALL.to_u8()
        && script[offset + 1..offset + 5] == ServiceCode::CHECK_MULTISIG.0;
    is_check.then_some((threshold, keys))
}

/// Reads a `PUSH1..PUSH16`, `PUSHINT8` or `PUSHINT16` count.
///
/// Operands are read as signed integers.
fn read_count(script: &[u8], offset: usize) -> Option<(usize, usize)> {
    let code = OpCode::from_u8(*script.get(offset)?)?;
    let (value, next) = match code {
        OpCode::PUSHINT8 => {
            let byte = *script.get(offset + 1)?;
            (i8::from_le_bytes([byte]) as i64, offset + 2)
        }
        OpCode::PUSHINT16 => {
            let bytes = script.get(offset + 1..offset + 3)?;
            (i16::from_le_bytes([bytes[0], bytes[1]]) as i64, offset + 3)
        }
        code => (code.small_int()? as i64, offset + 1),
    };

    let value = usize::try_from(value).ok()?;
    (1..=MAX_MULTISIG_KEYS).contains(&value).then_some((value, next))
}
