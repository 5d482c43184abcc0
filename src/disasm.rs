use std::fmt::Write;

use num_bigint::{BigInt, Sign};

use crate::error::ScriptError;
use crate::interop::ServiceCode;
use crate::opcode::{OpCode, OperandSize};
use crate::token::{OpToken, TokenReader, DEFAULT_PADDING};

/// Renders a script as a listing which assembles back to the same bytes.
///
/// Each line carries the byte offset of the instruction in a trailing
/// comment, followed by the service name for known syscalls.
pub fn disassemble(script: &[u8]) -> Result<String, ScriptError> {
    let mut lines = Vec::new();

    let mut reader = TokenReader::new(script);
    loop {
        let offset = reader.offset();
        let Some(token) = reader.next_token()? else {
            break;
        };
        lines.push((offset, format_instr(&token), service_name(&token)));
    }

    let width = lines
        .iter()
        .map(|(_, text, _)| text.len())
        .max()
        .unwrap_or_default();

    let mut result = String::new();
    for (offset, text, service) in lines {
        _ = write!(result, "{text:<width$}  // {offset:04x}");
        if let Some(service) = service {
            _ = write!(result, " {service}");
        }
        result.push('\n');
    }
    Ok(result)
}

/// Formats a single instruction in the listing syntax.
pub fn format_instr(token: &OpToken) -> String {
    let Some(operand) = token.operand.as_deref() else {
        return token.code.name().to_owned();
    };

    let signed = token.code.has_signed_operand();
    let operand = match (token.code, token.code.operand()) {
        (OpCode::TRY | OpCode::TRY_L | OpCode::INITSLOT, OperandSize::Fixed(n))
            if operand.len() == n as usize =>
        {
            let (a, b) = operand.split_at(operand.len() / 2);
            format!("{}, {}", le_int(a, signed), le_int(b, signed))
        }
        (OpCode::SYSCALL, _) | (_, OperandSize::Prefixed(_)) => {
            format!("x{{{}}}", hex::encode(operand))
        }
        (_, OperandSize::Fixed(n)) if operand.len() == n as usize => {
            le_int(operand, signed).to_string()
        }
        _ => format!("x{{{}}}", hex::encode(operand)),
    };

    format!("{:<width$} {operand}", token.code.name(), width = DEFAULT_PADDING)
}

fn le_int(bytes: &[u8], signed: bool) -> BigInt {
    if signed {
        BigInt::from_signed_bytes_le(bytes)
    } else {
        BigInt::from_bytes_le(Sign::Plus, bytes)
    }
}

fn service_name(token: &OpToken) -> Option<&'static str> {
    if token.code != OpCode::SYSCALL {
        return None;
    }
    let code = ServiceCode::from_slice(token.operand.as_deref()?)?;
    code.service().map(|service| service.name)
}
