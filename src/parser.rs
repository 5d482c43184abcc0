use std::collections::VecDeque;

use num_traits::ToPrimitive;

use crate::error::ScriptError;
use crate::intent::{CallFlags, CallIntent};
use crate::interop::ServiceCode;
use crate::opcode::OpCode;
use crate::param::ContractParam;
use crate::primitives::UInt160;
use crate::token::{OpToken, TokenReader};
use crate::util::decode_hex;

/// Evaluation stack of the call decompiler.
///
/// The front is the most recently pushed item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArgStack {
    items: VecDeque<ContractParam>,
}

impl ArgStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: ContractParam) {
        self.items.push_front(item);
    }

    pub fn pop(&mut self) -> Option<ContractParam> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&ContractParam> {
        self.items.front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Pops the top item, failing with `what` on an empty stack.
    pub fn pop_expected(&mut self, what: &'static str) -> Result<ContractParam, ScriptError> {
        self.pop().ok_or(ScriptError::StructuralMismatch(what))
    }

    /// Pops a count and then that many items into an array.
    ///
    /// The first popped item becomes the first array element.
    pub fn pack(&mut self) -> Result<(), ScriptError> {
        let count = match self.pop_expected("missing item count for PACK")? {
            ContractParam::Integer(count) => count.to_usize(),
            _ => None,
        };
        let count = match count {
            Some(count) if count <= self.items.len() => count,
            _ => return Err(ScriptError::StructuralMismatch("invalid item count for PACK")),
        };

        let items = self.items.drain(..count).collect();
        self.push(ContractParam::Array(items));
        Ok(())
    }
}

/// Recovers contract calls from an assembled script.
pub struct ScriptParser<'a> {
    reader: TokenReader<'a>,
}

impl<'a> ScriptParser<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self {
            reader: TokenReader::new(script),
        }
    }

    /// Decodes every `System.Contract.Call` invocation in script order.
    ///
    /// Instructions after the last call which do not complete another one
    /// are ignored.
    pub fn to_script_params(&mut self) -> Result<Vec<CallIntent>, ScriptError> {
        self.reader.reset();

        let mut intents = Vec::new();
        while let Some(intent) = self.next_call()? {
            intents.push(intent);
        }
        Ok(intents)
    }

    /// Reads instructions up to the next contract call.
    pub fn next_call(&mut self) -> Result<Option<CallIntent>, ScriptError> {
        let mut stack = ArgStack::new();

        while let Some(token) = self.reader.next_token()? {
            match token.code {
                OpCode::NOP | OpCode::ASSERT => {}
                OpCode::RET => stack.clear(),
                OpCode::PACK => stack.pack()?,
                OpCode::SYSCALL => return read_call(&token, &mut stack).map(Some),
                _ => stack.push(push_value(&token)?),
            }
        }

        Ok(None)
    }
}

/// Decodes calls from a hex encoded script.
pub fn decompile_hex(script: &str) -> Result<Vec<CallIntent>, ScriptError> {
    let script = decode_hex(script)?;
    ScriptParser::new(&script).to_script_params()
}

fn push_value(token: &OpToken) -> Result<ContractParam, ScriptError> {
    Ok(match token.code {
        OpCode::PUSHT => ContractParam::Boolean(true),
        OpCode::PUSHF => ContractParam::Boolean(false),
        OpCode::PUSHNULL => ContractParam::Any(None),
        OpCode::PUSHDATA1 | OpCode::PUSHDATA2 | OpCode::PUSHDATA4 => {
            ContractParam::ByteArray(token.operand.clone().unwrap_or_default())
        }
        code if code.small_int().is_some() => ContractParam::Integer(token.parse_int()?),
        OpCode::PUSHINT8
        | OpCode::PUSHINT16
        | OpCode::PUSHINT32
        | OpCode::PUSHINT64
        | OpCode::PUSHINT128
        | OpCode::PUSHINT256 => ContractParam::Integer(token.parse_int()?),
        code => return Err(ScriptError::UnexpectedInstruction(code.name())),
    })
}

fn read_call(token: &OpToken, stack: &mut ArgStack) -> Result<CallIntent, ScriptError> {
    let operand = token.operand.as_deref().unwrap_or_default();
    if ServiceCode::from_slice(operand) != Some(ServiceCode::CONTRACT_CALL) {
        return Err(ScriptError::UnknownService(hex::encode(operand).into()));
    }

    let script_hash = match stack.pop_expected("missing script hash")? {
        ContractParam::ByteArray(bytes) if bytes.len() == UInt160::LEN => {
            UInt160::from_wire(&bytes)?
        }
        _ => return Err(ScriptError::StructuralMismatch("script hash must be 20 bytes")),
    };

    let mut call_flags = CallFlags::default();
    if let Some(ContractParam::Integer(flags)) = stack.peek() {
        call_flags = match flags.to_u8() {
            Some(bits) => CallFlags(bits),
            None => return Err(ScriptError::StructuralMismatch("invalid call flags")),
        };
        stack.pop();
    }

    let operation = match stack.pop_expected("missing operation")? {
        ContractParam::ByteArray(bytes) => String::from_utf8(bytes)
            .map_err(|_| ScriptError::StructuralMismatch("operation is not valid UTF-8"))?,
        _ => return Err(ScriptError::StructuralMismatch("operation must be a byte string")),
    };

    let args = match stack.pop_expected("missing call arguments")? {
        ContractParam::Array(args) => args,
        _ => return Err(ScriptError::StructuralMismatch("call arguments must be an array")),
    };

    if !stack.is_empty() {
        return Err(ScriptError::StructuralMismatch("unexpected items before the call"));
    }

    Ok(CallIntent {
        script_hash,
        operation,
        args,
        call_flags,
    })
}
