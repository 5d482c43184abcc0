use num_bigint::BigInt;

use crate::error::ScriptError;
use crate::intent::{CallFlags, CallIntent};
use crate::interop::ServiceCode;
use crate::opcode::{OpCode, OperandSize};
use crate::param::ContractParam;
use crate::primitives::{PublicKey, UInt160, UInt256};
use crate::token::OpToken;
use crate::util::{data_push_op, encode_int};

/// Appends instructions to a script.
///
/// Raw [`emit`](Self::emit) calls are not validated, all typed helpers
/// produce canonical encodings.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing script.
    pub fn from_script(script: Vec<u8>) -> Self {
        Self { script }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.script.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.script
    }

    /// Appends an opcode followed by the operand bytes as is.
    pub fn emit(&mut self, op: OpCode, operand: Option<&[u8]>) -> &mut Self {
        self.script.push(op.to_u8());
        if let Some(operand) = operand {
            self.script.extend_from_slice(operand);
        }
        self
    }

    /// Appends a token, validating its operand first.
    pub fn emit_token(&mut self, token: &OpToken) -> Result<&mut Self, ScriptError> {
        token.write_to(&mut self.script)?;
        Ok(self)
    }

    pub fn emit_push(&mut self, param: &ContractParam) -> Result<&mut Self, ScriptError> {
        match param {
            ContractParam::Any(_) => Ok(self.emit_null()),
            ContractParam::Boolean(value) => Ok(self.emit_boolean(*value)),
            ContractParam::Integer(value) => self.emit_number(value),
            ContractParam::ByteArray(bytes) => self.emit_bytes(bytes),
            ContractParam::String(value) => self.emit_string(value),
            ContractParam::Hash160(hash) => self.emit_hash160(hash),
            ContractParam::Hash256(hash) => self.emit_hash256(hash),
            ContractParam::PublicKey(key) => self.emit_public_key(key),
            ContractParam::Array(items) => self.emit_array(items),
            ContractParam::Void => Err(ScriptError::UnsupportedArgument("Void")),
        }
    }

    pub fn emit_null(&mut self) -> &mut Self {
        self.emit(OpCode::PUSHNULL, None)
    }

    pub fn emit_boolean(&mut self, value: bool) -> &mut Self {
        self.emit(if value { OpCode::PUSHT } else { OpCode::PUSHF }, None)
    }

    /// Pushes an integer with the shortest instruction.
    pub fn emit_number(&mut self, value: &BigInt) -> Result<&mut Self, ScriptError> {
        let (op, operand) = encode_int(value)?;
        Ok(self.emit(op, operand.as_deref()))
    }

    /// Pushes raw bytes with the shortest `PUSHDATA*` instruction.
    pub fn emit_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, ScriptError> {
        let op = data_push_op(bytes.len())?;
        let OperandSize::Prefixed(prefix) = op.operand() else {
            return Err(ScriptError::DataOverflow {
                opcode: op.name(),
                len: bytes.len(),
            });
        };

        let len = (bytes.len() as u32).to_le_bytes();
        self.script.push(op.to_u8());
        self.script.extend_from_slice(&len[..prefix as usize]);
        self.script.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn emit_string(&mut self, value: &str) -> Result<&mut Self, ScriptError> {
        self.emit_bytes(value.as_bytes())
    }

    pub fn emit_hash160(&mut self, hash: &UInt160) -> Result<&mut Self, ScriptError> {
        self.emit_bytes(&hash.to_wire())
    }

    pub fn emit_hash256(&mut self, hash: &UInt256) -> Result<&mut Self, ScriptError> {
        self.emit_bytes(&hash.to_wire())
    }

    pub fn emit_public_key(&mut self, key: &PublicKey) -> Result<&mut Self, ScriptError> {
        self.emit_bytes(&key.to_wire())
    }

    /// Pushes items in reverse order followed by their count and `PACK`.
    pub fn emit_array(&mut self, items: &[ContractParam]) -> Result<&mut Self, ScriptError> {
        for item in items.iter().rev() {
            self.emit_push(item)?;
        }
        self.emit_number(&BigInt::from(items.len()))?;
        Ok(self.emit(OpCode::PACK, None))
    }

    /// Pushes arguments in reverse order and invokes the service.
    pub fn emit_syscall(
        &mut self,
        service: ServiceCode,
        args: &[ContractParam],
    ) -> Result<&mut Self, ScriptError> {
        for arg in args.iter().rev() {
            self.emit_push(arg)?;
        }
        Ok(self.emit(OpCode::SYSCALL, Some(service.as_bytes())))
    }

    /// Emits a `System.Contract.Call` invocation.
    ///
    /// Pushes the arguments array, the operation name, the call flags
    /// and the script hash, then the syscall itself.
    pub fn emit_contract_call(
        &mut self,
        script_hash: &UInt160,
        operation: &str,
        args: &[ContractParam],
        call_flags: Option<CallFlags>,
    ) -> Result<&mut Self, ScriptError> {
        let call_flags = call_flags.unwrap_or_default();

        self.emit_array(args)?
            .emit_string(operation)?
            .emit_number(&BigInt::from(call_flags.bits()))?
            .emit_hash160(script_hash)?;
        Ok(self.emit(OpCode::SYSCALL, Some(ServiceCode::CONTRACT_CALL.as_bytes())))
    }

    pub fn emit_intent(&mut self, intent: &CallIntent) -> Result<&mut Self, ScriptError> {
        self.emit_contract_call(
            &intent.script_hash,
            &intent.operation,
            &intent.args,
            Some(intent.call_flags),
        )
    }

    /// Finalizes the builder.
    pub fn build(self) -> Vec<u8> {
        self.script
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.script)
    }
}

/// Builds one script invoking all intents in order.
pub fn create_script<'a, I>(intents: I) -> Result<Vec<u8>, ScriptError>
where
    I: IntoIterator<Item = &'a CallIntent>,
{
    let mut builder = ScriptBuilder::new();
    for intent in intents {
        builder.emit_intent(intent)?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_emit() -> anyhow::Result<()> {
        let mut builder = ScriptBuilder::new();
        builder.emit(OpCode::PUSHDATA1, Some(&hex::decode("1234")?));
        assert_eq!(builder.to_hex(), "0c1234");

        let mut builder = ScriptBuilder::from_script(vec![0x21]);
        assert_eq!(builder.len(), 1);
        builder.emit_token(&OpToken::new(OpCode::JMP, Some(vec![0x02])))?;
        assert_eq!(builder.to_hex(), "212202");
        assert!(builder
            .emit_token(&OpToken::new(OpCode::JMP, Some(vec![1, 2])))
            .is_err());
        assert_eq!(builder.len(), 3);
        Ok(())
    }

    #[test]
    fn push_params() -> anyhow::Result<()> {
        let hex_of = |param: ContractParam| -> anyhow::Result<String> {
            let mut builder = ScriptBuilder::new();
            builder.emit_push(&param)?;
            Ok(builder.to_hex())
        };

        assert_eq!(hex_of(ContractParam::boolean(true))?, "08");
        assert_eq!(hex_of(ContractParam::boolean(false))?, "09");
        assert_eq!(hex_of(ContractParam::any())?, "0b");
        assert_eq!(hex_of(ContractParam::integer(-1))?, "0f");
        assert_eq!(hex_of(ContractParam::integer(10))?, "1a");
        assert_eq!(hex_of(ContractParam::integer(100))?, "0064");
        assert_eq!(hex_of(ContractParam::integer(1000))?, "01e803");
        assert_eq!(hex_of(ContractParam::string("abc"))?, "0c03616263");
        assert_eq!(hex_of(ContractParam::byte_array("")?)?, "0c00");
        assert_eq!(
            hex_of(ContractParam::hash160("5b7074e873973a6ed3708862f219a6fbf4d1c411")?)?,
            "0c1411c4d1f4fba619f2628870d36e3a9773e874705b"
        );
        assert_eq!(
            hex_of(ContractParam::array([
                ContractParam::integer(1),
                ContractParam::integer(2),
            ]))?,
            "121112c0"
        );
        assert_eq!(hex_of(ContractParam::Array(Vec::new()))?, "10c0");
        assert!(hex_of(ContractParam::Void).is_err());
        Ok(())
    }

    #[test]
    fn oversized_integers() {
        let huge: BigInt = (BigInt::from(1) << 65543usize) + 5;
        assert!(matches!(
            OpToken::for_integer(huge.clone()),
            Err(ScriptError::IntegerOverflow(_))
        ));

        let mut builder = ScriptBuilder::new();
        assert!(builder.emit_push(&ContractParam::Integer(huge)).is_err());
        assert!(builder.emit_number(&(BigInt::from(1) << 256)).is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn long_data() -> anyhow::Result<()> {
        let mut builder = ScriptBuilder::new();
        builder.emit_bytes(&[0xaa; 256])?;
        let script = builder.build();
        assert_eq!(&script[..3], &[0x0d, 0x00, 0x01]);
        assert_eq!(script.len(), 3 + 256);

        let mut builder = ScriptBuilder::new();
        builder.emit_bytes(&[0xbb; 0x10000])?;
        assert_eq!(&builder.as_bytes()[..5], &[0x0e, 0x00, 0x00, 0x01, 0x00]);
        Ok(())
    }

    #[test]
    fn contract_call() -> anyhow::Result<()> {
        let hash: UInt160 = "ef4073a0f2b305a38ec4050e4d3d28bc40ea63f5".parse()?;

        let mut builder = ScriptBuilder::new();
        builder.emit_contract_call(&hash, "symbol", &[], None)?;
        assert_eq!(
            builder.to_hex(),
            "10c00c0673796d626f6c1f0c14f563ea40bc283d4d0e05c48ea305b3f2a07340ef41627d5b52"
        );

        let intent = CallIntent::new(hash, "balanceOf")
            .with_args([ContractParam::hash160(
                "5b7074e873973a6ed3708862f219a6fbf4d1c411",
            )?])
            .with_call_flags(CallFlags::READ_ONLY);
        let script = create_script([&intent, &intent])?;
        let single = create_script([&intent])?;
        assert_eq!(script.len(), single.len() * 2);
        assert_eq!(
            hex::encode(&single),
            concat!(
                "0c1411c4d1f4fba619f2628870d36e3a9773e874705b",
                "11c0",
                "0c0962616c616e63654f66",
                "15",
                "0c14f563ea40bc283d4d0e05c48ea305b3f2a07340ef",
                "41627d5b52"
            )
        );
        Ok(())
    }

    #[test]
    fn syscall_args() -> anyhow::Result<()> {
        let mut builder = ScriptBuilder::new();
        builder.emit_syscall(
            ServiceCode::CHECK_SIG,
            &[ContractParam::integer(1), ContractParam::integer(2)],
        )?;
        assert_eq!(builder.to_hex(), "12114156e7b327");
        Ok(())
    }
}
