//! Script codec, assembler and fee estimator for the Neo N3 VM.

pub use self::asm::{ArgType, AsmError, ExpectedArgType};
pub use self::ast::{ParserError, Span};
pub use self::builder::{create_script, ScriptBuilder};
pub use self::disasm::{disassemble, format_instr};
pub use self::error::{ErrorKind, ScriptError};
pub use self::fees::{calculate_execution_fee, FeeCalculator, DEFAULT_FEE_FACTOR};
pub use self::intent::{CallFlags, CallIntent};
pub use self::interop::{InteropService, ServiceCode, ServicePrice};
pub use self::opcode::{OpCode, OperandSize};
pub use self::param::{ContractParam, ContractParamType};
pub use self::parser::{decompile_hex, ArgStack, ScriptParser};
pub use self::primitives::{PublicKey, UInt160, UInt256};
pub use self::token::{tokens_to_script, OpToken, TokenReader, DEFAULT_PADDING};
pub use self::verification::{
    construct_multisig_verification_script, get_public_keys_from_verification_script,
    get_signing_threshold_from_verification_script, is_multisig_contract,
    is_signature_contract, signature_verification_script, VerificationScript,
    MAX_MULTISIG_KEYS,
};

mod asm;
mod ast;
mod builder;
mod disasm;
mod error;
mod fees;
mod intent;
mod interop;
mod opcode;
mod param;
mod parser;
mod primitives;
mod token;
mod util;
mod verification;

/// Parsed assembly listing.
pub struct Code<'a> {
    text: &'a str,
    ast: Option<ast::Code<'a>>,
    parser_errors: Vec<ast::ParserError>,
}

impl<'a> Code<'a> {
    pub fn assemble(text: &'a str) -> anyhow::Result<Vec<u8>> {
        let script = Self::parse(text).try_into_valid()?.assemble()?;
        Ok(script)
    }

    pub fn parse(text: &'a str) -> Self {
        let (ast, parser_errors) = ast::parse(text).into_output_errors();

        Self {
            text,
            ast,
            parser_errors,
        }
    }

    pub fn check(&self) -> Vec<AsmError> {
        if let Some(ast::Code { items, .. }) = &self.ast {
            asm::check(items)
        } else {
            Vec::new()
        }
    }

    pub fn try_into_valid(self) -> Result<ValidCode<'a>, ast::ParserError> {
        if self.parser_errors.is_empty() {
            if let Some(ast::Code { items, .. }) = self.ast {
                return Ok(ValidCode {
                    text: self.text,
                    ast: items,
                });
            }
        }

        Err(self
            .parser_errors
            .into_iter()
            .next()
            .unwrap_or(ast::ParserError::UnknownError))
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn parser_errors(&self) -> &[ast::ParserError] {
        &self.parser_errors
    }
}

/// Listing without parser errors.
pub struct ValidCode<'a> {
    text: &'a str,
    ast: Vec<ast::Instr<'a>>,
}

impl<'a> ValidCode<'a> {
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Number of instructions in the listing.
    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    pub fn assemble(&self) -> Result<Vec<u8>, AsmError> {
        asm::assemble(&self.ast)
    }

    pub fn check(self) -> Vec<AsmError> {
        asm::check(&self.ast)
    }
}
