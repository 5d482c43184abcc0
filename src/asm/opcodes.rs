use std::sync::OnceLock;

use ahash::HashMap;
use either::Either;
use num_bigint::BigInt;

use super::util::*;
use super::{AsmError, JoinResults};
use crate::ast;
use crate::builder::ScriptBuilder;
use crate::error::ScriptError;
use crate::opcode::{OpCode, OperandSize};
use crate::token::OpToken;

#[derive(Default)]
pub struct Context {
    builder: ScriptBuilder,
    allow_invalid: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allow_invalid(&mut self) {
        self.allow_invalid = true;
    }

    pub fn add_instr(
        &mut self,
        handlers: &Handlers,
        instr: &ast::Instr<'_>,
    ) -> Result<(), AsmError> {
        let Some(handler) = handlers.get(instr.ident) else {
            return Err(AsmError::UnknownOpcode {
                name: instr.ident.into(),
                span: instr.ident_span,
            });
        };

        match handler {
            Handler::Native(code) => op_native(self, *code, instr),
            Handler::Pseudo(f) => (f)(self, instr),
        }
    }

    pub fn into_script(self) -> Vec<u8> {
        self.builder.build()
    }

    fn write_token(&mut self, token: OpToken, span: ast::Span) -> Result<(), AsmError> {
        self.builder.emit_token(&token).with_span(span)?;
        Ok(())
    }
}

pub type Handlers = HashMap<&'static str, Handler>;
pub type PseudoHandlerFn = fn(&mut Context, &ast::Instr<'_>) -> Result<(), AsmError>;

#[derive(Clone, Copy)]
pub enum Handler {
    Native(OpCode),
    Pseudo(PseudoHandlerFn),
}

pub fn handlers() -> &'static Handlers {
    static HANDLERS: OnceLock<Handlers> = OnceLock::new();
    HANDLERS.get_or_init(|| {
        let mut t = Handlers::default();
        for code in OpCode::ALL {
            t.insert(code.name(), Handler::Native(*code));
        }
        register_pseudo(&mut t);
        t
    })
}

fn register_pseudo(t: &mut Handlers) {
    t.insert("PUSHINT", Handler::Pseudo(op_pushint));
    t.insert("PUSHDATA", Handler::Pseudo(op_pushdata));
    t.insert("PUSHBOOL", Handler::Pseudo(op_pushbool));
}

fn op_native(ctx: &mut Context, code: OpCode, instr: &ast::Instr<'_>) -> Result<(), AsmError> {
    let operand = match (code, code.operand()) {
        (_, OperandSize::None) => {
            let () = instr.parse_args()?;
            None
        }
        (OpCode::TRY | OpCode::TRY_L | OpCode::INITSLOT, OperandSize::Fixed(width))
            if instr.args.len() == 2 =>
        {
            Some(split_operand(ctx, code, width as usize, instr)?)
        }
        (OpCode::SYSCALL, OperandSize::Fixed(width)) => {
            match instr.parse_args::<Either<Service, WithSpan<Either<Nat, Bytes>>>>()? {
                Either::Left(Service(service)) => Some(service.as_bytes().to_vec()),
                Either::Right(WithSpan(arg, span)) => {
                    Some(fixed_operand(code, width as usize, arg, span)?)
                }
            }
        }
        (_, OperandSize::Fixed(width)) => {
            let WithSpan(arg, span) = instr.parse_args::<WithSpan<Either<Nat, Bytes>>>()?;
            Some(fixed_operand(code, width as usize, arg, span)?)
        }
        (_, OperandSize::Prefixed(_)) => {
            let Data(data) = instr.parse_args()?;
            Some(data.to_vec())
        }
    };

    ctx.write_token(OpToken::new(code, operand), instr.span)
}

/// Two numeric halves of `TRY`, `TRY_L` and `INITSLOT` operands.
fn split_operand(
    ctx: &Context,
    code: OpCode,
    width: usize,
    instr: &ast::Instr<'_>,
) -> Result<Vec<u8>, AsmError> {
    let half = width / 2;
    let signed = code.has_signed_operand();
    let (WithSpan(Nat(a), a_span), WithSpan(Nat(b), b_span)) = instr.parse_args()?;

    let encode = |n: &BigInt, span: ast::Span| {
        nat_to_le_bytes(n, half, signed).ok_or(AsmError::OutOfRange(span))
    };
    let (mut a, b) = if ctx.allow_invalid {
        (encode(a, a_span), encode(b, b_span)).join_results()?
    } else {
        (encode(a, a_span)?, encode(b, b_span)?)
    };

    a.extend_from_slice(&b);
    Ok(a)
}

fn fixed_operand(
    code: OpCode,
    width: usize,
    arg: Either<Nat, Bytes>,
    span: ast::Span,
) -> Result<Vec<u8>, AsmError> {
    match arg {
        Either::Left(Nat(n)) => {
            nat_to_le_bytes(n, width, code.has_signed_operand()).ok_or(AsmError::OutOfRange(span))
        }
        Either::Right(Bytes(bytes)) if bytes.len() == width => Ok(bytes.to_vec()),
        Either::Right(Bytes(bytes)) => Err(AsmError::Encode {
            inner: ScriptError::InvalidOperandLength {
                opcode: code.name(),
                expected: width,
                actual: bytes.len(),
            },
            span,
        }),
    }
}

fn op_pushint(ctx: &mut Context, instr: &ast::Instr<'_>) -> Result<(), AsmError> {
    let Nat(n) = instr.parse_args()?;
    ctx.builder.emit_number(n).with_span(instr.span)?;
    Ok(())
}

fn op_pushdata(ctx: &mut Context, instr: &ast::Instr<'_>) -> Result<(), AsmError> {
    let Data(data) = instr.parse_args()?;
    ctx.builder.emit_bytes(data).with_span(instr.span)?;
    Ok(())
}

fn op_pushbool(ctx: &mut Context, instr: &ast::Instr<'_>) -> Result<(), AsmError> {
    let NatBool(value) = instr.parse_args()?;
    ctx.builder.emit_boolean(value);
    Ok(())
}

trait WithSpanExt<T> {
    fn with_span(self, span: ast::Span) -> Result<T, AsmError>;
}

impl<T> WithSpanExt<T> for Result<T, ScriptError> {
    #[inline]
    fn with_span(self, span: ast::Span) -> Result<T, AsmError> {
        self.map_err(|e| AsmError::Encode { inner: e, span })
    }
}
