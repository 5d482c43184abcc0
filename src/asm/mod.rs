mod opcodes;
mod util;

use self::opcodes::{handlers, Context};
use crate::ast;
use crate::error::ScriptError;

pub fn assemble(ast: &[ast::Instr]) -> Result<Vec<u8>, AsmError> {
    let handlers = handlers();

    let mut context = Context::new();
    for instr in ast {
        context.add_instr(handlers, instr)?;
    }

    Ok(context.into_script())
}

pub fn check(ast: &[ast::Instr]) -> Vec<AsmError> {
    let handlers = handlers();

    let mut errors = Vec::new();
    let mut context = Context::new();
    context.set_allow_invalid();
    for instr in ast {
        if let Err(e) = context.add_instr(handlers, instr) {
            errors.push(e);
        }
    }

    errors
}

impl ast::InstrArgValue<'_> {
    fn ty(&self) -> ArgType {
        match self {
            ast::InstrArgValue::Nat(_) => ArgType::Nat,
            ast::InstrArgValue::Bytes(_) => ArgType::Bytes,
            ast::InstrArgValue::Str(_) => ArgType::String,
            ast::InstrArgValue::Service(_) => ArgType::Service,
            ast::InstrArgValue::Invalid => ArgType::Invalid,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgType {
    Nat,
    Bytes,
    String,
    Service,
    Invalid,
}

impl ArgType {
    pub fn expected_exact(self) -> ExpectedArgType {
        ExpectedArgType::Exact(self)
    }

    pub fn expected_or<T: Into<ExpectedArgType>>(self, other: T) -> ExpectedArgType {
        ExpectedArgType::OneOf(self, Box::new(other.into()))
    }
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Nat => "number",
            Self::Bytes => "byte string",
            Self::String => "string",
            Self::Service => "service name",
            Self::Invalid => "invalid",
        })
    }
}

impl From<ArgType> for ExpectedArgType {
    #[inline]
    fn from(value: ArgType) -> Self {
        Self::Exact(value)
    }
}

#[derive(Debug)]
pub enum ExpectedArgType {
    Exact(ArgType),
    OneOf(ArgType, Box<Self>),
}

impl ExpectedArgType {
    pub fn join<T: Into<ExpectedArgType>>(mut self, other: T) -> Self {
        fn join_inner(this: &mut ExpectedArgType, other: ExpectedArgType) {
            let mut value = std::mem::replace(this, ExpectedArgType::Exact(ArgType::Invalid));
            match &mut value {
                ExpectedArgType::Exact(exact) => {
                    *this = ExpectedArgType::OneOf(*exact, Box::new(other))
                }
                ExpectedArgType::OneOf(_, rest) => {
                    join_inner(rest, other);
                    *this = value
                }
            }
        }

        join_inner(&mut self, other.into());
        self
    }
}

impl std::fmt::Display for ExpectedArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(arg_type) => std::fmt::Display::fmt(arg_type, f),
            Self::OneOf(a, rest) => {
                std::fmt::Display::fmt(a, f)?;
                let mut rest = rest.as_ref();
                loop {
                    match rest {
                        Self::Exact(b) => return write!(f, " or {b}"),
                        Self::OneOf(b, next) => {
                            write!(f, ", {b}")?;
                            rest = next;
                        }
                    }
                }
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("unknown opcode: {name}")]
    UnknownOpcode { name: Box<str>, span: ast::Span },
    #[error("unknown interop service: {name}")]
    UnknownService { name: Box<str>, span: ast::Span },
    #[error("expected {expected}, got {found}")]
    ArgTypeMismatch {
        span: ast::Span,
        found: ArgType,
        expected: ExpectedArgType,
    },
    #[error("too many args")]
    TooManyArgs(ast::Span),
    #[error("not enough args")]
    NotEnoughArgs(ast::Span),
    #[error("out of range")]
    OutOfRange(ast::Span),
    #[error("invalid usage: {details}")]
    WrongUsage {
        details: &'static str,
        span: ast::Span,
    },
    #[error("encode error: {inner}")]
    Encode { inner: ScriptError, span: ast::Span },
    #[error("multiple: {0:?}")]
    Multiple(Box<[AsmError]>),
}

impl AsmError {
    pub fn can_ignore(&self) -> bool {
        match self {
            Self::ArgTypeMismatch {
                found: ArgType::Invalid,
                ..
            } => true,
            Self::Multiple(items) => items.iter().all(Self::can_ignore),
            _ => false,
        }
    }

    pub fn span(&self) -> ast::Span {
        match self {
            Self::UnknownOpcode { span, .. }
            | Self::UnknownService { span, .. }
            | Self::ArgTypeMismatch { span, .. }
            | Self::TooManyArgs(span)
            | Self::NotEnoughArgs(span)
            | Self::OutOfRange(span)
            | Self::WrongUsage { span, .. }
            | Self::Encode { span, .. } => *span,
            Self::Multiple(items) => match items.as_ref() {
                [] => ast::Span::new(0, 0),
                [first, rest @ ..] => {
                    let mut res = first.span();
                    for item in rest {
                        let item_span = item.span();
                        res.start = std::cmp::min(res.start, item_span.start);
                        res.end = std::cmp::max(res.end, item_span.end);
                    }
                    res
                }
            },
        }
    }
}

pub trait JoinResults<T> {
    fn join_results(self) -> Result<T, AsmError>;
}

impl<T1, T2> JoinResults<(T1, T2)> for (Result<T1, AsmError>, Result<T2, AsmError>) {
    fn join_results(self) -> Result<(T1, T2), AsmError> {
        match self {
            (Ok(a1), Ok(a2)) => Ok((a1, a2)),
            (Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
            (Err(e1), Err(e2)) => Err(AsmError::Multiple(Box::from([e1, e2]))),
        }
    }
}
