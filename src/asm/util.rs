use either::Either;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::asm::AsmError;
use crate::ast;
use crate::interop::{InteropService, ServiceCode};
use crate::util::int_to_le_bytes;

use super::{ArgType, JoinResults};

pub trait ParseArgs {
    fn parse_args<'a, T: FromInstrArgs<'a>>(&'a self) -> Result<T, AsmError>;
}

impl ParseArgs for ast::Instr<'_> {
    #[inline]
    fn parse_args<'a, T: FromInstrArgs<'a>>(&'a self) -> Result<T, AsmError> {
        T::from_instr_args(self.ident_span, &self.args)
    }
}

pub trait FromInstrArgs<'a>: Sized {
    fn from_instr_args(
        instr_span: ast::Span,
        args: &'a [ast::InstrArg<'_>],
    ) -> Result<Self, AsmError>;
}

impl<'a, T: FromInstrArg<'a>> FromInstrArgs<'a> for T {
    fn from_instr_args(
        instr_span: ast::Span,
        args: &'a [ast::InstrArg<'_>],
    ) -> Result<Self, AsmError> {
        let (s,) = <_>::from_instr_args(instr_span, args)?;
        Ok(s)
    }
}

impl FromInstrArgs<'_> for () {
    fn from_instr_args(_: ast::Span, args: &[ast::InstrArg<'_>]) -> Result<Self, AsmError> {
        match args {
            [] => Ok(()),
            [first, rest @ ..] => Err(AsmError::TooManyArgs(compute_args_span(first, rest))),
        }
    }
}

impl<'a, T: FromInstrArg<'a>> FromInstrArgs<'a> for (T,) {
    fn from_instr_args(
        instr_span: ast::Span,
        args: &'a [ast::InstrArg<'_>],
    ) -> Result<Self, AsmError> {
        match args {
            [a] => Ok((T::from_instr_arg(a)?,)),
            [_, first, rest @ ..] => Err(AsmError::TooManyArgs(compute_args_span(first, rest))),
            _ => Err(AsmError::NotEnoughArgs(instr_span)),
        }
    }
}

impl<'a, T1, T2> FromInstrArgs<'a> for (T1, T2)
where
    T1: FromInstrArg<'a>,
    T2: FromInstrArg<'a>,
{
    fn from_instr_args(
        instr_span: ast::Span,
        args: &'a [ast::InstrArg<'_>],
    ) -> Result<Self, AsmError> {
        match args {
            [a1, a2] => (T1::from_instr_arg(a1), T2::from_instr_arg(a2)).join_results(),
            [_, _, first, rest @ ..] => Err(AsmError::TooManyArgs(compute_args_span(first, rest))),
            _ => Err(AsmError::NotEnoughArgs(instr_span)),
        }
    }
}

pub trait FromInstrArg<'a>: Sized {
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError>;
}

impl<'a, T1, T2> FromInstrArg<'a> for Either<T1, T2>
where
    T1: FromInstrArg<'a>,
    T2: FromInstrArg<'a>,
{
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match T1::from_instr_arg(arg) {
            Ok(v) => Ok(Self::Left(v)),
            Err(AsmError::ArgTypeMismatch {
                span,
                expected: expected_a,
                found,
            }) => match T2::from_instr_arg(arg) {
                Ok(v) => Ok(Self::Right(v)),
                Err(AsmError::ArgTypeMismatch {
                    expected: expected_b,
                    ..
                }) => Err(AsmError::ArgTypeMismatch {
                    span,
                    expected: expected_a.join(expected_b),
                    found,
                }),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

pub struct WithSpan<T>(pub T, pub ast::Span);

impl<'a, T> FromInstrArg<'a> for WithSpan<T>
where
    T: FromInstrArg<'a>,
{
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        let span = arg.span;
        Ok(Self(T::from_instr_arg(arg)?, span))
    }
}

fn mismatch(arg: &ast::InstrArg<'_>, expected: ArgType) -> AsmError {
    AsmError::ArgTypeMismatch {
        span: arg.span,
        expected: expected.expected_exact(),
        found: arg.value.ty(),
    }
}

pub struct Nat<'a>(pub &'a BigInt);

impl<'a> FromInstrArg<'a> for Nat<'a> {
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match &arg.value {
            ast::InstrArgValue::Nat(n) => Ok(Self(n)),
            _ => Err(mismatch(arg, ArgType::Nat)),
        }
    }
}

pub struct NatBool(pub bool);

impl FromInstrArg<'_> for NatBool {
    fn from_instr_arg(arg: &ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match &arg.value {
            ast::InstrArgValue::Nat(n) => match n.to_u8() {
                Some(0) => Ok(Self(false)),
                Some(1) => Ok(Self(true)),
                _ => Err(AsmError::OutOfRange(arg.span)),
            },
            _ => Err(mismatch(arg, ArgType::Nat)),
        }
    }
}

pub struct Bytes<'a>(pub &'a [u8]);

impl<'a> FromInstrArg<'a> for Bytes<'a> {
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match &arg.value {
            ast::InstrArgValue::Bytes(bytes) => Ok(Self(bytes)),
            _ => Err(mismatch(arg, ArgType::Bytes)),
        }
    }
}

pub struct Str<'a>(pub &'a str);

impl<'a> FromInstrArg<'a> for Str<'a> {
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match &arg.value {
            ast::InstrArgValue::Str(s) => Ok(Self(s)),
            _ => Err(mismatch(arg, ArgType::String)),
        }
    }
}

/// Byte string or UTF-8 string literal.
pub struct Data<'a>(pub &'a [u8]);

impl<'a> FromInstrArg<'a> for Data<'a> {
    fn from_instr_arg(arg: &'a ast::InstrArg<'_>) -> Result<Self, AsmError> {
        Ok(Self(match Either::<Bytes, Str>::from_instr_arg(arg)? {
            Either::Left(Bytes(bytes)) => bytes,
            Either::Right(Str(s)) => s.as_bytes(),
        }))
    }
}

/// Interop service given by its name.
pub struct Service(pub ServiceCode);

impl FromInstrArg<'_> for Service {
    fn from_instr_arg(arg: &ast::InstrArg<'_>) -> Result<Self, AsmError> {
        match &arg.value {
            ast::InstrArgValue::Service(name) => match InteropService::by_name(name) {
                Some(service) => Ok(Self(service.code)),
                None => Err(AsmError::UnknownService {
                    name: (*name).into(),
                    span: arg.span,
                }),
            },
            _ => Err(mismatch(arg, ArgType::Service)),
        }
    }
}

/// Encodes `int` into exactly `width` little-endian bytes.
pub fn nat_to_le_bytes(int: &BigInt, width: usize, signed: bool) -> Option<Vec<u8>> {
    if signed {
        return int_to_le_bytes(int, width);
    }

    if int.sign() == Sign::Minus || int.bits() > (width * 8) as u64 {
        return None;
    }
    let (_, mut bytes) = int.to_bytes_le();
    bytes.resize(width, 0);
    Some(bytes)
}

fn compute_args_span(first: &ast::InstrArg<'_>, rest: &[ast::InstrArg<'_>]) -> ast::Span {
    let mut res = first.span;
    for arg in rest {
        res.start = std::cmp::min(res.start, arg.span.start);
        res.end = std::cmp::max(res.end, arg.span.end);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_operands() {
        let n = BigInt::from(0x1234);
        assert_eq!(nat_to_le_bytes(&n, 2, false), Some(vec![0x34, 0x12]));
        assert_eq!(nat_to_le_bytes(&n, 1, false), None);
        assert_eq!(nat_to_le_bytes(&BigInt::from(255), 1, false), Some(vec![0xff]));
        assert_eq!(nat_to_le_bytes(&BigInt::from(255), 1, true), None);
        assert_eq!(nat_to_le_bytes(&BigInt::from(-1), 1, false), None);
        assert_eq!(nat_to_le_bytes(&BigInt::from(-1), 2, true), Some(vec![0xff, 0xff]));
    }
}
