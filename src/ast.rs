use chumsky::prelude::*;
use chumsky::text::TextExpected;
use chumsky::util::MaybeRef;
use chumsky::DefaultExpected;
use num_bigint::BigInt;
use num_traits::Num;

pub type Span = SimpleSpan<usize>;

pub fn parse(s: &'_ str) -> ParseResult<Code<'_>, ParserError> {
    parser().parse(s)
}

#[derive(Debug, Clone)]
pub struct Code<'a> {
    pub span: Span,
    pub items: Vec<Instr<'a>>,
}

#[derive(Debug, Clone)]
pub struct Instr<'a> {
    pub span: Span,
    pub ident_span: Span,
    pub ident: &'a str,
    pub args: Vec<InstrArg<'a>>,
}

#[derive(Debug, Clone)]
pub struct InstrArg<'a> {
    pub span: Span,
    pub value: InstrArgValue<'a>,
}

#[derive(Debug, Clone)]
pub enum InstrArgValue<'a> {
    Nat(BigInt),
    Bytes(Vec<u8>),
    Str(String),
    Service(&'a str),
    Invalid,
}

type ParserExtra = extra::Full<ParserError, (), ()>;

fn parser<'a>() -> impl Parser<'a, &'a str, Code<'a>, ParserExtra> {
    trivia()
        .ignore_then(
            instr()
                .then_ignore(trivia())
                .recover_with(skip_then_retry_until(any().ignored(), text::newline()))
                .repeated()
                .collect(),
        )
        .map_with(|items, e| Code {
            span: e.span(),
            items,
        })
}

fn instr<'a>() -> impl Parser<'a, &'a str, Instr<'a>, ParserExtra> + Clone {
    fn compute_min_span(ident_span: Span, args: &[InstrArg<'_>]) -> Span {
        let mut res = ident_span;
        for arg in args {
            res.start = std::cmp::min(res.start, arg.span.start);
            res.end = std::cmp::max(res.end, arg.span.end);
        }
        res
    }

    let args = instr_arg()
        .separated_by(
            just(',')
                .padded_by(trivia())
                .recover_with(skip_then_retry_until(
                    any().ignored(),
                    choice((just(',').ignored(), text::newline())),
                )),
        )
        .collect::<Vec<_>>();

    instr_ident()
        .map_with(|ident, e| (ident, e.span()))
        .then_ignore(text::inline_whitespace())
        .then(args)
        .map(|((ident, ident_span), args)| Instr {
            span: compute_min_span(ident_span, &args),
            ident,
            ident_span,
            args,
        })
}

fn instr_arg<'a>() -> impl Parser<'a, &'a str, InstrArg<'a>, ParserExtra> + Clone {
    let until_next_arg = any()
        .filter(|&c: &char| !c.is_whitespace() && !",/".contains(c))
        .repeated()
        .at_least(1);

    choice((
        nat().map(InstrArgValue::Nat),
        bytes().map(|bytes| {
            bytes
                .map(InstrArgValue::Bytes)
                .unwrap_or(InstrArgValue::Invalid)
        }),
        string().map(|s| s.map(InstrArgValue::Str).unwrap_or(InstrArgValue::Invalid)),
        service().map(InstrArgValue::Service),
    ))
    .recover_with(via_parser(until_next_arg.map(|_| InstrArgValue::Invalid)))
    .map_with(|value, e| InstrArg {
        value,
        span: e.span(),
    })
}

/// Whitespace and `//` comments.
fn trivia<'a>() -> impl Parser<'a, &'a str, (), ParserExtra> + Clone {
    let comment = just("//")
        .then(any().and_is(text::newline().not()).repeated())
        .ignored();

    choice((comment, text::whitespace().at_least(1)))
        .repeated()
        .ignored()
}

fn instr_ident<'a>() -> impl Parser<'a, &'a str, &'a str, ParserExtra> + Clone {
    any()
        .filter(|&c: &char| !c.is_whitespace() && !",\"/{}".contains(c))
        .repeated()
        .at_least(1)
        .to_slice()
        .validate(|ident: &str, e, emitter| {
            let invalid_char = 'char: {
                let mut chars = ident.chars();
                match chars.next() {
                    Some(first) if first.is_ascii_uppercase() => {}
                    first => break 'char first,
                }

                for c in chars {
                    if !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
                        break 'char Some(c);
                    }
                }

                return ident;
            };

            emitter.emit(ParserError::ExpectedFound {
                span: e.span(),
                found: invalid_char,
            });

            "#INVALID#"
        })
}

fn nat<'a>() -> impl Parser<'a, &'a str, BigInt, ParserExtra> + Clone {
    fn parse_int(mut s: &str, radix: u32, span: Span) -> Result<BigInt, ParserError> {
        if !s.is_empty() {
            s = s.trim_start_matches('0');
            if s.is_empty() {
                s = "0";
            }
        }

        match BigInt::from_str_radix(s, radix) {
            Ok(n) => Ok(n),
            Err(e) => Err(ParserError::InvalidInt { span, inner: e }),
        }
    }

    let num_slice = any()
        .filter(|&c: &char| !c.is_whitespace() && !",/{}".contains(c))
        .repeated()
        .at_least(1)
        .to_slice();

    let number = choice((
        just("0x")
            .ignore_then(num_slice)
            .try_map(|s, span| parse_int(s, 16, span)),
        just("0b")
            .ignore_then(num_slice)
            .try_map(|s, span| parse_int(s, 2, span)),
        any()
            .filter(|c: &char| c.is_ascii_digit())
            .rewind()
            .ignore_then(num_slice.try_map(|s, span| parse_int(s, 10, span))),
    ));

    choice((
        just('-').ignore_then(number).map(std::ops::Neg::neg),
        number,
    ))
    .then_ignore(empty().and_is(choice((
        end(),
        text::whitespace().at_least(1),
        one_of(",/").ignored(),
    ))))
}

/// `x{hex}` byte string.
fn bytes<'a>() -> impl Parser<'a, &'a str, Option<Vec<u8>>, ParserExtra> + Clone {
    let content_recovery = any()
        .filter(|&c: &char| c != '}' && !c.is_whitespace())
        .repeated();

    let braces_recovery = none_of("}\n").repeated().then(just('}').or_not());

    just("x{")
        .ignore_then(
            any()
                .filter(|&c: &char| c != '}' && !c.is_whitespace())
                .repeated()
                .to_slice()
                .try_map(|s: &str, span| match hex::decode(s) {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) => Err(ParserError::InvalidBytes { span, inner: e }),
                })
                .recover_with(via_parser(content_recovery.map(|_| None))),
        )
        .then(
            just('}')
                .map(|_| true)
                .recover_with(via_parser(braces_recovery.map(|_| false))),
        )
        .map(|(mut t, valid)| {
            if !valid {
                t = None;
            }
            t
        })
}

/// Quoted UTF-8 string with `\\`, `\"`, `\n`, `\t`, `\r` and `\0` escapes.
fn string<'a>() -> impl Parser<'a, &'a str, Option<String>, ParserExtra> + Clone {
    let escape = just('\\').ignore_then(any().try_map(|c: char, span| match c {
        '\\' => Ok('\\'),
        '"' => Ok('"'),
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        '0' => Ok('\0'),
        c => Err(ParserError::InvalidEscape { span, found: c }),
    }));

    let quote_recovery = none_of("\n").repeated();

    just('"')
        .ignore_then(
            choice((none_of("\\\"\n"), escape))
                .repeated()
                .collect::<String>(),
        )
        .then(
            just('"')
                .map(|_| true)
                .recover_with(via_parser(quote_recovery.map(|_| false))),
        )
        .map(|(s, valid)| valid.then_some(s))
}

/// Dotted interop service name, e.g. `System.Runtime.Log`.
fn service<'a>() -> impl Parser<'a, &'a str, &'a str, ParserExtra> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .rewind()
        .ignore_then(
            any()
                .filter(|&c: &char| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .filter(|name: &&str| name.contains('.'))
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ParserError {
    #[error("unexpected character found: {found:?}")]
    ExpectedFound { span: Span, found: Option<char> },
    #[error("invalid int: {inner}")]
    InvalidInt {
        span: Span,
        inner: num_bigint::ParseBigIntError,
    },
    #[error("invalid bytes: {inner}")]
    InvalidBytes {
        span: Span,
        inner: hex::FromHexError,
    },
    #[error("unknown escape sequence: \\{found}")]
    InvalidEscape { span: Span, found: char },
    #[error("unknown error")]
    UnknownError,
}

impl ParserError {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::ExpectedFound { span, .. }
            | Self::InvalidInt { span, .. }
            | Self::InvalidBytes { span, .. }
            | Self::InvalidEscape { span, .. } => Some(*span),
            Self::UnknownError => None,
        }
    }
}

impl<'a> chumsky::error::LabelError<'a, &'a str, MaybeRef<'a, char>> for ParserError {
    fn expected_found<Iter: IntoIterator<Item = MaybeRef<'a, char>>>(
        _: Iter,
        found: Option<MaybeRef<'a, char>>,
        span: Span,
    ) -> Self {
        Self::ExpectedFound {
            span,
            found: found.as_deref().copied(),
        }
    }
}

impl<'a> chumsky::error::LabelError<'a, &'a str, TextExpected<'a, &'a str>> for ParserError {
    fn expected_found<Iter: IntoIterator<Item = TextExpected<'a, &'a str>>>(
        _: Iter,
        found: Option<MaybeRef<'a, char>>,
        span: Span,
    ) -> Self {
        Self::ExpectedFound {
            span,
            found: found.as_deref().copied(),
        }
    }
}

impl<'a> chumsky::error::LabelError<'a, &'a str, DefaultExpected<'a, char>> for ParserError {
    fn expected_found<Iter: IntoIterator<Item = DefaultExpected<'a, char>>>(
        _: Iter,
        found: Option<MaybeRef<'a, char>>,
        span: Span,
    ) -> Self {
        Self::ExpectedFound {
            span,
            found: found.as_deref().copied(),
        }
    }
}

impl<'a> chumsky::error::Error<'a, &'a str> for ParserError {
    fn merge(self, _: Self) -> Self {
        self
    }
}
