use std::cell::RefCell;

use neovm_asm::Code;
use proc_macro::TokenStream;
use quote::quote;
use quote::ToTokens;
use syn::punctuated::Punctuated;

/// Assembles a listing into a byte string literal at compile time.
///
/// Each string argument is a separate line of the listing.
#[proc_macro]
pub fn neoasm(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input with Punctuated::<syn::LitStr, syn::Token![,]>::parse_terminated);
    compile(input).unwrap_or_else(to_compile_errors).into()
}

fn compile(
    input: Punctuated<syn::LitStr, syn::Token![,]>,
) -> Result<proc_macro2::TokenStream, Vec<syn::Error>> {
    let source = Source::new(input.iter());

    let ctxt = Ctxt::default();

    let code = Code::parse(&source.text);
    if !code.parser_errors().is_empty() {
        for error in code.parser_errors() {
            let lit = error.span().and_then(|span| source.find_lit_by_offset(span.start));
            match lit {
                None => ctxt.error_spanned_by(&input, error),
                Some(lit) => ctxt.error_spanned_by(lit, error),
            }
        }

        print_asm_errors(&input, &source, &code.check(), &ctxt);
        ctxt.check()?;
    }

    let script = match code.try_into_valid() {
        Ok(code) => match code.assemble() {
            Ok(script) => script,
            Err(_) => {
                print_asm_errors(&input, &source, &code.check(), &ctxt);
                ctxt.check()?;
                Vec::new()
            }
        },
        Err(e) => return Err(vec![syn::Error::new_spanned(&input, e)]),
    };

    let script = proc_macro2::Literal::byte_string(&script);
    Ok(quote!( #script ))
}

fn print_asm_errors(
    input: &dyn ToTokens,
    source: &Source,
    errors: &[neovm_asm::AsmError],
    ctxt: &Ctxt,
) {
    for error in errors {
        match error {
            neovm_asm::AsmError::Multiple(errors) => print_asm_errors(input, source, errors, ctxt),
            error if error.can_ignore() => continue,
            _ => match source.find_lit_by_offset(error.span().start) {
                None => ctxt.error_spanned_by(input, error),
                Some(lit) => ctxt.error_spanned_by(lit, error),
            },
        }
    }
}

/// Listing joined from string literals, one line per literal.
struct Source<'a> {
    text: String,
    parts: Vec<(&'a syn::LitStr, usize)>,
}

impl<'a> Source<'a> {
    fn new<I: Iterator<Item = &'a syn::LitStr>>(input: I) -> Self {
        let mut text = String::new();
        let mut parts = Vec::new();

        for part in input {
            let part_text = part.value();
            text.push_str(&part_text);
            text.push('\n');
            parts.push((part, text.len()));
        }

        Self { text, parts }
    }

    fn find_lit_by_offset(&self, offset: usize) -> Option<&syn::LitStr> {
        self.parts
            .iter()
            .find(|(_, end)| offset < *end)
            .map(|(lit, _)| *lit)
    }
}

#[derive(Default)]
struct Ctxt {
    errors: RefCell<Vec<syn::Error>>,
}

impl Ctxt {
    pub fn error_spanned_by<T, M>(&self, object: T, message: M)
    where
        T: ToTokens,
        M: std::fmt::Display,
    {
        self.errors
            .borrow_mut()
            .push(syn::Error::new_spanned(object.into_token_stream(), message));
    }

    pub fn check(&self) -> Result<(), Vec<syn::Error>> {
        let errors = std::mem::take(&mut *self.errors.borrow_mut());
        match errors.len() {
            0 => Ok(()),
            _ => Err(errors),
        }
    }
}

fn to_compile_errors(errors: Vec<syn::Error>) -> proc_macro2::TokenStream {
    let compile_errors = errors.iter().map(syn::Error::to_compile_error);
    quote!(#(#compile_errors)*)
}
