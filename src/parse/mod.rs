mod error;
mod grammar;

pub use error::ParseError;

use crate::Sexpr;

/// Read every top-level form in a rule source text.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed symbolic-list
/// syntax.
pub fn parse(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    use winnow::Parser;
    grammar::parse_forms
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
