use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, opt, preceded, repeat};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::Sexpr;

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            (';', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Atoms ------------------------------------------------------------------

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ';')
}

/// `None` if the token is not numeric, `Some(None)` if it looks numeric but
/// does not fit.
fn integer_literal(token: &str) -> Option<Option<i64>> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let radix = if digits.len() > 1 && digits.starts_with('0') {
        8
    } else {
        10
    };
    let magnitude = i64::from_str_radix(digits, radix).ok();
    Some(magnitude.map(|m| if negative { -m } else { m }))
}

fn atom(input: &mut &str) -> ModalResult<Sexpr> {
    let token = take_while(1.., is_atom_char).parse_next(input)?;
    match integer_literal(token) {
        Some(Some(n)) => Ok(Sexpr::Integer(n)),
        Some(None) => Err(ErrMode::from_input(input).cut()),
        None => Ok(Sexpr::symbol(token)),
    }
}

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any).parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

// -- Lists ------------------------------------------------------------------

/// Deepest list nesting accepted in rule source.
pub const MAX_DEPTH: usize = 256;

/// Consume a lone `.` separating the tail of a dotted list.
fn dot_separator(input: &mut &str) -> bool {
    let mut chars = input.chars();
    if chars.next() == Some('.') && !chars.next().is_some_and(is_atom_char) {
        *input = &input[1..];
        true
    } else {
        false
    }
}

fn list(input: &mut &str, depth: usize) -> ModalResult<Sexpr> {
    '('.parse_next(input)?;
    if depth >= MAX_DEPTH {
        return Err(ErrMode::from_input(input).cut());
    }
    let mut items = Vec::new();
    loop {
        ws.parse_next(input)?;
        if opt(')').parse_next(input)?.is_some() {
            return Ok(Sexpr::list(items));
        }
        if dot_separator(input) {
            if items.is_empty() {
                return Err(ErrMode::from_input(input).cut());
            }
            let tail = cut_err(|i: &mut &str| datum(i, depth + 1)).parse_next(input)?;
            ws.parse_next(input)?;
            cut_err(')')
                .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
                .parse_next(input)?;
            return Ok(Sexpr::list_with_tail(items, tail));
        }
        let item = cut_err(|i: &mut &str| datum(i, depth + 1))
            .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
            .parse_next(input)?;
        items.push(item);
    }
}

fn datum(input: &mut &str, depth: usize) -> ModalResult<Sexpr> {
    ws.parse_next(input)?;
    alt((
        |i: &mut &str| list(i, depth),
        string_literal.map(Sexpr::from),
        atom,
    ))
    .context(StrContext::Expected(StrContextValue::Description("datum")))
    .parse_next(input)
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_forms(input: &mut &str) -> ModalResult<Vec<Sexpr>> {
    let forms: Vec<Sexpr> = repeat(0.., preceded(ws, |i: &mut &str| datum(i, 0))).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(forms)
}
