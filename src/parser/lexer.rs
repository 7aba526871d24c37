// Lexer utilities for filter expressions

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::recognize,
    sequence::delimited,
    IResult,
};

/// Parse and consume whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse a bare column name
/// Format: [a-zA-Z_][a-zA-Z0-9_]*
pub fn identifier(input: &str) -> IResult<&str, String> {
    let (input, ident) = recognize(take_while1(|c: char| c.is_alphanumeric() || c == '_'))(input)?;

    // Validate first character
    if let Some(first) = ident.chars().next() {
        if !first.is_alphabetic() && first != '_' {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Alpha)));
        }
    }

    Ok((input, ident.to_string()))
}

/// Parse a string literal, possibly empty
/// Format: "..."
pub fn string_literal(input: &str) -> IResult<&str, String> {
    let (input, content) = delimited(
        char('"'),
        take_while(|c| c != '"'),
        char('"'),
    )(input)?;

    Ok((input, content.to_string()))
}
