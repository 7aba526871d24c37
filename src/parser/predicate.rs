// Predicate parser for command-line filter expressions

use super::lexer::{identifier, string_literal, ws};
use crate::error::ParseError;
use crate::filter::{FilterOperator, FilterPredicate};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::multispace0,
    combinator::{all_consuming, map_res, rest},
    IResult,
};

/// Parse a filter expression.
///
/// Format: `<column> <op> <value>` where `op` is one of `= != > < >= <=`.
/// Column names containing anything besides letters, digits and `_` must be
/// quoted. The value is either a quoted string or the rest of the input,
/// trimmed; it may be empty.
///
/// Examples: `sales > 6`, `"unit price" <= 2.5`, `city = "New York"`
pub fn parse_predicate(input: &str) -> Result<FilterPredicate, ParseError> {
    match predicate(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(_) => Err(ParseError::Syntax {
            input: input.to_string(),
        }),
    }
}

fn predicate(input: &str) -> IResult<&str, FilterPredicate> {
    let (input, column) = ws(alt((string_literal, identifier)))(input)?;
    let (input, operator) = ws(operator)(input)?;
    let (input, value) = alt((all_consuming(ws(string_literal)), bare_value))(input)?;

    Ok((
        input,
        FilterPredicate {
            column: Some(column),
            operator,
            value,
        },
    ))
}

fn operator(input: &str) -> IResult<&str, FilterOperator> {
    // Two-character operators first so `>=` is not read as `>`
    map_res(
        alt((tag(">="), tag("<="), tag("!="), tag("="), tag(">"), tag("<"))),
        str::parse::<FilterOperator>,
    )(input)
}

fn bare_value(input: &str) -> IResult<&str, String> {
    let (input, _) = multispace0(input)?;
    let (input, value) = rest(input)?;
    Ok((input, value.trim_end().to_string()))
}
