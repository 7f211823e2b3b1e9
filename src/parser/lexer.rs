// Lexical helpers shared by the session script parsers

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of, one_of},
    combinator::{map, recognize},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Bare name: a letter or underscore, then letters, digits, `_` or `.`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_"), tag(".")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string; `\"` and `\\` are the only escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            many0(alt((preceded(char('\\'), one_of("\\\"")), none_of("\\\"")))),
            char('"'),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )(input)
}

/// A column reference, bare or quoted
pub fn column_name(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("price_usd rest"), Ok((" rest", "price_usd".to_string())));
        assert_eq!(identifier("score.1)"), Ok((")", "score.1".to_string())));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal(r#""unit price""#), Ok(("", "unit price".to_string())));
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
        assert_eq!(string_literal(r#""say \"hi\"""#), Ok(("", "say \"hi\"".to_string())));
        assert!(string_literal(r#""open"#).is_err());
    }

    #[test]
    fn test_column_name_either_form() {
        assert_eq!(column_name("age").unwrap().1, "age");
        assert_eq!(column_name(r#""Annual Income (k$)""#).unwrap().1, "Annual Income (k$)");
    }

    #[test]
    fn test_ws() {
        let mut p = ws(identifier);
        assert_eq!(p("  name  ,"), Ok((",", "name".to_string())));
    }
}
