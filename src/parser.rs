//! Column type name parser using nom.
//!
//! Parses the type names the server reports in block headers and that
//! callers use to declare array element types.
//!
//! # Syntax Overview
//!
//! ```text
//! Int8 | Int16 | Int32 | Int64
//! UInt8 | UInt16 | UInt32 | UInt64
//! Float32 | Float64
//! String | FixedString(16)
//! Date | DateTime | DateTime('UTC') | DateTime('+03:00')
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, value, verify},
    sequence::{delimited, preceded},
    IResult,
};

use crate::types::column::MAX_FIXED_STRING_WIDTH;
use crate::types::{Codec, Timezone, TypeError};

/// Parsed type name, before the timezone context is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeName<'a> {
    Plain(Codec),
    FixedString(usize),
    Date,
    DateTime(Option<&'a str>),
}

/// Parse a column type name into its codec.
///
/// `timezone` applies to `Date` and to `DateTime` without an explicit zone.
pub fn parse_type_name(input: &str, timezone: Timezone) -> Result<Codec, TypeError> {
    let trimmed = input.trim();

    let name = match parse_type(trimmed) {
        Ok(("", name)) => name,
        Ok(_) | Err(_) => return Err(TypeError::UnsupportedType(trimmed.to_string())),
    };

    Ok(match name {
        TypeName::Plain(codec) => codec,
        TypeName::FixedString(width) => Codec::FixedString(width),
        TypeName::Date => Codec::Date { timezone },
        TypeName::DateTime(None) => Codec::DateTime {
            timezone,
            is_full: true,
        },
        TypeName::DateTime(Some(zone)) => Codec::DateTime {
            timezone: Timezone::parse(zone)
                .ok_or_else(|| TypeError::UnsupportedTimezone(zone.to_string()))?,
            is_full: true,
        },
    })
}

fn parse_type(input: &str) -> IResult<&str, TypeName<'_>> {
    alt((parse_fixed_string, parse_datetime, parse_date, parse_plain))(input)
}

/// Parse fixed-width numeric types and String.
fn parse_plain(input: &str) -> IResult<&str, TypeName<'_>> {
    map(
        alt((
            value(Codec::Int8, tag("Int8")),
            value(Codec::Int16, tag("Int16")),
            value(Codec::Int32, tag("Int32")),
            value(Codec::Int64, tag("Int64")),
            value(Codec::UInt8, tag("UInt8")),
            value(Codec::UInt16, tag("UInt16")),
            value(Codec::UInt32, tag("UInt32")),
            value(Codec::UInt64, tag("UInt64")),
            value(Codec::Float32, tag("Float32")),
            value(Codec::Float64, tag("Float64")),
            value(Codec::String, tag("String")),
        )),
        TypeName::Plain,
    )(input)
}

/// Parse FixedString(N), 1 <= N <= MAX_FIXED_STRING_WIDTH.
fn parse_fixed_string(input: &str) -> IResult<&str, TypeName<'_>> {
    let (input, _) = tag("FixedString")(input)?;
    let width = verify(map_res(digit1, str::parse::<usize>), |w: &usize| {
        (1..=MAX_FIXED_STRING_WIDTH).contains(w)
    });
    let (input, width) = parens(width)(input)?;
    Ok((input, TypeName::FixedString(width)))
}

/// Parse DateTime or DateTime('zone').
fn parse_datetime(input: &str) -> IResult<&str, TypeName<'_>> {
    let (input, _) = tag("DateTime")(input)?;
    let (input, zone) = opt(parens(quoted))(input)?;
    Ok((input, TypeName::DateTime(zone)))
}

fn parse_date(input: &str) -> IResult<&str, TypeName<'_>> {
    value(TypeName::Date, tag("Date"))(input)
}

/// Parse a single-quoted string.
fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while1(|c: char| c != '\''), char('\''))(input)
}

/// Wrap a parser in parentheses with optional inner whitespace.
fn parens<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(
        preceded(multispace0, char('(')),
        delimited(multispace0, inner, multispace0),
        char(')'),
    )
}
