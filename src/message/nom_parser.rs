//! Nom-based scanners for the leading blocks of an IRC line.
//!
//! Each scanner consumes one space-terminated block (`@tags`, `:prefix`, or
//! the command token) and maps a nom failure onto the matching
//! [`MessageParseError`] variant.

use nom::{
    bytes::complete::{take_till, take_until},
    character::complete::char,
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MessageParseError;

/// `@<block> ` where the block may be empty.
fn tag_block(input: &str) -> IResult<&str, &str> {
    terminated(preceded(char('@'), take_until(" ")), char(' '))(input)
}

/// `:<block> ` where the block may be empty.
fn prefix_block(input: &str) -> IResult<&str, &str> {
    terminated(preceded(char(':'), take_until(" ")), char(' '))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == ' ')(input)
}

/// Split off the tag block of a line starting with `@`.
///
/// Returns the raw block (without `@`) and the remainder after the space.
pub(crate) fn scan_tags(input: &str) -> Result<(&str, &str), MessageParseError> {
    match tag_block(input) {
        Ok((_, "")) => Err(MessageParseError::EmptyTags),
        Ok((rest, block)) => Ok((block, rest)),
        Err(_) => Err(MessageParseError::UnterminatedTags),
    }
}

/// Split off the prefix block of a line starting with `:`.
pub(crate) fn scan_prefix(input: &str) -> Result<(&str, &str), MessageParseError> {
    match prefix_block(input) {
        Ok((_, block)) if block.trim().is_empty() => Err(MessageParseError::EmptyPrefix),
        Ok((rest, block)) => Ok((block, rest)),
        Err(_) => Err(MessageParseError::UnterminatedPrefix),
    }
}

/// Split off the command token.
///
/// Returns the command and everything after it, starting at the separating
/// space (or empty when the command ends the line).
pub(crate) fn scan_command(input: &str) -> Result<(&str, &str), MessageParseError> {
    match word(input) {
        Ok((rest, command)) if !command.trim().is_empty() => Ok((command, rest)),
        _ => Err(MessageParseError::MissingCommand),
    }
}
