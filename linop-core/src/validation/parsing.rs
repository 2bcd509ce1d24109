//! Parsing utilities for command-line style operator arguments
//!
//! Pure parsing functions with no allocation.

use crate::error::CoreError;
use core::ops::Range;

/// Parse a range string in the format "start:end" or "start-end"
///
/// Used to describe row selections (e.g. `0:3` selects rows 0, 1, 2).
pub fn parse_range(range_str: &str) -> Result<Range<usize>, CoreError> {
    if range_str.is_empty() {
        return Err(CoreError::InvalidRange);
    }

    let separator = range_str
        .find(':')
        .or_else(|| range_str.find('-'))
        .ok_or(CoreError::InvalidRange)?;

    let start = parse_usize(&range_str[..separator])?;
    let end = parse_usize(&range_str[separator + 1..])?;

    if start > end {
        return Err(CoreError::InvalidRange);
    }

    Ok(start..end)
}

/// Parse a usize from a string with error handling
fn parse_usize(s: &str) -> Result<usize, CoreError> {
    if s.is_empty() {
        return Err(CoreError::InvalidRange);
    }

    let mut result: usize = 0;

    for byte in s.bytes() {
        if !byte.is_ascii_digit() {
            return Err(CoreError::InvalidRange);
        }

        let digit = (byte - b'0') as usize;

        if result > (usize::MAX - digit) / 10 {
            return Err(CoreError::ArraySizeOverflow);
        }

        result = result * 10 + digit;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0:10"), Ok(0..10));
        assert_eq!(parse_range("5:15"), Ok(5..15));
        assert_eq!(parse_range("0-10"), Ok(0..10));

        assert_eq!(parse_range(""), Err(CoreError::InvalidRange));
        assert_eq!(parse_range("10:5"), Err(CoreError::InvalidRange));
        assert_eq!(parse_range("abc:def"), Err(CoreError::InvalidRange));
        assert_eq!(parse_range("10"), Err(CoreError::InvalidRange));
        assert_eq!(parse_range("10:"), Err(CoreError::InvalidRange));
        assert_eq!(parse_range(":10"), Err(CoreError::InvalidRange));
    }


    #[test]
    fn test_parse_usize() {
        assert_eq!(parse_usize("0"), Ok(0));
        assert_eq!(parse_usize("999999"), Ok(999999));
        assert_eq!(parse_usize(""), Err(CoreError::InvalidRange));
        assert_eq!(parse_usize("12a"), Err(CoreError::InvalidRange));
        assert_eq!(parse_usize("-123"), Err(CoreError::InvalidRange));
        assert_eq!(
            parse_usize("99999999999999999999999"),
            Err(CoreError::ArraySizeOverflow)
        );
    }
}
