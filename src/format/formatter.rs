//! Display-string rendering
//!
//! Output grammar: `prefix DIGITS [separator PAGE-DIGITS] suffix`, where the
//! digit runs are plain ASCII decimal, optionally left-padded with '0' to the
//! configured width. Padding never truncates a number whose decimal
//! representation is already longer than the width.

use super::config::BatesFormat;
use crate::error::{Error, Result};

/// Render `number` (and `page`, when the format appends one) as a Bates string
///
/// Pure function of its inputs; performs no I/O and consumes nothing from the
/// counter. Negative inputs cannot be rendered and are rejected.
pub fn format_bates(number: i64, page: i64, format: &BatesFormat) -> Result<String> {
    if number < 0 {
        return Err(Error::InvalidBatesNumber(format!(
            "counter value {} is negative",
            number
        )));
    }

    let mut out = String::with_capacity(
        format.prefix.len() + format.suffix.len() + format.digits as usize + 8,
    );
    out.push_str(&format.prefix);
    push_padded(&mut out, number, format.zero_pad, format.digits);

    if format.append_page_number {
        if page < 0 {
            return Err(Error::InvalidBatesNumber(format!(
                "page index {} is negative",
                page
            )));
        }
        out.push_str(&format.page_separator);
        push_padded(&mut out, page, format.zero_pad_page, format.page_digits);
    }

    out.push_str(&format.suffix);
    Ok(out)
}

/// Append `value` as decimal digits, left-padded with '0' to `width` if asked
fn push_padded(out: &mut String, value: i64, zero_pad: bool, width: u32) {
    let digits = value.to_string();
    if zero_pad {
        for _ in digits.len()..width as usize {
            out.push('0');
        }
    }
    out.push_str(&digits);
}
