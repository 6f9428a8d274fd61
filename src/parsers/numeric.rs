/// Parses a price-like field into integer minor units via fixed-point
/// multiplication by 100 with half-away-from-zero rounding (§4.1).
///
/// Accepts both `.` and `,` as the decimal separator, and treats a bare
/// leading comma/dot (e.g. `,69`) as a zero integer part (`0.69`). Works
/// entirely on the decimal digits rather than through `f64` so rounding
/// is exact regardless of how many fractional digits the source has.
pub fn parse_minor_units(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = normalize_decimal(trimmed)?;
    let negative = normalized.starts_with('-');
    let unsigned = normalized.trim_start_matches('-');

    let (int_str, frac_str) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    let int_str = if int_str.is_empty() { "0" } else { int_str };
    let int_part: i64 = int_str.parse().ok()?;

    let mut frac_padded = frac_str.to_string();
    while frac_padded.len() < 3 {
        frac_padded.push('0');
    }
    let cents: i64 = frac_padded[0..2].parse().ok()?;
    let round_up = frac_padded.as_bytes()[2] >= b'5';

    let mut minor = int_part.checked_mul(100)?.checked_add(cents)?;
    if round_up {
        minor += 1;
    }
    if negative {
        minor = -minor;
    }
    Some(minor)
}

/// Rewrites a locale-ambiguous number like `1.234,56` or `12,99` or `,69`
/// into `sign? digits ('.' digits)?` form, by treating the *last*
/// separator as the decimal point and stripping any earlier separators
/// as thousands grouping.
fn normalize_decimal(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let decimal_pos = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(d), None) => Some(d),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    };

    let mut result = String::with_capacity(cleaned.len());
    for (i, ch) in cleaned.char_indices() {
        match ch {
            '.' | ',' => {
                if Some(i) == decimal_pos {
                    result.push('.');
                }
                // earlier separators are thousands grouping: dropped.
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => result.push(c),
            _ => return None,
        }
    }

    if result.is_empty() || result == "-" || result == "+" {
        return None;
    }

    let result = if let Some(rest) = result.strip_prefix('.') {
        format!("0.{rest}")
    } else if let Some(rest) = result.strip_prefix("-.") {
        format!("-0.{rest}")
    } else {
        result
    };

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_comma_decimal() {
        assert_eq!(parse_minor_units("12,99"), Some(1299));
    }

    #[test]
    fn encodes_bare_trailing_fraction() {
        assert_eq!(parse_minor_units(",69"), Some(69));
    }

    #[test]
    fn encodes_dot_decimal() {
        assert_eq!(parse_minor_units("1.50"), Some(150));
    }

    #[test]
    fn encodes_thousands_grouped_value() {
        assert_eq!(parse_minor_units("1.234,56"), Some(123456));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert_eq!(parse_minor_units("n/a"), None);
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_minor_units("   "), None);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(parse_minor_units("1.005"), Some(101));
        assert_eq!(parse_minor_units("-1.005"), Some(-101));
    }
}
