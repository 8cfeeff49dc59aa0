//! Lossy Date-column normalisation.
//!
//! The reports print dates as `08-Jan-2019`, `Jan 12 2020`, `15 - Mar -2020`
//! and so on. Normalisation does not parse them; it strips the pieces that
//! vary (whitespace, years, leading zeros, trailing two-digit years) in a
//! fixed order:
//!
//! 1. remove every whitespace run
//! 2. hyphens → spaces
//! 3. remove every four-digit run
//! 4. remove leading zeros, keeping a lone `0`
//! 5. remove a trailing two-digit run
//! 6. trim trailing whitespace
//!
//! Step 2 reintroduces spaces that step 1 removes on a second pass, so
//! `normalize_date` is not idempotent on its own: `"8 Jan"` becomes `"8Jan"`.
//! Two passes reach a fixed point.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());
static RE_TRAILING_TWO_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}$").unwrap());

/// Normalise one Date cell.
pub fn normalize_date(raw: &str) -> String {
    let s: String = raw.split_whitespace().collect();
    let s = s.replace('-', " ");
    let s = RE_FOUR_DIGITS.replace_all(&s, "");
    let s = strip_leading_zeros(&s);
    let s = RE_TRAILING_TWO_DIGITS.replace(s, "");
    s.trim_end().to_string()
}

/// `^0+` unless the zeros are the whole string, in which case one is kept.
fn strip_leading_zeros(s: &str) -> &str {
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        &s[s.len() - 1..]
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_month_year() {
        assert_eq!(normalize_date("08-Jan-2019"), "8 Jan");
        assert_eq!(normalize_date(" 15 - Mar -2020"), "15 Mar");
        assert_eq!(normalize_date("1-Feb-21"), "1 Feb");
    }

    #[test]
    fn month_day_year() {
        // "Jan122020": the first four digits go, then the trailing "20".
        assert_eq!(normalize_date("Jan 12 2020"), "Jan");
    }

    #[test]
    fn zeros() {
        assert_eq!(normalize_date("0"), "0");
        assert_eq!(normalize_date("000"), "0");
        assert_eq!(normalize_date("08"), "8");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn trailing_two_digit_year() {
        assert_eq!(normalize_date("Mar-21"), "Mar");
        assert_eq!(normalize_date("Total"), "Total");
    }

    #[test]
    fn second_pass_reaches_fixed_point() {
        for raw in ["08-Jan-2019", " 15 - Mar -2020", "Jan 12 2020", "Average", "0"] {
            let twice = normalize_date(&normalize_date(raw));
            assert_eq!(normalize_date(&twice), twice, "input {raw:?}");
        }
        assert_eq!(normalize_date(&normalize_date("08-Jan-2019")), "8Jan");
    }
}
