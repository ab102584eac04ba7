// Call-number normalization
//
// Catalogers spell the same shelf mark several ways ("5A01", "5a1", " 5A1 ").
// The normalized form is only a comparison key; stored call numbers are never
// rewritten with it.

use regex::Regex;
use std::sync::LazyLock;

static SHELF_MARK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([A-Z]+)([0-9]+)$").unwrap());

/// Canonical comparison key for a call number.
///
/// Trims and uppercases; for `digits + letters + digits` drops the leading
/// zeros of the trailing number (`5A01` → `5A1`, `5A00` → `5A0`).
/// Anything else comes back trimmed and uppercased.
pub fn normalize_call_number(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();

    match SHELF_MARK_REGEX.captures(&upper) {
        Some(caps) => {
            let digits = caps[3].trim_start_matches('0');
            let number = if digits.is_empty() { "0" } else { digits };
            format!("{}{}{}", &caps[1], &caps[2], number)
        }
        None => upper,
    }
}

/// True when two call numbers refer to the same shelf mark
pub fn same_call_number(a: &str, b: &str) -> bool {
    normalize_call_number(a) == normalize_call_number(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_collapses() {
        assert_eq!(normalize_call_number("5A01"), "5A1");
        assert_eq!(normalize_call_number("5A1"), "5A1");
        assert_eq!(normalize_call_number("4c002"), "4C2");
    }

    #[test]
    fn test_trim_and_uppercase() {
        assert_eq!(normalize_call_number("  5b13 "), "5B13");
    }

    #[test]
    fn test_all_zero_suffix() {
        assert_eq!(normalize_call_number("5A00"), "5A0");
    }

    #[test]
    fn test_non_matching_shapes_unchanged() {
        assert_eq!(normalize_call_number("5A01(2)"), "5A01(2)");
        assert_eq!(normalize_call_number("ms. 12"), "MS. 12");
        assert_eq!(normalize_call_number("A01"), "A01");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_call_number(""), "");
        assert_eq!(normalize_call_number("   "), "");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["5A01", "4b0010", "5A00", "5A01(2)", "xyz", "", "12AB034"] {
            let once = normalize_call_number(raw);
            assert_eq!(normalize_call_number(&once), once, "not a fixed point: {raw}");
        }
    }

    #[test]
    fn test_same_call_number() {
        assert!(same_call_number("5a01", "5A1"));
        assert!(!same_call_number("5A10", "5A1"));
    }
}
