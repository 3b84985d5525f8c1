use std::sync::LazyLock;

use regex::Regex;

static POSTAL_CODE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[0-9]{8}$").ok());

/// Check that `code` is a CEP: exactly eight ASCII digits and nothing else.
pub fn is_valid_postal_code(code: &str) -> bool {
    POSTAL_CODE.as_ref().is_some_and(|re| re.is_match(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_eight_digits() {
        assert!(is_valid_postal_code("12345678"));
        assert!(is_valid_postal_code("00000000"));
        assert!(is_valid_postal_code("01310930"));
    }

    #[test]
    fn rejects_malformed_codes() {
        let cases = [
            ("too short", "12345"),
            ("too long", "123456789"),
            ("letters", "1234abcd"),
            ("special characters", "1234!@#$"),
            ("empty", ""),
            ("hyphenated", "01310-930"),
            ("leading space", " 12345678"),
            ("trailing newline", "12345678\n"),
            ("non-ascii digits", "١٢٣٤٥٦٧٨"),
        ];

        for (name, code) in cases {
            assert!(!is_valid_postal_code(code), "{name}: {code:?} should be rejected");
        }
    }

    #[test]
    fn every_eight_digit_number_is_valid() {
        for n in (0..100_000_000u32).step_by(7_919_993) {
            let code = format!("{n:08}");
            assert!(is_valid_postal_code(&code), "{code}");
        }
    }
}
