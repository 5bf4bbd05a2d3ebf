// ABOUTME: Phone number validation for the login prompt.
// ABOUTME: Accepts 10 to 15 digits with an optional leading plus and always returns the plus form.

use crate::error::AuthError;

/// Validate user input and normalize it to `+<digits>`.
pub fn parse_phone(input: &str) -> Result<String, AuthError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let valid = (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(AuthError::InvalidPhone(trimmed.to_string()));
    }
    Ok(format!("+{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_leading_plus() {
        assert_eq!(parse_phone("+15551234567").unwrap(), "+15551234567");
    }

    #[test]
    fn adds_missing_plus_and_trims() {
        assert_eq!(parse_phone("  15551234567\n").unwrap(), "+15551234567");
    }

    #[test]
    fn length_bounds() {
        assert!(parse_phone("123456789").is_err());
        assert!(parse_phone("1234567890").is_ok());
        assert!(parse_phone("123456789012345").is_ok());
        assert!(parse_phone("1234567890123456").is_err());
    }

    #[test]
    fn rejects_separators_and_letters() {
        for input in ["+1 555 123 4567", "+1-555-123-4567", "++15551234567", "phone", ""] {
            assert!(
                matches!(parse_phone(input), Err(AuthError::InvalidPhone(_))),
                "{input:?} should be rejected"
            );
        }
    }
}
