//! Input rules shared by signup, tag creation and manual lookup.
//!
//! Every check returns the normalized value on success so callers store
//! exactly what was validated.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Field, Result};

/// Fewest digits a phone number may have.
pub const MIN_PHONE_DIGITS: usize = 9;

/// Most digits a phone number may have.
pub const MAX_PHONE_DIGITS: usize = 15;

/// Highest grade a tag may carry.
pub const MAX_GRADE: u32 = 12;

/// Shortest accepted password.
pub const MIN_SECRET_LEN: usize = 6;

/// Length of a tag code.
pub const CODE_LEN: usize = 6;

static NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]").expect("non-digit pattern is valid"));

static GRADE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("grade pattern is valid"));

static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]$").expect("class pattern is valid"));

/// Strip everything but ASCII digits.
#[must_use]
pub fn digits_only(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Require a non-blank value, returned trimmed.
///
/// # Errors
///
/// Returns a validation error for `field` if the value is blank.
pub fn required(field: Field, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

/// Check that a phone number has a plausible digit count.
///
/// The number is returned trimmed but otherwise as entered; only the digit
/// count is checked.
///
/// # Errors
///
/// Returns a validation error for `field` if the number has fewer than
/// [`MIN_PHONE_DIGITS`] or more than [`MAX_PHONE_DIGITS`] digits.
pub fn phone(field: Field, raw: &str) -> Result<String> {
    let count = digits_only(raw).len();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&count) {
        return Err(Error::validation(
            field,
            format!(
                "must contain between {MIN_PHONE_DIGITS} and {MAX_PHONE_DIGITS} digits, found {count}"
            ),
        ));
    }
    Ok(raw.trim().to_string())
}

/// Parse a grade into its canonical decimal form.
///
/// # Errors
///
/// Returns a validation error unless the input is a whole number from 0 to
/// [`MAX_GRADE`].
pub fn grade(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let out_of_range =
        || Error::validation(Field::Grade, format!("must be a number between 0 and {MAX_GRADE}"));

    if !GRADE_PATTERN.is_match(trimmed) {
        return Err(out_of_range());
    }
    match trimmed.parse::<u32>() {
        Ok(value) if value <= MAX_GRADE => Ok(value.to_string()),
        _ => Err(out_of_range()),
    }
}

/// Parse a grade already in storage, tolerating legacy spellings.
#[must_use]
pub fn grade_value(stored: &str) -> Option<u32> {
    stored.trim().parse().ok()
}

/// Normalize a class section to a single uppercase letter.
///
/// # Errors
///
/// Returns a validation error unless the input is exactly one letter A-Z.
pub fn class_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !CLASS_PATTERN.is_match(trimmed) {
        return Err(Error::validation(
            Field::ClassName,
            "must be a single letter from A to Z",
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Check password length.
///
/// # Errors
///
/// Returns a validation error if the password is shorter than
/// [`MIN_SECRET_LEN`] characters.
pub fn secret(raw: &str) -> Result<()> {
    if raw.chars().count() < MIN_SECRET_LEN {
        return Err(Error::validation(
            Field::Secret,
            format!("must be at least {MIN_SECRET_LEN} characters"),
        ));
    }
    Ok(())
}

/// Normalize a manually typed tag code.
///
/// # Errors
///
/// Returns a validation error unless the trimmed input is exactly
/// [`CODE_LEN`] characters long.
pub fn code(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() != CODE_LEN {
        return Err(Error::validation(
            Field::Code,
            format!("must be {CODE_LEN} characters"),
        ));
    }
    Ok(trimmed.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+27 (82) 765-4321"), "27827654321");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required(Field::Name, "  Jane ").unwrap(), "Jane");
        let err = required(Field::Surname, "   ").unwrap_err();
        assert_eq!(err.field(), Some(Field::Surname));
    }

    #[test]
    fn test_phone_bounds() {
        assert!(phone(Field::Phone, "08212345").is_err());
        assert!(phone(Field::Phone, "082123456").is_ok());
        assert!(phone(Field::Phone, "123456789012345").is_ok());
        assert!(phone(Field::Phone, "1234567890123456").is_err());
    }

    #[test]
    fn test_phone_counts_digits_only() {
        let value = phone(Field::ParentPhone, " 082-765-4321 ").unwrap();
        assert_eq!(value, "082-765-4321");

        let err = phone(Field::ParentPhone, "phone: 12-34").unwrap_err();
        assert_eq!(err.field(), Some(Field::ParentPhone));
    }

    #[test]
    fn test_phone_ignores_non_ascii_digits() {
        assert_eq!(digits_only("١٢٣٤٥"), "");
        assert_eq!(digits_only("082٣765 4321"), "0827654321");

        let err = phone(Field::ParentPhone, "١٢٣٤٥").unwrap_err();
        assert_eq!(err.field(), Some(Field::ParentPhone));
        assert!(phone(Field::Phone, "١٢٣٤٥٦٧٨٩").is_err());
    }

    #[test]
    fn test_grade_rejects_non_ascii_digits() {
        assert!(grade("٥").is_err());
    }

    #[test]
    fn test_grade_accepts_range() {
        assert_eq!(grade("0").unwrap(), "0");
        assert_eq!(grade("12").unwrap(), "12");
        assert_eq!(grade(" 05 ").unwrap(), "5");
    }

    #[test]
    fn test_grade_rejects_out_of_range() {
        assert!(grade("13").is_err());
        assert!(grade("-1").is_err());
        assert!(grade("5a").is_err());
        assert!(grade("").is_err());
        assert!(grade("99999999999999999999").is_err());
        assert_eq!(grade("13").unwrap_err().field(), Some(Field::Grade));
    }

    #[test]
    fn test_grade_value() {
        assert_eq!(grade_value("05"), Some(5));
        assert_eq!(grade_value("x"), None);
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("b").unwrap(), "B");
        assert_eq!(class_name(" Z ").unwrap(), "Z");
        assert!(class_name("AB").is_err());
        assert!(class_name("1").is_err());
        assert!(class_name("").is_err());
        assert!(class_name("é").is_err());
    }

    #[test]
    fn test_secret_length() {
        assert!(secret("abc12").is_err());
        assert!(secret("abc123").is_ok());
    }

    #[test]
    fn test_code() {
        assert_eq!(code(" a4b1c9 ").unwrap(), "A4B1C9");
        assert!(code("A4B1C").is_err());
        assert!(code("A4B1C9X").is_err());
        assert_eq!(code("").unwrap_err().field(), Some(Field::Code));
    }
}
