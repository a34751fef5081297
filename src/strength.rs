//! Deterministic password strength classification.
//!
//! Rules are applied in order, first match wins:
//! 1. more than 12 characters with uppercase, lowercase, digit and symbol: strong
//! 2. at least 8 characters with mixed case, or a digit plus a letter: medium
//! 3. everything else (including the empty password): weak

use serde::{Deserialize, Serialize};

/// Strength bucket attached to every canonical credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    #[default]
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }
}

const STRONG_MIN_EXCLUSIVE: usize = 12;
const MEDIUM_MIN: usize = 8;

/// Character classes present in a password.
#[derive(Debug, Default)]
struct CharClasses {
    upper: bool,
    lower: bool,
    digit: bool,
    letter: bool,
    symbol: bool,
}

impl CharClasses {
    fn of(password: &str) -> Self {
        let mut classes = CharClasses::default();
        for c in password.chars() {
            if c.is_uppercase() {
                classes.upper = true;
            }
            if c.is_lowercase() {
                classes.lower = true;
            }
            if c.is_alphabetic() {
                classes.letter = true;
            }
            if c.is_ascii_digit() {
                classes.digit = true;
            }
            if !c.is_alphanumeric() {
                classes.symbol = true;
            }
        }
        classes
    }
}

/// Classify a password. Total and pure: never fails, same input same output.
pub fn classify_password(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let classes = CharClasses::of(password);

    if length > STRONG_MIN_EXCLUSIVE
        && classes.upper
        && classes.lower
        && classes.digit
        && classes.symbol
    {
        return PasswordStrength::Strong;
    }

    let mixed_case = classes.upper && classes.lower;
    let alphanumeric = classes.digit && classes.letter;
    if length >= MEDIUM_MIN && (mixed_case || alphanumeric) {
        return PasswordStrength::Medium;
    }

    PasswordStrength::Weak
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_requires_all_classes_and_length() {
        assert_eq!(classify_password("Tr0ub4dor&3!x"), PasswordStrength::Strong);
        assert_eq!(classify_password("correct-Horse-9-battery"), PasswordStrength::Strong);

        // Exactly 12 characters is not enough for strong
        assert_eq!(classify_password("Tr0ub4dor&3!"), PasswordStrength::Medium);
        // Missing symbol
        assert_eq!(classify_password("Tr0ub4dor3xyz"), PasswordStrength::Medium);
    }

    #[test]
    fn test_medium_rules() {
        assert_eq!(classify_password("abc12345"), PasswordStrength::Medium);
        assert_eq!(classify_password("abcdEFGH"), PasswordStrength::Medium);
        // Digits only, no letter
        assert_eq!(classify_password("12345678"), PasswordStrength::Weak);
        // Long but single class
        assert_eq!(classify_password("abcdefghijklmnop"), PasswordStrength::Weak);
    }

    #[test]
    fn test_weak_rules() {
        assert_eq!(classify_password("abcdef"), PasswordStrength::Weak);
        assert_eq!(classify_password("Ab1!"), PasswordStrength::Weak);
        assert_eq!(classify_password(""), PasswordStrength::Weak);
    }

    #[test]
    fn test_deterministic() {
        for pw in ["", "abc12345", "Tr0ub4dor&3!x", "ÄÖÜäöü12"] {
            assert_eq!(classify_password(pw), classify_password(pw));
        }
        // Non-ASCII letters count as cased letters
        assert_eq!(classify_password("ÄÖÜäöü12"), PasswordStrength::Medium);
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&PasswordStrength::Strong).unwrap();
        assert_eq!(json, "\"strong\"");
    }
}
