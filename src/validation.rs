use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const EMAIL_MAX: usize = 254;

// First character alphanumeric, then letters, digits, underscore, hyphen.
static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("compile username regex"));

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("compile email regex"));

/// Field-keyed validation failures. Checks accumulate here so a response
/// reports every bad field at once, keyed the way the client sent them.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: HashMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// First message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_field_errors(self) -> HashMap<String, String> {
        self.errors
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn check_username(errors: &mut ValidationErrors, username: &str) {
    let len = username.chars().count();
    if len < USERNAME_MIN {
        errors.add("username", format!("must be at least {} characters", USERNAME_MIN));
    } else if len > USERNAME_MAX {
        errors.add("username", format!("must be at most {} characters", USERNAME_MAX));
    } else if !USERNAME_REGEX.is_match(username) {
        errors.add(
            "username",
            "may contain letters, numbers, underscore and hyphen, and must start with a letter or number",
        );
    }
}

pub fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.len() > EMAIL_MAX || !EMAIL_REGEX.is_match(email) {
        errors.add("email", "is not a valid email address");
    }
}

pub fn check_password(errors: &mut ValidationErrors, password: &str) {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        errors.add("password", format!("must be at least {} characters", PASSWORD_MIN));
    } else if len > PASSWORD_MAX {
        errors.add("password", format!("must be at most {} characters", PASSWORD_MAX));
    }
}

/// Required text field, 1..=max characters after trimming.
pub fn check_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.add(field, "must not be empty");
    } else if len > max {
        errors.add(field, format!("must be at most {} characters", max));
    }
}

/// Optional text field, length-capped when present. Empty is fine.
pub fn check_optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.add(field, format!("must be at most {} characters", max));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_usernames() {
        for name in ["wren", "2pac", "snail-mail", "long_tail_99"] {
            let mut errors = ValidationErrors::new();
            check_username(&mut errors, name);
            assert!(errors.is_empty(), "expected {:?} to validate", name);
        }
    }

    #[test]
    fn rejects_bad_usernames() {
        for name in ["ab", "_lead", "-lead", "has space", "emoji😀name"] {
            let mut errors = ValidationErrors::new();
            check_username(&mut errors, name);
            assert!(!errors.is_empty(), "expected {:?} to fail", name);
        }
    }

    #[test]
    fn email_shape_is_checked() {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "gush@gmail.com");
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "nada_neutho");
        assert!(!errors.is_empty());
    }

    #[test]
    fn password_length_bounds() {
        let mut errors = ValidationErrors::new();
        check_password(&mut errors, "short");
        assert!(!errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_password(&mut errors, "long enough indeed");
        assert!(errors.is_empty());
    }

    #[test]
    fn text_bounds_count_characters_not_bytes() {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "body", "ééééé", 5);
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "body", "éééééé", 5);
        assert!(!errors.is_empty());
    }

    #[test]
    fn blank_required_text_fails() {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "body", "   ", 100);
        assert!(!errors.is_empty());
    }

    #[test]
    fn errors_accumulate_and_first_message_sticks() {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, "x");
        check_password(&mut errors, "x");
        errors.add("username", "a different message");

        let map = errors.into_field_errors();
        assert_eq!(map.len(), 2);
        assert!(map["username"].contains("at least"));
    }
}
