// src/validators.rs
use lazy_static::lazy_static;
use regex::Regex;

pub const USERNAME_MAX_LEN: usize = 150;
pub const NAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const MESSAGE_MAX_LEN: usize = 10_000;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required.".to_string());
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Username must be {} characters or fewer.",
            USERNAME_MAX_LEN
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    Ok(())
}

/// Checks a new password and its confirmation. Returns every problem found.
pub fn validate_new_password(password: &str, confirmation: &str, username: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.is_empty() {
        errors.push("Password is required.".to_string());
        return errors;
    }
    if password != confirmation {
        errors.push("The two password fields didn't match.".to_string());
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LEN
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        errors.push("The password is too similar to the username.".to_string());
    }

    errors
}

/// Email is optional; when present it must look like an address.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(format!(
            "Email address must be {} characters or fewer.",
            EMAIL_MAX_LEN
        ));
    }
    if email.is_empty() || EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("Enter a valid email address.".to_string())
    }
}

pub fn validate_name(label: &str, value: &str) -> Result<(), String> {
    if value.chars().count() > NAME_MAX_LEN {
        Err(format!("{} must be {} characters or fewer.", label, NAME_MAX_LEN))
    } else {
        Ok(())
    }
}

pub fn validate_message_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Message text is required.".to_string());
    }
    if text.chars().count() > MESSAGE_MAX_LEN {
        return Err(format!(
            "Message must be {} characters or fewer.",
            MESSAGE_MAX_LEN
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada.lovelace+1@x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_new_password("correct horse", "correct horse", "ada").is_empty());

        let errors = validate_new_password("1234", "12345", "ada");
        assert_eq!(errors.len(), 3); // mismatch, too short, numeric

        let errors = validate_new_password("adalovelace", "adalovelace", "AdaLovelace");
        assert_eq!(errors, vec!["The password is too similar to the username.".to_string()]);
    }

    #[test]
    fn test_email_is_optional() {
        assert!(validate_email("").is_ok());
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());

        // fits the users.email column exactly
        let longest = format!("{}@example.com", "a".repeat(EMAIL_MAX_LEN - 12));
        assert_eq!(longest.len(), EMAIL_MAX_LEN);
        assert!(validate_email(&longest).is_ok());
        let too_long = format!("a{}", longest);
        assert!(validate_email(&too_long).is_err());
    }

    #[test]
    fn test_message_text() {
        assert!(validate_message_text("hi").is_ok());
        assert!(validate_message_text("   ").is_err());
    }
}
