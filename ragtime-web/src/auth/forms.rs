//! Form payloads and validation for the auth flows

use serde::Deserialize;

/// Login form fields
///
/// Checkboxes arrive as `on` when ticked and are absent otherwise, hence
/// `Option<String>` rather than bool.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.remember_me.is_some()
    }
}

/// Registration form fields
#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password2: String,
}

impl RegistrationForm {
    /// Validate field formats; uniqueness is checked against the database
    /// by the handler. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.email.is_empty() || self.email.len() > 64 || !self.email.contains('@') {
            return Err("Please enter a valid email address.".to_string());
        }

        let mut chars = self.username.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !starts_with_letter || !rest_valid || self.username.len() > 64 {
            return Err(
                "Usernames must start with a letter and contain only letters, numbers, dots or underscores."
                    .to_string(),
            );
        }

        if self.password.len() < 8 {
            return Err("Passwords must be at least 8 characters.".to_string());
        }

        if self.password != self.password2 {
            return Err("Passwords must match.".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, username: &str, password: &str, password2: &str) -> RegistrationForm {
        RegistrationForm {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(form("joplin@example.com", "scott.joplin", "maple1899", "maple1899")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_bad_email_rejected() {
        assert!(form("not-an-email", "scott", "maple1899", "maple1899").validate().is_err());
        assert!(form("", "scott", "maple1899", "maple1899").validate().is_err());
    }

    #[test]
    fn test_bad_username_rejected() {
        assert!(form("a@b.com", "1scott", "maple1899", "maple1899").validate().is_err());
        assert!(form("a@b.com", "sc ott", "maple1899", "maple1899").validate().is_err());
        assert!(form("a@b.com", "", "maple1899", "maple1899").validate().is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(form("a@b.com", "scott", "short", "short").validate().is_err());
        assert!(form("a@b.com", "scott", "maple1899", "different").validate().is_err());
    }

    #[test]
    fn test_remember_me_checkbox() {
        let ticked = LoginForm {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
            remember_me: Some("on".to_string()),
            next: None,
        };
        assert!(ticked.remember());

        let unticked = LoginForm { remember_me: None, ..ticked };
        assert!(!unticked.remember());
    }
}
