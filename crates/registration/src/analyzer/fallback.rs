use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)type\s*=\s*["']email["']|name\s*=\s*["'][^"']*(?:email|mail|e-mail)[^"']*["']"#).unwrap()
});

static PASSWORD_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)type\s*=\s*["']password["']|name\s*=\s*["'][^"']*(?:password|pass|pwd)[^"']*["']"#)
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScan {
    pub has_email: bool,
    pub has_password: bool,
}

impl FieldScan {
    pub fn is_form(&self) -> bool {
        self.has_email && self.has_password
    }
}

/// Textual scan for an email-ish input next to a password-ish input.
pub fn scan(html: &str) -> FieldScan {
    FieldScan {
        has_email: EMAIL_INPUT.is_match(html),
        has_password: PASSWORD_INPUT.is_match(html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_inputs_detected() {
        let html = r#"<form><input type="email"><input type='password'></form>"#;
        assert!(scan(html).is_form());
    }

    #[test]
    fn test_named_inputs_detected_case_insensitive() {
        let html = r#"<INPUT NAME="user_Mail"><input name="pwd_confirm">"#;
        let found = scan(html);
        assert!(found.has_email);
        assert!(found.has_password);
    }

    #[test]
    fn test_one_field_is_not_enough() {
        assert!(!scan(r#"<input type="email" name="newsletter_email">"#).is_form());
        assert!(!scan(r#"<input type="password">"#).is_form());
        assert!(!scan("<p>Welcome</p>").is_form());
    }
}
