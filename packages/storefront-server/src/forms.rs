//! Request forms and their field validation
//!
//! Every form reports all failing fields at once, keyed by field name, so a
//! client can mark each input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use storefront_storage::domain::{CustomerDetails, NewShippingAddress};

const MAX_NAME_LEN: usize = 255;
const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Field name → error messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fold another form's errors in under `prefix.field`
    pub fn merge_prefixed(&mut self, prefix: &str, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0
                .entry(format!("{}.{}", prefix, field))
                .or_default()
                .extend(messages);
        }
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Account forms
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        require(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if username.chars().count() > MAX_USERNAME_LEN {
            errors.add(
                "username",
                format!("Ensure this value has at most {} characters.", MAX_USERNAME_LEN),
            );
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if !self.email.trim().is_empty() && !is_valid_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", "This field is required.");
        } else {
            if self.password1.chars().count() < MIN_PASSWORD_LEN {
                errors.add(
                    "password1",
                    format!(
                        "This password is too short. It must contain at least {} characters.",
                        MIN_PASSWORD_LEN
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password1", "This password is entirely numeric.");
            }
            if !username.is_empty() && self.password1.eq_ignore_ascii_case(username) {
                errors.add("password1", "The password is too similar to the username.");
            }
        }

        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Checkout forms
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        require_name(&mut errors, "first_name", &self.first_name);
        require_name(&mut errors, "last_name", &self.last_name);

        if require(&mut errors, "email", &self.email) && !is_valid_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }
        if require(&mut errors, "phone", &self.phone) && !is_valid_phone(self.phone.trim()) {
            errors.add("phone", "Enter a valid phone number.");
        }
        errors
    }

    pub fn to_details(&self) -> CustomerDetails {
        CustomerDetails {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub city: String,
    pub state: String,
    pub street: String,
}

impl ShippingForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        require_name(&mut errors, "city", &self.city);
        require_name(&mut errors, "state", &self.state);
        require_name(&mut errors, "street", &self.street);
        errors
    }

    pub fn to_address(&self, customer_id: i64, order_id: i64) -> NewShippingAddress {
        NewShippingAddress {
            customer_id,
            order_id,
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            street: self.street.trim().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Field checks
// ═══════════════════════════════════════════════════════════════════════════

/// Returns `true` when the field is present
fn require(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        false
    } else {
        true
    }
}

fn require_name(errors: &mut FormErrors, field: &str, value: &str) {
    if require(errors, field, value) && value.trim().chars().count() > MAX_NAME_LEN {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters.", MAX_NAME_LEN),
        );
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && !domain.starts_with('.'),
        None => false,
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let digits = rest.chars().filter(char::is_ascii_digit).count();
    digits >= 5
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, p1: &str, p2: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: "user@example.com".to_string(),
            password1: p1.to_string(),
            password2: p2.to_string(),
        }
    }

    #[test]
    fn test_registration_ok() {
        assert!(registration("alice", "s3cret-pass", "s3cret-pass")
            .validate()
            .is_empty());
    }

    #[test]
    fn test_registration_password_rules() {
        let errors = registration("alice", "1234", "1234").validate();
        let messages = errors.get("password1").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("too short"));
        assert!(messages[1].contains("entirely numeric"));

        let errors = registration("alice", "s3cret-pass", "other-pass").validate();
        assert!(errors.get("password2").is_some());

        let errors = registration("longusername", "LongUserName", "LongUserName").validate();
        assert!(errors.get("password1").unwrap()[0].contains("similar"));
    }

    #[test]
    fn test_registration_username_rules() {
        let errors = registration("bad name!", "s3cret-pass", "s3cret-pass").validate();
        assert!(errors.get("username").is_some());

        let errors = registration("", "s3cret-pass", "s3cret-pass").validate();
        assert_eq!(errors.get("username").unwrap(), ["This field is required."]);
    }

    #[test]
    fn test_username_is_ascii_only() {
        assert!(registration("Иван", "s3cret-pass", "s3cret-pass")
            .validate()
            .get("username")
            .is_some());
        assert!(registration("ivan.p+shop@x_1-2", "s3cret-pass", "s3cret-pass")
            .validate()
            .is_empty());
    }

    #[test]
    fn test_missing_fields_become_field_errors() {
        let form: RegistrationForm =
            serde_json::from_str(r#"{"username": "bob", "password1": "x"}"#).unwrap();
        let errors = form.validate();
        assert!(errors.get("password2").is_some());
        assert!(errors.get("email").is_none());

        let form: ShippingForm = serde_json::from_str(r#"{"city": "Moscow"}"#).unwrap();
        let errors = form.validate();
        assert!(errors.get("state").is_some());
        assert!(errors.get("street").is_some());
    }

    #[test]
    fn test_customer_form() {
        let form = CustomerForm {
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            email: "ivan@example.ru".to_string(),
            phone: "+7 (999) 123-45-67".to_string(),
        };
        assert!(form.validate().is_empty());
        assert_eq!(form.to_details().phone, "+7 (999) 123-45-67");

        let errors = CustomerForm {
            email: "not-an-email".to_string(),
            phone: "call me".to_string(),
            ..Default::default()
        }
        .validate();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["email", "first_name", "last_name", "phone"]);
    }

    #[test]
    fn test_shipping_form() {
        let errors = ShippingForm {
            city: "Moscow".to_string(),
            state: String::new(),
            street: "x".repeat(300),
        }
        .validate();
        assert!(errors.get("city").is_none());
        assert!(errors.get("state").is_some());
        assert!(errors.get("street").unwrap()[0].contains("at most 255"));
    }

    #[test]
    fn test_email_and_phone_checks() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));

        assert!(is_valid_phone("+79999999999"));
        assert!(is_valid_phone("8 800 555-35-35"));
        assert!(!is_valid_phone("+7"));
        assert!(!is_valid_phone("phone: 12345"));
    }

    #[test]
    fn test_merge_prefixed() {
        let mut all = FormErrors::new();
        let mut shipping = FormErrors::new();
        shipping.add("city", "This field is required.");
        all.merge_prefixed("shipping", shipping);

        assert!(all.get("shipping.city").is_some());
        assert!(all.into_result().is_err());
        assert!(FormErrors::new().into_result().is_ok());
    }
}
