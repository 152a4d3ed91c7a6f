//! Form validation.
//!
//! Every check here is pure. A check returns `None` when the input is fine
//! and a user-facing message otherwise. Form validators run every field
//! check so that all problems are reported at once.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use shopdesk_core::{Email, Price, PriceError, Quantity, QuantityError};

use crate::models::{NewCustomer, NewProduct};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Symbols accepted as a password's special character.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+{}[]:;<>,.?~-";

pub const EMAIL_INVALID: &str = "Email is invalid";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";
pub const PASSWORD_TOO_WEAK: &str = "Password must include at least one uppercase letter, one lowercase letter, one number, and one special character";

/// Banner shown above the customer form when any field fails.
pub const CUSTOMER_FORM_INVALID: &str = "All fields are required.";
/// Banner shown above the product form when any field fails.
pub const PRODUCT_FORM_INVALID: &str = "Please provide valid input values for all fields";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern, covered by tests
    Regex::new(r"^[\w.+-]+@[\w.-]+\.[A-Za-z]{2,}$").unwrap()
});

// =============================================================================
// Field checks
// =============================================================================

/// Check that `s` looks like an email address.
#[must_use]
pub fn validate_email(s: &str) -> Option<&'static str> {
    // ASCII word characters only; `\w` alone would admit any Unicode letter.
    if s.is_ascii() && EMAIL_PATTERN.is_match(s) {
        None
    } else {
        Some(EMAIL_INVALID)
    }
}

/// Check password length and character classes.
///
/// A short password only reports the length problem.
#[must_use]
pub fn validate_password(s: &str) -> Option<&'static str> {
    if s.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(PASSWORD_TOO_SHORT);
    }

    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = s.chars().any(|c| c.is_ascii_digit());
    let has_symbol = s.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if has_upper && has_lower && has_digit && has_symbol {
        None
    } else {
        Some(PASSWORD_TOO_WEAK)
    }
}

/// Check that `s` is not blank.
#[must_use]
pub fn validate_required(s: &str, label: &str) -> Option<String> {
    s.trim().is_empty().then(|| format!("{label} is required"))
}

/// Parse a non-negative price from form input.
///
/// # Errors
///
/// Returns a user-facing message for blank, non-numeric or negative input.
pub fn parse_price(s: &str) -> Result<Price, &'static str> {
    if s.trim().is_empty() {
        return Err("Price is required");
    }
    Price::parse(s).map_err(|e| match e {
        PriceError::NotANumber => "Price must be a number",
        PriceError::Negative => "Price cannot be negative",
    })
}

/// Parse a non-negative whole quantity from form input.
///
/// # Errors
///
/// Returns a user-facing message for blank, non-numeric, fractional,
/// negative or oversized input.
pub fn parse_quantity(s: &str) -> Result<Quantity, &'static str> {
    if s.trim().is_empty() {
        return Err("Quantity is required");
    }
    Quantity::parse(s).map_err(|e| match e {
        QuantityError::NotANumber => "Quantity must be a number",
        QuantityError::NotWhole => "Quantity must be a whole number",
        QuantityError::Negative => "Quantity cannot be negative",
        QuantityError::TooLarge => "Quantity is too large",
    })
}

// =============================================================================
// Field errors
// =============================================================================

/// Per-field error messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field`, if there is one.
    pub fn check(&mut self, field: &'static str, message: Option<impl Into<String>>) {
        if let Some(message) = message {
            self.0.insert(field, message.into());
        }
    }

    /// Record a parse result, returning the parsed value on success.
    pub fn parsed<T>(&mut self, field: &'static str, result: Result<T, &'static str>) -> Option<T> {
        result.map_err(|msg| self.check(field, Some(msg))).ok()
    }

    /// The message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Email and password, as posted by the signup and login pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The login page posts the same fields as signup.
pub type LoginForm = SignupForm;

impl SignupForm {
    /// Validate both fields.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_password(&self.password));
        errors
    }
}

/// Customer create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub intent: Option<String>,
}

impl CustomerForm {
    /// Validate every field and build the record to store.
    ///
    /// # Errors
    ///
    /// Returns the collected `FieldErrors` if any field is invalid.
    pub fn validate(&self) -> Result<NewCustomer, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = self.email.trim();
        let email = if email.is_empty() {
            errors.check("email", Some("Email is required"));
            None
        } else {
            errors.check("email", validate_email(email));
            Email::parse(email)
                .map_err(|_| errors.check("email", Some(EMAIL_INVALID)))
                .ok()
        };
        errors.check("firstName", validate_required(&self.first_name, "First name"));
        errors.check("lastName", validate_required(&self.last_name, "Last name"));
        errors.check(
            "phoneNumber",
            validate_required(&self.phone_number, "Phone number"),
        );

        match email {
            Some(email) if errors.is_empty() => Ok(NewCustomer {
                email,
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                phone_number: self.phone_number.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// Product create/edit form. The title is posted as `name`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub intent: Option<String>,
}

impl ProductForm {
    /// Validate every field and build the record to store.
    ///
    /// # Errors
    ///
    /// Returns the collected `FieldErrors` if any field is invalid.
    pub fn validate(&self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("name", validate_required(&self.name, "Name"));
        errors.check(
            "description",
            validate_required(&self.description, "Description"),
        );
        let price = errors.parsed("price", parse_price(&self.price));
        let quantity = errors.parsed("quantity", parse_quantity(&self.quantity));

        match (price, quantity) {
            (Some(price), Some(quantity)) if errors.is_empty() => Ok(NewProduct {
                title: self.name.trim().to_string(),
                description: self.description.trim().to_string(),
                price,
                quantity,
                image: self.image.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_accepts_common_addresses() {
        for email in [
            "a@b.com",
            "user.name+tag@example.co.uk",
            "first_last@sub.domain.io",
            "x-y@d-o.main.org",
        ] {
            assert_eq!(validate_email(email), None, "{email}");
        }
    }

    #[test]
    fn test_validate_email_rejects_non_matching() {
        for email in [
            "",
            "bad",
            "a@b",
            "a@b.c",
            "@b.com",
            "a b@c.com",
            "a@b.c0m",
            "ü@b.com",
            "a@b.com\n",
        ] {
            assert_eq!(validate_email(email), Some(EMAIL_INVALID), "{email:?}");
        }
    }

    #[test]
    fn test_short_password_reports_length_only() {
        assert_eq!(validate_password("short"), Some(PASSWORD_TOO_SHORT));
        assert_eq!(validate_password("Ab1!"), Some(PASSWORD_TOO_SHORT));
        assert_eq!(validate_password("Abc123!"), Some(PASSWORD_TOO_SHORT));
    }

    #[test]
    fn test_password_missing_a_class() {
        assert_eq!(validate_password("abcd123!"), Some(PASSWORD_TOO_WEAK));
        assert_eq!(validate_password("ABCD123!"), Some(PASSWORD_TOO_WEAK));
        assert_eq!(validate_password("Abcdefg!"), Some(PASSWORD_TOO_WEAK));
        assert_eq!(validate_password("Abcd1234"), Some(PASSWORD_TOO_WEAK));
        assert_eq!(validate_password("Abcd123="), Some(PASSWORD_TOO_WEAK));
    }

    #[test]
    fn test_password_with_all_classes() {
        assert_eq!(validate_password("Abcd123!"), None);
        assert_eq!(validate_password("zZ9~zzzz"), None);
        assert_eq!(validate_password("Pass-word1"), None);
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("  ", "Name").as_deref(), Some("Name is required"));
        assert_eq!(validate_required(" x ", "Name"), None);
    }

    #[test]
    fn test_parse_price_and_quantity() {
        assert_eq!(parse_price("12.50").unwrap().to_string(), "12.5");
        assert_eq!(parse_price(""), Err("Price is required"));
        assert_eq!(parse_price("abc"), Err("Price must be a number"));
        assert_eq!(parse_price("-1"), Err("Price cannot be negative"));

        assert_eq!(parse_quantity("7").unwrap().get(), 7);
        assert_eq!(parse_quantity("3.0").unwrap().get(), 3);
        assert_eq!(parse_quantity("1.5"), Err("Quantity must be a whole number"));
        assert_eq!(parse_quantity("-2"), Err("Quantity cannot be negative"));
    }

    #[test]
    fn test_signup_form_reports_every_field() {
        let form = SignupForm {
            email: "bad".to_string(),
            password: "short".to_string(),
        };
        let errors = form.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email"), Some(EMAIL_INVALID));
        assert_eq!(errors.get("password"), Some(PASSWORD_TOO_SHORT));
    }

    #[test]
    fn test_signup_form_valid() {
        let form = SignupForm {
            email: "a@b.com".to_string(),
            password: "Abcd123!".to_string(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_customer_form_trims_and_builds() {
        let form = CustomerForm {
            email: " ada@example.com ".to_string(),
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: "555-0100".to_string(),
            intent: Some("save".to_string()),
        };
        let customer = form.validate().unwrap();
        assert_eq!(customer.email.as_str(), "ada@example.com");
        assert_eq!(customer.first_name, "Ada");
    }

    #[test]
    fn test_customer_form_collects_all_errors() {
        let errors = CustomerForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("phoneNumber"), Some("Phone number is required"));
    }

    #[test]
    fn test_product_form_builds() {
        let form = ProductForm {
            name: "Mug".to_string(),
            description: "Ceramic".to_string(),
            price: "9.99".to_string(),
            quantity: "3".to_string(),
            image: String::new(),
            intent: None,
        };
        let product = form.validate().unwrap();
        assert_eq!(product.title, "Mug");
        assert_eq!(product.quantity.get(), 3);
    }

    #[test]
    fn test_product_form_collects_all_errors() {
        let form = ProductForm {
            price: "-5".to_string(),
            quantity: "2.5".to_string(),
            ..ProductForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("price"), Some("Price cannot be negative"));
        assert_eq!(errors.get("quantity"), Some("Quantity must be a whole number"));
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let errors = SignupForm::default().validate();
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"], EMAIL_INVALID);
    }
}
