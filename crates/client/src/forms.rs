//! Form validation and the field-error channel.
//!
//! Registration and login failures are reported per form field so the UI can
//! render each message beside its input. Validation runs entirely locally;
//! a form that fails validation never reaches the network.

use std::collections::BTreeMap;

use serde::Serialize;

use abshine_core::Email;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Message for an empty name.
pub const MSG_NAME_REQUIRED: &str = "El nombre es requerido";
/// Message for a malformed email.
pub const MSG_EMAIL_INVALID: &str = "Email inválido";
/// Message for a too-short password.
pub const MSG_PASSWORD_TOO_SHORT: &str = "Mínimo 6 caracteres";
/// Message for a confirmation mismatch.
pub const MSG_PASSWORDS_DIFFER: &str = "Las contraseñas no coinciden";
/// Message for a rejected login.
pub const MSG_BAD_CREDENTIALS: &str = "Credenciales incorrectas";

/// A form field that can carry an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormField {
    Name,
    Email,
    Password,
    Confirm,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Email => write!(f, "email"),
            Self::Password => write!(f, "password"),
            Self::Confirm => write!(f, "confirm"),
        }
    }
}

/// Field-scoped error messages, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FormField, String>);

impl FieldErrors {
    /// No errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-field error.
    #[must_use]
    pub fn single(field: FormField, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Record a message for `field`, replacing any previous one.
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// The message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Validate a registration form.
///
/// Checks every field and reports all failures at once. On success, returns
/// the parsed email.
///
/// # Errors
///
/// Returns the populated [`FieldErrors`] mapping when any check fails.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<Email, FieldErrors> {
    let mut errors = FieldErrors::new();

    if name.trim().is_empty() {
        errors.insert(FormField::Name, MSG_NAME_REQUIRED);
    }

    let parsed = Email::parse(email.trim());
    if parsed.is_err() {
        errors.insert(FormField::Email, MSG_EMAIL_INVALID);
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        errors.insert(FormField::Password, MSG_PASSWORD_TOO_SHORT);
    }
    if password != confirm_password {
        errors.insert(FormField::Confirm, MSG_PASSWORDS_DIFFER);
    }

    match parsed {
        Ok(email) if errors.is_empty() => Ok(email),
        _ => Err(errors),
    }
}
