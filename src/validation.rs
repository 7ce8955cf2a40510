//! Form validation primitives shared by the account, job and application forms.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("This field is required.")]
    Required,
    #[error("Ensure this value has at most {max} characters.")]
    TooLong { max: usize },
    #[error("'{value}' is not one of the available choices.")]
    InvalidChoice { value: String },
    #[error("Enter a valid {expected}.")]
    InvalidFormat { expected: &'static str },
    #[error("A user with that {field} already exists.")]
    AlreadyTaken { field: &'static str },
    #[error("The two password fields didn't match.")]
    Mismatch,
    #[error("This password is too weak: {reason}.")]
    TooWeak { reason: &'static str },
    #[error("Unsupported file, allowed: {allowed}.")]
    UnsupportedFile { allowed: &'static str },
}

/// Field name to errors, in field order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<FieldError>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, error: FieldError) -> Self {
        let mut errors = Self::new();
        errors.add(field, error);
        errors
    }

    pub fn add(&mut self, field: &'static str, error: FieldError) {
        self.fields.entry(field).or_default().push(error);
    }

    /// Moves every error of `other` into `self`.
    pub fn merge(&mut self, other: FormErrors) {
        for (field, errors) in other.fields {
            self.fields.entry(field).or_default().extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[FieldError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str, error: &FieldError) -> bool {
        self.get(field).contains(error)
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Human readable messages keyed by field, ready to be rendered next to the inputs.
    pub fn messages(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.fields
            .iter()
            .map(|(field, errors)| (*field, errors.iter().map(ToString::to_string).collect()))
            .collect()
    }

    /// Trims `value` and checks it is present and at most `max` characters long.
    pub fn required(&mut self, field: &'static str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, FieldError::Required);
        } else {
            self.max_length(field, value, max);
        }
        value.to_string()
    }

    /// Like [`FormErrors::required`], but an empty value is allowed.
    pub fn optional(&mut self, field: &'static str, value: &str, max: usize) -> String {
        let value = value.trim();
        self.max_length(field, value, max);
        value.to_string()
    }

    fn max_length(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, FieldError::TooLong { max });
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .flat_map(|(field, errors)| errors.iter().map(move |e| format!("{}: {}", field, e)))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for FormErrors {}
