//! Boundary validation for request bodies.
//!
//! Collects every failing field before any store access so the client gets the
//! full list in one `{ "errors": [...] }` response.

use crate::utils::error::AppError;
use crate::utils::response::FieldError;

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value must be present and not blank. Returns the trimmed value.
    pub fn required(&mut self, param: &str, value: Option<&str>, msg: &str) -> String {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                self.fail(param, msg);
                String::new()
            }
        }
    }

    pub fn email(&mut self, param: &str, value: Option<&str>, msg: &str) -> String {
        match value.map(str::trim) {
            Some(v) if is_valid_email(v) => v.to_string(),
            _ => {
                self.fail(param, msg);
                String::new()
            }
        }
    }

    /// Value must be present with at least `min` characters. Not trimmed.
    pub fn min_len(&mut self, param: &str, value: Option<&str>, min: usize, msg: &str) -> String {
        match value {
            Some(v) if v.chars().count() >= min => v.to_string(),
            _ => {
                self.fail(param, msg);
                String::new()
            }
        }
    }

    pub fn check(&mut self, param: &str, ok: bool, msg: &str) {
        if !ok {
            self.fail(param, msg);
        }
    }

    pub fn fail(&mut self, param: &str, msg: &str) {
        self.errors.push(FieldError::new(param, msg));
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self.errors))
        }
    }
}

/// Basic address check: one `@`, non-empty local part, dotted domain, no
/// whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !domain.starts_with('.'),
        None => false,
    }
}
