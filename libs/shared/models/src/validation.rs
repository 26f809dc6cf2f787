use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static TEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9+\-() ]{9,15}$").expect("telephone pattern is valid")
});

static POSTAL_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,5}$").expect("postal code pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field violation found while validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required text: must be present and non-blank after trimming.
    pub fn require(&mut self, field: &str, value: Option<&str>, message: &str) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.add(field, message);
                false
            }
        }
    }

    /// Present-but-blank is an error; absent is not (partial updates).
    pub fn not_blank(&mut self, field: &str, value: Option<&str>, message: &str) {
        if let Some(v) = value {
            if v.trim().is_empty() {
                self.add(field, message);
            }
        }
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if let Some(v) = value {
            if v.trim().chars().count() > max {
                self.add(field, message);
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !v.trim().is_empty() && !is_valid_email(v) {
                self.add(field, "Please add a valid email");
            }
        }
    }

    pub fn tel(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !v.trim().is_empty() && !is_valid_tel(v) {
                self.add(field, "Please add a valid telephone number");
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

pub fn is_valid_tel(value: &str) -> bool {
    TEL_PATTERN.is_match(value.trim())
}

pub fn is_valid_postal_code(value: &str) -> bool {
    POSTAL_CODE_PATTERN.is_match(value.trim())
}
