use crate::utils::error::{LibraryError, Result};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_AUTHOR_LENGTH: usize = 100;
pub const ISBN_LENGTH: usize = 13;
pub const PATRON_ID_LENGTH: usize = 6;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// Trims and checks a required free-text field, returning the trimmed value.
fn validate_text(label: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LibraryError::validation(format!("{} is required.", label)));
    }
    if value.chars().count() > max_len {
        return Err(LibraryError::validation(format!(
            "{} must be less than {} characters.",
            label, max_len
        )));
    }
    Ok(value.to_string())
}

pub fn validate_title(title: &str) -> Result<String> {
    validate_text("Title", title, MAX_TITLE_LENGTH)
}

pub fn validate_author(author: &str) -> Result<String> {
    validate_text("Author", author, MAX_AUTHOR_LENGTH)
}

pub fn validate_isbn(isbn: &str) -> Result<String> {
    let isbn = isbn.trim();
    if !is_digits(isbn, ISBN_LENGTH) {
        return Err(LibraryError::validation("ISBN must be exactly 13 digits."));
    }
    Ok(isbn.to_string())
}

pub fn validate_total_copies(total_copies: i64) -> Result<u32> {
    match u32::try_from(total_copies) {
        Ok(copies) if copies > 0 => Ok(copies),
        _ => Err(LibraryError::validation(
            "Total copies must be a positive integer.",
        )),
    }
}

pub fn validate_patron_id(patron_id: &str) -> Result<()> {
    if !is_digits(patron_id, PATRON_ID_LENGTH) {
        return Err(LibraryError::InvalidPatronId {
            value: patron_id.to_string(),
        });
    }
    Ok(())
}

pub fn validate_book_id(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| LibraryError::InvalidBookId {
            value: value.to_string(),
        })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LibraryError::ConfigError {
            field: field_name.to_string(),
            message: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(LibraryError::ConfigError {
            field: field_name.to_string(),
            message: format!("Value {} must be between {} and {}", value, min, max),
        });
    }
    Ok(())
}
