//! Input normalization and password hashing.

use crate::error::{HouseholdError, Result};
use crate::state::Quantity;
use sha2::{Digest, Sha256};

/// Hash a family password.
///
/// SHA-256 of the trimmed password, lowercase hex. Unsalted, so the same
/// password always yields the same digest on every device.
///
/// # Examples
///
/// ```
/// # use homelist_household::utils::hash_password;
/// assert_eq!(hash_password(" secret1 "), hash_password("secret1"));
/// assert_eq!(hash_password("secret1").len(), 64);
/// ```
#[must_use]
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.trim().as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Return the trimmed value, or a validation error carrying `message` when
/// nothing is left after trimming.
///
/// # Errors
///
/// Returns [`HouseholdError::Validation`] for blank input.
pub fn require<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HouseholdError::Validation(message.to_string()));
    }
    Ok(trimmed)
}

/// Message for a family name that cannot be used as a document id.
pub const INVALID_FAMILY_NAME: &str = "Family names cannot contain \"/\" or be \".\" or \"..\".";

/// Trim a family name and check it can serve as a single document id.
///
/// # Errors
///
/// Returns [`HouseholdError::Validation`] with `missing` for blank input, or
/// with [`INVALID_FAMILY_NAME`] for a name containing `/` or consisting of
/// `.` or `..`.
pub fn family_name<'a>(value: &'a str, missing: &str) -> Result<&'a str> {
    let name = require(value, missing)?;
    if name.contains('/') || name == "." || name == ".." {
        return Err(HouseholdError::Validation(INVALID_FAMILY_NAME.to_string()));
    }
    Ok(name)
}

/// Interpret quantity input: a number when it parses as a finite number,
/// otherwise the trimmed text.
#[must_use]
pub fn parse_quantity(input: &str) -> Quantity {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => Quantity::Number(number),
        _ => Quantity::Text(trimmed.to_string()),
    }
}
