// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared name/password validation used by every Device Service before a
//! write hits the persistence layer.

use crate::error::{PanelError, Result};

const MIN_NAME_LENGTH: usize = 4;
const MAX_NAME_LENGTH: usize = 255;
const MIN_PASSWORD_LENGTH: usize = 6;

/// Trims, lowercases, and bounds-checks a display name (light/sunblind/
/// thermometer/username). Returns the normalised value.
pub fn validate_name(name: &str) -> Result<String> {
    let normalised = name.trim().to_lowercase();
    if normalised.is_empty() {
        return Err(PanelError::InvalidInput { reason: "name must not be empty".to_string() });
    }
    if normalised.len() < MIN_NAME_LENGTH {
        return Err(PanelError::InvalidInput {
            reason: format!("name must be at least {MIN_NAME_LENGTH} characters"),
        });
    }
    if normalised.len() > MAX_NAME_LENGTH {
        return Err(PanelError::InvalidInput {
            reason: format!("name must be at most {MAX_NAME_LENGTH} characters"),
        });
    }
    Ok(normalised)
}

/// Trims and bounds-checks a password before hashing.
pub fn validate_password(password: &str) -> Result<String> {
    let trimmed = password.trim().to_string();
    if trimmed.len() < MIN_PASSWORD_LENGTH {
        return Err(PanelError::InvalidInput {
            reason: format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_lowercased() {
        assert_eq!(validate_name("  Kitchen Light  ").unwrap(), "kitchen light");
    }

    #[test]
    fn name_too_short_is_rejected() {
        assert!(validate_name("ab").is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn password_too_short_is_rejected() {
        assert!(validate_password("abc").is_err());
    }
}
