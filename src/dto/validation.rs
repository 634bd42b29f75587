//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted for a game.
pub const MAX_NAME_LEN: usize = 200;

/// Validates that a name contains at least one visible character and stays
/// within [`MAX_NAME_LEN`] characters once trimmed.
pub fn validate_game_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Game name must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_LEN {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Game name must be at most {MAX_NAME_LEN} characters (got {length})").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a storefront URL points at an application detail page.
///
/// # Examples
///
/// ```ignore
/// validate_storefront_url("https://store.steampowered.com/app/1145360/Hades/") // Ok
/// validate_storefront_url("https://store.steampowered.com/search")            // Err
/// ```
pub fn validate_storefront_url(url: &str) -> Result<(), ValidationError> {
    if crate::dao::models::app_id_from_url(url).is_none() {
        let mut err = ValidationError::new("storefront_url");
        err.message = Some("Storefront URL must contain `/app/<id>`".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a credential part is non-blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
