//! Input checks shared by the HTTP layer, the stores and the legacy importer.

use crate::enums::CATEGORY_PALETTE;
use crate::error::CoreError;
use crate::structs::ProfileUpdate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MAX_WEEKLY_HOURS: Decimal = dec!(168);
pub const MAX_ENTRY_MINUTES: i32 = 24 * 60;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_target_hours(hours: Decimal) -> Result<Decimal, CoreError> {
    if hours < Decimal::ZERO {
        return Err(CoreError::invalid("target_hours", "must not be negative"));
    }
    if hours > MAX_WEEKLY_HOURS {
        return Err(CoreError::invalid(
            "target_hours",
            format!("must be at most {} hours per week", MAX_WEEKLY_HOURS),
        ));
    }
    Ok(hours.round_dp(2))
}

pub fn validate_duration(minutes: i32) -> Result<i32, CoreError> {
    if minutes <= 0 {
        return Err(CoreError::invalid("duration_minutes", "must be positive"));
    }
    if minutes > MAX_ENTRY_MINUTES {
        return Err(CoreError::invalid(
            "duration_minutes",
            format!("must be at most {} minutes", MAX_ENTRY_MINUTES),
        ));
    }
    Ok(minutes)
}

/// Returns the trimmed name.
pub fn validate_category_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid("name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(CoreError::invalid(
            "name",
            format!("must be at most {} characters", MAX_CATEGORY_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// Accepts `#rrggbb`, returned lowercased.
pub fn validate_color(color: &str) -> Result<String, CoreError> {
    let color = color.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(CoreError::invalid("color", "must look like #rrggbb"));
    }
    Ok(color.to_ascii_lowercase())
}

/// Picks a palette color for the n-th user-created category.
pub fn palette_color(index: usize) -> &'static str {
    CATEGORY_PALETTE[index % CATEGORY_PALETTE.len()]
}

pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Returns the trimmed display name.
pub fn validate_display_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid("display_name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(CoreError::invalid(
            "display_name",
            format!("must be at most {} characters", MAX_DISPLAY_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_avatar_url(url: &str) -> Result<String, CoreError> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) || url.contains(char::is_whitespace) {
        return Err(CoreError::invalid("avatar_url", "must be an http(s) URL"));
    }
    Ok(url.to_string())
}

/// Validates every field present in a settings-form update.
pub fn validate_profile_update(update: ProfileUpdate) -> Result<ProfileUpdate, CoreError> {
    Ok(ProfileUpdate {
        display_name: update
            .display_name
            .as_deref()
            .map(validate_display_name)
            .transpose()?,
        avatar_url: update
            .avatar_url
            .as_deref()
            .map(validate_avatar_url)
            .transpose()?,
        onboarding_completed: update.onboarding_completed,
    })
}

/// One `@` with something on both sides. Deliverability is the auth API's call.
pub fn validate_email(email: &str) -> Result<String, CoreError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email.to_ascii_lowercase())
        }
        _ => Err(CoreError::invalid("email", "is not a valid address")),
    }
}

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::invalid(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}
