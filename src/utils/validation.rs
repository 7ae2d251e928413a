use validator::Validate;

use crate::error::Result;

pub const MAX_TITLE_LEN: usize = 255;

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate()?;
    Ok(())
}

/// Trims a chat title and falls back to `default` when nothing is left.
pub fn normalize_title(title: Option<&str>, default: &str) -> String {
    let trimmed = title.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return default.to_string();
    }
    trimmed.chars().take(MAX_TITLE_LEN).collect()
}
