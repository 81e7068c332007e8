//! Profile slugs: lowercase `a-z0-9-`, never all digits so they cannot
//! shadow numeric ids in `/profile/<slug_or_id>`.

pub const SLUG_MIN_LEN: usize = 2;
pub const SLUG_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugError {
    Empty,
    Length,
    Numeric,
}

impl SlugError {
    pub fn message(self) -> String {
        match self {
            Self::Empty => "Slug must contain letters or digits".to_string(),
            Self::Length => {
                format!("Slug must be between {SLUG_MIN_LEN} and {SLUG_MAX_LEN} characters")
            }
            Self::Numeric => "Slug cannot be only digits".to_string(),
        }
    }
}

/// Runs of any other character collapse into a single `-`; leading and
/// trailing separators are dropped.
pub fn normalize_slug(input: &str) -> Result<String, SlugError> {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in input.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return Err(SlugError::Empty);
    }
    if !(SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len()) {
        return Err(SlugError::Length);
    }
    if is_numeric_id(slug) {
        return Err(SlugError::Numeric);
    }
    Ok(slug.to_string())
}

/// `true` when a profile path segment addresses a user id.
pub fn is_numeric_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
