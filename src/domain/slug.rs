//! Slug helpers.
//!
//! Slugs are the lookup key for every detail endpoint, so records must carry
//! URL-safe values: lowercase ASCII letters and digits separated by single
//! hyphens. Tags have no slug of their own and are slugified on demand.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Whether `value` is already in canonical slug form.
pub fn is_url_safe_slug(value: &str) -> bool {
    !value.is_empty()
        && value.split('-').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalizes_text() {
        assert_eq!(derive_slug("Motion Design").expect("slug"), "motion-design");
        assert_eq!(derive_slug("  UI / UX  ").expect("slug"), "ui-ux");
    }

    #[test]
    fn derive_slug_rejects_empty() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
        assert!(matches!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn url_safe_slug_rules() {
        assert!(is_url_safe_slug("brand-refresh-2024"));
        assert!(!is_url_safe_slug("Brand-Refresh"));
        assert!(!is_url_safe_slug("double--dash"));
        assert!(!is_url_safe_slug("-leading"));
        assert!(!is_url_safe_slug("with space"));
        assert!(!is_url_safe_slug(""));
    }
}
