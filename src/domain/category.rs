//! Category inference from free-form role strings.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::types::ProjectCategory;

/// Rules are checked in order; the first category whose pattern matches any
/// role wins.
static CATEGORY_RULES: Lazy<Vec<(ProjectCategory, Regex)>> = Lazy::new(|| {
    [
        (
            ProjectCategory::WebDev,
            r"(?i)\b(web|website|front-?end|back-?end|full-?stack|developer|development|engineering|e-?commerce)\b",
        ),
        (
            ProjectCategory::UiUx,
            r"(?i)\b(ui|ux|ui/ux|interface|user experience|product design|interaction|prototyp\w*|wireframe\w*)\b",
        ),
        (
            ProjectCategory::Branding,
            r"(?i)\b(brand\w*|identity|logo\w*|visual identity|naming)\b",
        ),
        (
            ProjectCategory::Social,
            r"(?i)\b(social|instagram|tiktok|campaign|content creation|community)\b",
        ),
        (
            ProjectCategory::Print,
            r"(?i)\b(print|editorial|packaging|poster\w*|brochure\w*|magazine|layout)\b",
        ),
    ]
    .into_iter()
    .filter_map(|(category, pattern)| Regex::new(pattern).ok().map(|re| (category, re)))
    .collect()
});

/// Infer a category from a record's roles, or `None` when nothing matches.
pub fn infer_category<S: AsRef<str>>(roles: &[S]) -> Option<ProjectCategory> {
    CATEGORY_RULES.iter().find_map(|(category, pattern)| {
        roles
            .iter()
            .any(|role| pattern.is_match(role.as_ref()))
            .then_some(*category)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let roles = ["Brand Strategy", "Front-end Development"];
        assert_eq!(infer_category(&roles), Some(ProjectCategory::WebDev));
    }

    #[test]
    fn matches_each_category() {
        assert_eq!(infer_category(&["UI/UX Design"]), Some(ProjectCategory::UiUx));
        assert_eq!(infer_category(&["Logo Design"]), Some(ProjectCategory::Branding));
        assert_eq!(
            infer_category(&["Social Media Campaign"]),
            Some(ProjectCategory::Social)
        );
        assert_eq!(infer_category(&["Packaging"]), Some(ProjectCategory::Print));
    }

    #[test]
    fn unmatched_roles_leave_category_unset() {
        assert_eq!(infer_category(&["Photography", "Art Direction"]), None);
        assert_eq!(infer_category::<&str>(&[]), None);
    }

    #[test]
    fn every_rule_compiles() {
        assert_eq!(CATEGORY_RULES.len(), 5);
    }
}
