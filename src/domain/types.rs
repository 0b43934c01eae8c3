//! Shared domain enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The three content families served by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blogs,
    Projects,
    Works,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Blogs, ContentKind::Projects, ContentKind::Works];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Blogs => "blogs",
            ContentKind::Projects => "projects",
            ContentKind::Works => "works",
        }
    }

    /// Memo cache key under which the full live listing is stored.
    pub fn cache_key(self) -> &'static str {
        match self {
            ContentKind::Blogs => "blogs:all",
            ContentKind::Projects => "projects:all",
            ContentKind::Works => "works:all",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discipline a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectCategory {
    WebDev,
    UiUx,
    Branding,
    Social,
    Print,
}

impl ProjectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectCategory::WebDev => "web-dev",
            ProjectCategory::UiUx => "ui-ux",
            ProjectCategory::Branding => "branding",
            ProjectCategory::Social => "social",
            ProjectCategory::Print => "print",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "web-dev" => Ok(ProjectCategory::WebDev),
            "ui-ux" => Ok(ProjectCategory::UiUx),
            "branding" => Ok(ProjectCategory::Branding),
            "social" => Ok(ProjectCategory::Social),
            "print" => Ok(ProjectCategory::Print),
            other => Err(DomainError::validation(format!(
                "unknown project category `{other}`"
            ))),
        }
    }
}
