//! Canonical content records served by the site.
//!
//! Every adapter normalises its rows into these shapes; field names serialize
//! in camelCase to match the static JSON seed files.

use serde::{Deserialize, Deserializer, Serialize};
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::domain::category::infer_category;
use crate::domain::types::{ContentKind, ProjectCategory};

/// Behaviour shared by blogs, projects and works.
pub trait ContentRecord: Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    fn slug(&self) -> &str;

    fn title(&self) -> &str;

    /// Apply the ordering contract for this content type. Must be stable.
    fn sort(records: &mut [Self]);

    /// Fill derived fields that a source may omit.
    fn normalize(&mut self) {}

    /// Video asset worth warming when the record is served.
    fn video(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogRecord {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub cover_image: String,
    /// ISO-8601 date, either `YYYY-MM-DD` or RFC 3339.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

impl BlogRecord {
    pub fn published_at(&self) -> Option<OffsetDateTime> {
        parse_content_date(&self.date)
    }
}

impl ContentRecord for BlogRecord {
    const KIND: ContentKind = ContentKind::Blogs;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn sort(records: &mut [Self]) {
        // Undated records compare as `None` and land last.
        records.sort_by_key(|record| std::cmp::Reverse(record.published_at()));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProjectCategory>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub gallery: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl ContentRecord for ProjectRecord {
    const KIND: ContentKind = ContentKind::Projects;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| a.title.cmp(&b.title));
    }

    fn normalize(&mut self) {
        if self.category.is_none() {
            self.category = infer_category(&self.roles);
        }
    }

    fn video(&self) -> Option<&str> {
        self.video.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProjectCategory>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub gallery: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl ContentRecord for WorkRecord {
    const KIND: ContentKind = ContentKind::Works;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| match (a.sort_order, b.sort_order) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.title.cmp(&b.title)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.title.cmp(&b.title),
        });
    }

    fn normalize(&mut self) {
        if self.category.is_none() {
            self.category = infer_category(&self.roles);
        }
    }

    fn video(&self) -> Option<&str> {
        self.video.as_deref()
    }
}

/// Treat an explicit `null` list the same as an absent one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a content date written as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_content_date(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
