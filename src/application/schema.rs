//! Shape validation for the compiled-in static content.
//!
//! Static JSON is trusted input with a schema contract: a mismatch is a deploy
//! bug, so validation collects every violation and reports them all at once.

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::parse_content_date;
use crate::domain::slug::is_url_safe_slug;
use crate::domain::types::ProjectCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// URL-safe record identifier.
    Slug,
    Text,
    /// ISO-8601 date string.
    Date,
    TextList,
    Integer,
    Category,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

/// Declared shape of one record type.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const BLOG_SCHEMA: RecordSchema = RecordSchema {
    name: "blogs",
    fields: &[
        required("slug", FieldKind::Slug),
        required("title", FieldKind::Text),
        required("excerpt", FieldKind::Text),
        required("coverImage", FieldKind::Text),
        required("date", FieldKind::Date),
        optional("content", FieldKind::Text),
        optional("author", FieldKind::Text),
        optional("readTime", FieldKind::Text),
        optional("tags", FieldKind::TextList),
    ],
};

pub const PROJECT_SCHEMA: RecordSchema = RecordSchema {
    name: "projects",
    fields: &[
        required("slug", FieldKind::Slug),
        required("title", FieldKind::Text),
        required("excerpt", FieldKind::Text),
        required("thumbnail", FieldKind::Text),
        optional("client", FieldKind::Text),
        optional("year", FieldKind::Text),
        optional("category", FieldKind::Category),
        optional("roles", FieldKind::TextList),
        optional("tools", FieldKind::TextList),
        optional("gallery", FieldKind::TextList),
        optional("video", FieldKind::Text),
        optional("problem", FieldKind::Text),
        optional("solution", FieldKind::Text),
        optional("process", FieldKind::Text),
        optional("outcome", FieldKind::Text),
    ],
};

pub const WORK_SCHEMA: RecordSchema = RecordSchema {
    name: "works",
    fields: &[
        required("slug", FieldKind::Slug),
        required("title", FieldKind::Text),
        required("excerpt", FieldKind::Text),
        required("thumbnail", FieldKind::Text),
        optional("client", FieldKind::Text),
        optional("category", FieldKind::Category),
        optional("roles", FieldKind::TextList),
        optional("tools", FieldKind::TextList),
        optional("gallery", FieldKind::TextList),
        optional("video", FieldKind::Text),
        optional("problem", FieldKind::Text),
        optional("solution", FieldKind::Text),
        optional("process", FieldKind::Text),
        optional("outcome", FieldKind::Text),
        optional("sortOrder", FieldKind::Integer),
    ],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub reason: String,
}

impl SchemaIssue {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{schema} content failed validation: {}", join_issues(.issues))]
pub struct SchemaError {
    pub schema: &'static str,
    pub issues: Vec<SchemaIssue>,
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse JSON text and validate it against `schema`.
pub fn parse_records<T: DeserializeOwned>(
    schema: &RecordSchema,
    text: &str,
) -> Result<Vec<T>, SchemaError> {
    let blob: Value = serde_json::from_str(text).map_err(|err| SchemaError {
        schema: schema.name,
        issues: vec![SchemaIssue::new("(root)", format!("Invalid JSON: {err}"))],
    })?;
    validate_records(schema, &blob)
}

/// Validate an untyped blob and convert it into typed records.
pub fn validate_records<T: DeserializeOwned>(
    schema: &RecordSchema,
    blob: &Value,
) -> Result<Vec<T>, SchemaError> {
    let fail = |issues| SchemaError {
        schema: schema.name,
        issues,
    };

    let Some(items) = blob.as_array() else {
        return Err(fail(vec![SchemaIssue::new(
            "(root)",
            format!("Expected array, received {}", type_name(blob)),
        )]));
    };

    let mut issues = Vec::new();
    let mut seen_slugs = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            issues.push(SchemaIssue::new(
                index.to_string(),
                format!("Expected object, received {}", type_name(item)),
            ));
            continue;
        };

        for field in schema.fields {
            let path = format!("{index}.{}", field.name);
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        issues.push(SchemaIssue::new(path, "Required"));
                    }
                }
                Some(value) => check_field(field.kind, &path, value, &mut issues),
            }
        }

        if let Some(slug) = object.get("slug").and_then(Value::as_str)
            && !seen_slugs.insert(slug)
        {
            issues.push(SchemaIssue::new(
                format!("{index}.slug"),
                format!("Duplicate slug `{slug}`"),
            ));
        }
    }

    if !issues.is_empty() {
        return Err(fail(issues));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item).map_err(|err| {
                fail(vec![SchemaIssue::new(
                    index.to_string(),
                    format!("Could not decode record: {err}"),
                )])
            })
        })
        .collect()
}

fn check_field(kind: FieldKind, path: &str, value: &Value, issues: &mut Vec<SchemaIssue>) {
    match kind {
        FieldKind::Slug | FieldKind::Text | FieldKind::Date | FieldKind::Category => {
            let Some(text) = value.as_str() else {
                issues.push(SchemaIssue::new(
                    path,
                    format!("Expected string, received {}", type_name(value)),
                ));
                return;
            };
            if text.trim().is_empty() {
                issues.push(SchemaIssue::new(path, "Must not be empty"));
                return;
            }
            match kind {
                FieldKind::Slug if !is_url_safe_slug(text) => {
                    issues.push(SchemaIssue::new(path, "Must be a URL-safe slug"));
                }
                FieldKind::Date if parse_content_date(text).is_none() => {
                    issues.push(SchemaIssue::new(path, "Invalid ISO-8601 date"));
                }
                FieldKind::Category if text.parse::<ProjectCategory>().is_err() => {
                    issues.push(SchemaIssue::new(
                        path,
                        "Expected one of web-dev, ui-ux, branding, social, print",
                    ));
                }
                _ => {}
            }
        }
        FieldKind::Integer => {
            if value.as_i64().and_then(|n| i32::try_from(n).ok()).is_none() {
                issues.push(SchemaIssue::new(
                    path,
                    format!("Expected integer, received {}", type_name(value)),
                ));
            }
        }
        FieldKind::TextList => {
            let Some(entries) = value.as_array() else {
                issues.push(SchemaIssue::new(
                    path,
                    format!("Expected array, received {}", type_name(value)),
                ));
                return;
            };
            for (position, entry) in entries.iter().enumerate() {
                if !entry.is_string() {
                    issues.push(SchemaIssue::new(
                        format!("{path}.{position}"),
                        format!("Expected string, received {}", type_name(entry)),
                    ));
                }
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
