//! Compiled-in JSON content, validated on first use and kept for the process
//! lifetime.

use std::marker::PhantomData;

use async_trait::async_trait;
use include_dir::{Dir, include_dir};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::application::repos::{ContentSource, SourceError};
use crate::application::schema::{
    BLOG_SCHEMA, PROJECT_SCHEMA, RecordSchema, SchemaError, parse_records,
};
use crate::domain::entities::{BlogRecord, ContentRecord, ProjectRecord};

static CONTENT: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/content");

const SOURCE: &str = "infra::static_content";

pub const BLOGS_FILE: &str = "blogs.json";
pub const PROJECTS_FILE: &str = "projects.json";

pub struct StaticSource<T> {
    text: Option<&'static str>,
    schema: &'static RecordSchema,
    records: OnceCell<Vec<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ContentRecord + DeserializeOwned> StaticSource<T> {
    /// Source backed by a file from the embedded `content/` directory. A
    /// missing file behaves like an unconfigured source.
    pub fn embedded(file: &str, schema: &'static RecordSchema) -> Self {
        let text = CONTENT.get_file(file).and_then(|entry| entry.contents_utf8());
        Self::with_text(text, schema)
    }

    pub fn from_text(text: &'static str, schema: &'static RecordSchema) -> Self {
        Self::with_text(Some(text), schema)
    }

    fn with_text(text: Option<&'static str>, schema: &'static RecordSchema) -> Self {
        Self {
            text,
            schema,
            records: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    /// Validated, normalised and ordered records; parsed once.
    pub fn records(&self) -> Result<Option<&[T]>, SchemaError> {
        let Some(text) = self.text else {
            return Ok(None);
        };
        let records = self.records.get_or_try_init(|| {
            let mut records: Vec<T> = parse_records(self.schema, text)?;
            records.iter_mut().for_each(T::normalize);
            T::sort(&mut records);
            info!(
                target = SOURCE,
                kind = T::KIND.as_str(),
                count = records.len(),
                "static content loaded"
            );
            Ok::<_, SchemaError>(records)
        })?;
        Ok(Some(records.as_slice()))
    }
}

#[async_trait]
impl<T: ContentRecord + DeserializeOwned> ContentSource<T> for StaticSource<T> {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> Result<Option<Vec<T>>, SourceError> {
        Ok(self.records()?.map(<[T]>::to_vec))
    }
}

pub fn blog_source() -> StaticSource<BlogRecord> {
    StaticSource::embedded(BLOGS_FILE, &BLOG_SCHEMA)
}

pub fn project_source() -> StaticSource<ProjectRecord> {
    StaticSource::embedded(PROJECTS_FILE, &PROJECT_SCHEMA)
}

/// Record counts per validated content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub blogs: usize,
    pub projects: usize,
}

/// Validate every embedded content file.
pub fn validate_embedded() -> Result<ValidationSummary, SchemaError> {
    let blogs = blog_source().records()?.map_or(0, <[_]>::len);
    let projects = project_source().records()?.map_or(0, <[_]>::len);
    Ok(ValidationSummary { blogs, projects })
}
