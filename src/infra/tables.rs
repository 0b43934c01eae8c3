//! Column-level row shapes shared by the Postgres and hosted-backend adapters.
//!
//! Both stores expose the same snake_case tables; rows convert into the
//! canonical records and back (for seeding).

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{FromRow, postgres::PgRow};

use crate::domain::entities::{BlogRecord, ContentRecord, ProjectRecord, WorkRecord};
use crate::domain::types::ProjectCategory;

pub trait ContentTable: ContentRecord {
    type Row: DeserializeOwned + Serialize + for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static;

    const TABLE: &'static str;
    /// PostgREST `select` list.
    const REST_SELECT: &'static str;
    /// PostgREST `order` expression.
    const REST_ORDER: &'static str;
    const SQL_SELECT: &'static str;

    fn from_row(row: Self::Row) -> Self;

    fn to_row(&self) -> Self::Row;
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogRow {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub cover_image: String,
    pub date: String,
    pub content: Option<String>,
    pub author: Option<String>,
    pub read_time: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ContentTable for BlogRecord {
    type Row = BlogRow;

    const TABLE: &'static str = "blogs";
    const REST_SELECT: &'static str =
        "slug,title,excerpt,cover_image,date,content,author,read_time,tags";
    const REST_ORDER: &'static str = "date.desc";
    const SQL_SELECT: &'static str = "SELECT slug, title, excerpt, cover_image, \
        to_char(blogs.date, 'YYYY-MM-DD') AS date, content, author, read_time, tags \
        FROM blogs ORDER BY blogs.date DESC";

    fn from_row(row: BlogRow) -> Self {
        BlogRecord {
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            cover_image: row.cover_image,
            date: row.date,
            content: row.content,
            author: row.author,
            read_time: row.read_time,
            tags: row.tags.unwrap_or_default(),
        }
    }

    fn to_row(&self) -> BlogRow {
        BlogRow {
            slug: self.slug.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            cover_image: self.cover_image.clone(),
            date: self.date.clone(),
            content: self.content.clone(),
            author: self.author.clone(),
            read_time: self.read_time.clone(),
            tags: Some(self.tags.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub thumbnail: String,
    pub client: Option<String>,
    pub year: Option<String>,
    pub category: Option<String>,
    pub roles: Option<Vec<String>>,
    pub tools: Option<Vec<String>>,
    pub gallery: Option<Vec<String>>,
    pub video: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub process: Option<String>,
    pub outcome: Option<String>,
}

impl ContentTable for ProjectRecord {
    type Row = ProjectRow;

    const TABLE: &'static str = "projects";
    const REST_SELECT: &'static str = "slug,title,excerpt,thumbnail,client,year,category,roles,tools,gallery,video,problem,solution,process,outcome";
    const REST_ORDER: &'static str = "title.asc";
    const SQL_SELECT: &'static str = "SELECT slug, title, excerpt, thumbnail, client, year, \
        category, roles, tools, gallery, video, problem, solution, process, outcome \
        FROM projects ORDER BY title ASC";

    fn from_row(row: ProjectRow) -> Self {
        ProjectRecord {
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            thumbnail: row.thumbnail,
            client: row.client,
            year: row.year,
            category: parse_category(row.category),
            roles: row.roles.unwrap_or_default(),
            tools: row.tools.unwrap_or_default(),
            gallery: row.gallery.unwrap_or_default(),
            video: row.video,
            problem: row.problem,
            solution: row.solution,
            process: row.process,
            outcome: row.outcome,
        }
    }

    fn to_row(&self) -> ProjectRow {
        ProjectRow {
            slug: self.slug.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            thumbnail: self.thumbnail.clone(),
            client: self.client.clone(),
            year: self.year.clone(),
            category: self.category.map(|category| category.as_str().to_string()),
            roles: Some(self.roles.clone()),
            tools: Some(self.tools.clone()),
            gallery: Some(self.gallery.clone()),
            video: self.video.clone(),
            problem: self.problem.clone(),
            solution: self.solution.clone(),
            process: self.process.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkRow {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub thumbnail: String,
    pub client: Option<String>,
    pub category: Option<String>,
    pub roles: Option<Vec<String>>,
    pub tools: Option<Vec<String>>,
    pub gallery: Option<Vec<String>>,
    pub video: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub process: Option<String>,
    pub outcome: Option<String>,
    pub sort_order: Option<i32>,
}

impl ContentTable for WorkRecord {
    type Row = WorkRow;

    const TABLE: &'static str = "works";
    const REST_SELECT: &'static str = "slug,title,excerpt,thumbnail,client,category,roles,tools,gallery,video,problem,solution,process,outcome,sort_order";
    const REST_ORDER: &'static str = "sort_order.asc.nullslast,title.asc";
    const SQL_SELECT: &'static str = "SELECT slug, title, excerpt, thumbnail, client, category, \
        roles, tools, gallery, video, problem, solution, process, outcome, sort_order \
        FROM works ORDER BY sort_order ASC NULLS LAST, title ASC";

    fn from_row(row: WorkRow) -> Self {
        WorkRecord {
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            thumbnail: row.thumbnail,
            client: row.client,
            category: parse_category(row.category),
            roles: row.roles.unwrap_or_default(),
            tools: row.tools.unwrap_or_default(),
            gallery: row.gallery.unwrap_or_default(),
            video: row.video,
            problem: row.problem,
            solution: row.solution,
            process: row.process,
            outcome: row.outcome,
            sort_order: row.sort_order,
        }
    }

    fn to_row(&self) -> WorkRow {
        WorkRow {
            slug: self.slug.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            thumbnail: self.thumbnail.clone(),
            client: self.client.clone(),
            category: self.category.map(|category| category.as_str().to_string()),
            roles: Some(self.roles.clone()),
            tools: Some(self.tools.clone()),
            gallery: Some(self.gallery.clone()),
            video: self.video.clone(),
            problem: self.problem.clone(),
            solution: self.solution.clone(),
            process: self.process.clone(),
            outcome: self.outcome.clone(),
            sort_order: self.sort_order,
        }
    }
}

/// Unknown category strings are dropped so inference can fill them in.
fn parse_category(value: Option<String>) -> Option<ProjectCategory> {
    value.and_then(|value| value.parse().ok())
}
